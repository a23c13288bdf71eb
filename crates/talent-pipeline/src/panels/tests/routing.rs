use super::common::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::panels::router::panel_router;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn create_route_returns_created_panel() {
    let (store, _) = build_store();
    let router = panel_router(store);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/panels",
            json!({
                "name": "Data Platform",
                "description": "Streaming and storage interviews",
                "members": ["user-li"]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["name"], "Data Platform");
    assert_eq!(payload["timezone"], "UTC");
    assert_eq!(payload["is_active"], true);
}

#[tokio::test]
async fn inverted_slot_is_a_bad_request_naming_the_field() {
    let (store, panel) = build_store();
    let router = panel_router(store);

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/panels/{}/availability", panel.id),
            json!({
                "date": "2024-06-03",
                "time_slots": [{ "start_time": "10:00", "end_time": "09:00" }]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "time_slots[0]");
}

#[tokio::test]
async fn available_slots_route_reads_query_range() {
    let (store, panel) = build_store();
    store
        .upsert_availability(&panel.id, date(2024, 6, 3), vec![window("9:00", "10:00")])
        .expect("stored");
    let router = panel_router(store);

    let response = router
        .oneshot(
            Request::get(format!(
                "/api/v1/panels/{}/available-slots?start_date=2024-06-01&end_date=2024-06-30",
                panel.id
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["date"], "2024-06-03");
    assert_eq!(payload[0]["time_slots"][0]["start_time"], "09:00");
}

#[tokio::test]
async fn generate_route_reports_generated_entries() {
    let (store, panel) = build_store();
    let router = panel_router(store);

    let rule = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/panels/{}/recurring-availability", panel.id),
            json!({
                "day_of_week": 1,
                "time_slots": [{ "start_time": "09:00", "end_time": "10:00" }]
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(rule.status(), StatusCode::OK);

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/panels/{}/generate-availability", panel.id),
            json!({ "start_date": "2024-06-03", "end_date": "2024-06-16" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["message"], "Generated 2 availability entries");
    assert_eq!(payload["generated"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn delete_route_removes_entry() {
    let (store, panel) = build_store();
    let panel = store
        .upsert_availability(&panel.id, date(2024, 6, 3), vec![window("09:00", "10:00")])
        .expect("stored");
    let entry_id = panel.day(date(2024, 6, 3)).expect("entry").id.clone();
    let router = panel_router(store);

    let response = router
        .oneshot(
            Request::delete(format!(
                "/api/v1/panels/{}/availability/{}",
                panel.id, entry_id
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["availability"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_panel_is_not_found() {
    let (store, _) = build_store();
    let router = panel_router(store);

    let response = router
        .oneshot(
            Request::get("/api/v1/panels/panel-missing")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn panel_can_be_updated_and_deleted_over_http() {
    let (store, panel) = build_store();
    let router = panel_router(store.clone());
    let uri = format!("/api/v1/panels/{}", panel.id);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &uri,
            json!({ "description": "Backend, storage and infra interviews" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["description"], "Backend, storage and infra interviews");
    assert_eq!(payload["name"], "Platform Engineering");
    assert_eq!(payload["members"].as_array().map(Vec::len), Some(2));

    let response = router
        .clone()
        .oneshot(json_request(Method::PUT, &uri, json!({ "members": [] })))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["field"], "members");

    let response = router
        .clone()
        .oneshot(Request::delete(&uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["id"], panel.id.0.as_str());

    let response = router
        .oneshot(Request::delete(&uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.panels().expect("panels").is_empty());
}

#[tokio::test]
async fn malformed_fields_are_bad_requests_naming_the_field() {
    let (store, panel) = build_store();
    let router = panel_router(store);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/panels/{}/availability", panel.id),
            json!({
                "date": "2024-06-03",
                "time_slots": [{ "start_time": "25:00", "end_time": "26:00" }]
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "time_slots[0].start_time");

    let response = router
        .oneshot(
            Request::get(format!(
                "/api/v1/panels/{}/available-slots?start_date=2024-13-01&end_date=2024-06-30",
                panel.id
            ))
            .body(Body::empty())
            .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["field"], "query");
}

#[tokio::test]
async fn oversized_generate_range_is_rejected() {
    let (store, panel) = build_store();
    let router = panel_router(store.clone());

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/panels/{}/generate-availability", panel.id),
            json!({ "start_date": "2000-01-01", "end_date": "2499-12-31" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["field"], "end_date");
    assert!(store.availability(&panel.id).expect("availability").is_empty());
}
