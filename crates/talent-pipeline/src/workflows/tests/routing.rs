use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::IntoResponse;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::storage::{InMemoryPanelRepository, InMemoryWorkflowRepository};
use crate::workflows::router::{workflow_handler, workflow_router, ACTOR_HEADER};

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn promote_route_creates_workflow() {
    let harness = harness();
    let router = workflow_router(harness.service.clone());

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/workflows",
            json!({
                "application": "app-77",
                "campaign": "campaign-backend-2024",
                "candidate_name": "Maya Chen"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["current_stage"], "interview1_setup");
    assert_eq!(payload["next_activity_date"], "2024-06-08T08:00:00");
}

#[tokio::test]
async fn interview_setup_route_books_slot_as_header_actor() {
    let harness = harness();
    let workflow = harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    let router = workflow_router(harness.service.clone());

    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/workflows/{}/interview1-setup", workflow.id))
        .header(header::CONTENT_TYPE, "application/json")
        .header(ACTOR_HEADER, "user-lead")
        .body(Body::from(
            json!({
                "panel_id": harness.panel.id,
                "date": "2024-06-03",
                "slot_id": harness.slot_id,
                "meeting_link": "https://meet.example.com/abc"
            })
            .to_string(),
        ))
        .expect("request builds");

    let response = router.oneshot(request).await.expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["current_stage"], "interview1");
    assert_eq!(payload["next_activity_date"], "2024-06-03T09:00:00");
    assert_eq!(
        payload["stages"]["interview1_setup"]["assigned_by"],
        "user-lead"
    );
    assert_eq!(
        payload["stages"]["interview1_setup"]["scheduled_time"],
        "09:00 - 10:00"
    );
}

#[tokio::test]
async fn booked_slot_conflicts_over_http() {
    let harness = harness();
    let first = harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    let second = harness
        .service
        .promote(new_workflow("Jonas"))
        .expect("promoted");
    harness.book(&first.id).expect("first booking");
    let router = workflow_router(harness.service.clone());

    let response = router
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/workflows/{}/interview1-setup", second.id),
            json!({
                "panel_id": harness.panel.id,
                "date": "2024-06-03",
                "slot_id": harness.slot_id
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn result_for_the_wrong_stage_is_a_conflict() {
    let harness = harness();
    let workflow = harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    let router = workflow_router(harness.service.clone());

    let response = router
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/workflows/{}/technical-test-result", workflow.id),
            json!({ "result": "Select", "remarks": "premature" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.contains("Interview 1 - Set up")));
}

#[tokio::test]
async fn technical_test_routes_walk_the_stages() {
    let harness = harness();
    let workflow = harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    harness.book(&workflow.id).expect("booked");
    let router = workflow_router(harness.service.clone());
    let base = format!("/api/v1/workflows/{}", workflow.id);

    let steps = [
        (
            "interview1-result",
            json!({ "result": "Select", "remarks": "good depth", "feedback_link": "https://forms.example.com/1" }),
            "tech_test_setup",
        ),
        (
            "technical-test-setup",
            json!({
                "test_paper": {
                    "filename": "paper.pdf",
                    "storage_path": "uploads/paper.pdf",
                    "mime_type": "application/pdf"
                },
                "scheduled_at": "2024-06-12T10:00",
                "evaluators": ["user-eval"],
                "notify_candidate": true
            }),
            "tech_test_scheduled",
        ),
        (
            "technical-test-submit",
            json!({
                "answer_sheet": {
                    "filename": "answers.zip",
                    "storage_path": "uploads/answers.zip",
                    "mime_type": "application/zip"
                },
                "reviewers": ["user-reviewer"]
            }),
            "tech_test_review",
        ),
        (
            "technical-test-result",
            json!({ "result": "Select", "remarks": "clean solution" }),
            "onboarding",
        ),
        (
            "onboarding",
            json!({ "background_check_done": true, "offer_letter_released": true, "complete": true }),
            "completed",
        ),
    ];

    for (path, body, expected_stage) in steps {
        let response = router
            .clone()
            .oneshot(json_request(Method::PUT, &format!("{base}/{path}"), body))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let payload = read_json_body(response).await;
        assert_eq!(payload["current_stage"], expected_stage, "{path}");
    }
}

#[tokio::test]
async fn invalid_payloads_are_bad_requests() {
    let harness = harness();
    let workflow = harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    let router = workflow_router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/v1/workflows/{}/candidate-details", workflow.id),
            json!({ "current_salary": -10.0 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["field"], "current_salary");

    let response = router
        .oneshot(
            Request::get("/api/v1/workflows?group_by=stage")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_listing_groups_by_date() {
    let harness = harness();
    harness
        .service
        .promote(new_workflow("Maya"))
        .expect("promoted");
    harness
        .service
        .promote(new_workflow("Jonas"))
        .expect("promoted");
    let router = workflow_router(harness.service.clone());

    let response = router
        .oneshot(
            Request::get("/api/v1/workflows?group_by=date")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["label"], "2024-06-08");
    assert_eq!(payload[0]["workflows"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn workflow_handler_returns_not_found_for_unknown_ids() {
    let harness = harness();
    let service: Arc<_> = harness.service.clone();

    let response = workflow_handler::<InMemoryWorkflowRepository, InMemoryPanelRepository>(
        State(service),
        Path("wf-missing".to_string()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
