use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    AvailabilityId, DateAvailability, NewPanel, Panel, PanelId, PanelPatch, SlotTemplate,
    SlotWindow,
};
use super::recurring::RecurringRuleExpander;
use super::repository::PanelRepository;
use super::store::SlotStore;
use crate::error::PipelineError;
use crate::extract::{JsonBody, QueryParams};

pub(crate) struct PanelApi<R> {
    store: Arc<SlotStore<R>>,
    expander: Arc<RecurringRuleExpander<R>>,
}

impl<R> Clone for PanelApi<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            expander: self.expander.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AvailabilityRequest {
    pub(crate) date: NaiveDate,
    pub(crate) time_slots: Vec<SlotWindow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecurringRuleRequest {
    pub(crate) day_of_week: u8,
    pub(crate) time_slots: Vec<SlotTemplate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateRange {
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeletedPanel {
    pub(crate) message: String,
    pub(crate) id: PanelId,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeneratedAvailability {
    pub(crate) message: String,
    pub(crate) generated: Vec<DateAvailability>,
}

/// Router builder exposing panel management, availability, recurring rules, and slot queries.
pub fn panel_router<R>(store: Arc<SlotStore<R>>) -> Router
where
    R: PanelRepository + 'static,
{
    let expander = Arc::new(RecurringRuleExpander::new(store.clone()));
    Router::new()
        .route(
            "/api/v1/panels",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id",
            get(panel_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id/availability",
            get(availability_handler::<R>).post(upsert_availability_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id/availability/:availability_id",
            delete(delete_availability_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id/available-slots",
            get(available_slots_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id/recurring-availability",
            post(recurring_rule_handler::<R>),
        )
        .route(
            "/api/v1/panels/:panel_id/generate-availability",
            post(generate_handler::<R>),
        )
        .with_state(PanelApi { store, expander })
}

pub(crate) async fn list_handler<R>(
    State(api): State<PanelApi<R>>,
) -> Result<Json<Vec<Panel>>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store.panels().map(Json)
}

pub(crate) async fn create_handler<R>(
    State(api): State<PanelApi<R>>,
    JsonBody(request): JsonBody<NewPanel>,
) -> Result<(StatusCode, Json<Panel>), PipelineError>
where
    R: PanelRepository + 'static,
{
    let panel = api.store.create_panel(request)?;
    Ok((StatusCode::CREATED, Json(panel)))
}

pub(crate) async fn panel_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
) -> Result<Json<Panel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store.panel(&PanelId(panel_id)).map(Json)
}

pub(crate) async fn update_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
    JsonBody(patch): JsonBody<PanelPatch>,
) -> Result<Json<Panel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store.update_panel(&PanelId(panel_id), patch).map(Json)
}

pub(crate) async fn delete_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
) -> Result<Json<DeletedPanel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    let removed = api.store.delete_panel(&PanelId(panel_id))?;
    Ok(Json(DeletedPanel {
        message: format!("Panel {} deleted", removed.name),
        id: removed.id,
    }))
}

pub(crate) async fn availability_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
) -> Result<Json<Vec<DateAvailability>>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store.availability(&PanelId(panel_id)).map(Json)
}

pub(crate) async fn upsert_availability_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
    JsonBody(request): JsonBody<AvailabilityRequest>,
) -> Result<Json<Panel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store
        .upsert_availability(&PanelId(panel_id), request.date, request.time_slots)
        .map(Json)
}

pub(crate) async fn delete_availability_handler<R>(
    State(api): State<PanelApi<R>>,
    Path((panel_id, availability_id)): Path<(String, String)>,
) -> Result<Json<Panel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store
        .delete_availability(&PanelId(panel_id), &AvailabilityId(availability_id))
        .map(Json)
}

pub(crate) async fn available_slots_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
    QueryParams(range): QueryParams<DateRange>,
) -> Result<Json<Vec<DateAvailability>>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store
        .query_available(&PanelId(panel_id), range.start_date, range.end_date)
        .map(Json)
}

pub(crate) async fn recurring_rule_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
    JsonBody(request): JsonBody<RecurringRuleRequest>,
) -> Result<Json<Panel>, PipelineError>
where
    R: PanelRepository + 'static,
{
    api.store
        .add_recurring_rule(&PanelId(panel_id), request.day_of_week, request.time_slots)
        .map(Json)
}

pub(crate) async fn generate_handler<R>(
    State(api): State<PanelApi<R>>,
    Path(panel_id): Path<String>,
    JsonBody(range): JsonBody<DateRange>,
) -> Result<Json<GeneratedAvailability>, PipelineError>
where
    R: PanelRepository + 'static,
{
    let generated = api
        .expander
        .expand(&PanelId(panel_id), range.start_date, range.end_date)?;
    Ok(Json(GeneratedAvailability {
        message: format!("Generated {} availability entries", generated.len()),
        generated,
    }))
}
