use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::actions::{
    AnswerSubmission, InterviewSetup, OnboardingUpdate, ResultSubmission, TestSetup,
    WorkflowAction,
};
use super::domain::{CandidateDetails, NewWorkflow, Stage, Workflow, WorkflowId};
use super::repository::WorkflowRepository;
use super::service::{ActivityGroup, PipelineService};
use crate::error::PipelineError;
use crate::extract::{JsonBody, QueryParams};
use crate::panels::repository::PanelRepository;
use crate::refs::UserRef;

/// Header carrying the acting user; requests without it act as `system`.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActivityQuery {
    #[serde(default)]
    pub(crate) group_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ActivityListing {
    Flat(Vec<Workflow>),
    Grouped(Vec<ActivityGroup>),
}

/// Router builder exposing promotion, activity listings, and stage transitions.
pub fn workflow_router<W, P>(service: Arc<PipelineService<W, P>>) -> Router
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/workflows",
            get(activities_handler::<W, P>).post(promote_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id",
            get(workflow_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/interview1-setup",
            put(interview_setup_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/interview1-result",
            put(interview_result_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/technical-test-setup",
            put(test_setup_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/technical-test-submit",
            put(test_submit_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/technical-test-result",
            put(test_result_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/onboarding",
            put(onboarding_handler::<W, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/candidate-details",
            put(candidate_details_handler::<W, P>),
        )
        .with_state(service)
}

fn actor(headers: &HeaderMap) -> UserRef {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserRef(value.to_string()))
        .unwrap_or_else(UserRef::system)
}

pub(crate) async fn promote_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    JsonBody(request): JsonBody<NewWorkflow>,
) -> Result<(StatusCode, Json<Workflow>), PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    let workflow = service.promote(request)?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

pub(crate) async fn activities_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    QueryParams(query): QueryParams<ActivityQuery>,
) -> Result<Json<ActivityListing>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    match query.group_by.as_deref() {
        None => Ok(Json(ActivityListing::Flat(service.activities()?))),
        Some("date") => Ok(Json(ActivityListing::Grouped(
            service.activities_by_date()?,
        ))),
        Some(_) => Err(PipelineError::validation(
            "group_by",
            "only grouping by date is supported",
        )),
    }
}

pub(crate) async fn workflow_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service.get(&WorkflowId(workflow_id)).map(Json)
}

pub(crate) async fn interview_setup_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(setup): JsonBody<InterviewSetup>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .book_interview_slot(
            &WorkflowId(workflow_id),
            &actor(&headers),
            setup.panel_id,
            setup.date,
            setup.slot_id,
            setup.meeting_link,
        )
        .map(Json)
}

pub(crate) async fn interview_result_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(submission): JsonBody<ResultSubmission>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .transition_at(
            &WorkflowId(workflow_id),
            &actor(&headers),
            Stage::Interview1,
            WorkflowAction::RecordResult(submission),
        )
        .map(Json)
}

pub(crate) async fn test_setup_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(setup): JsonBody<TestSetup>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .transition(
            &WorkflowId(workflow_id),
            &actor(&headers),
            WorkflowAction::SetupTest(setup),
        )
        .map(Json)
}

pub(crate) async fn test_submit_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(submission): JsonBody<AnswerSubmission>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .transition(
            &WorkflowId(workflow_id),
            &actor(&headers),
            WorkflowAction::SubmitAnswers(submission),
        )
        .map(Json)
}

pub(crate) async fn test_result_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(submission): JsonBody<ResultSubmission>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .transition_at(
            &WorkflowId(workflow_id),
            &actor(&headers),
            Stage::TechTestReview,
            WorkflowAction::RecordResult(submission),
        )
        .map(Json)
}

pub(crate) async fn onboarding_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    JsonBody(update): JsonBody<OnboardingUpdate>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .transition(
            &WorkflowId(workflow_id),
            &actor(&headers),
            WorkflowAction::UpdateOnboarding(update),
        )
        .map(Json)
}

pub(crate) async fn candidate_details_handler<W, P>(
    State(service): State<Arc<PipelineService<W, P>>>,
    Path(workflow_id): Path<String>,
    JsonBody(patch): JsonBody<CandidateDetails>,
) -> Result<Json<Workflow>, PipelineError>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    service
        .update_candidate_details(&WorkflowId(workflow_id), patch)
        .map(Json)
}
