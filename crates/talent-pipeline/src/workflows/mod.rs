//! Per-candidate hiring workflows: stage machine, persistence seam, and HTTP surface.
//!
//! Every transition is checked against the current stage before anything is written.
//! Interview setup couples a slot booking to the stage change; the service releases the
//! slot again when the workflow commit does not go through.

pub mod actions;
pub mod domain;
pub mod machine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use actions::{
    AnswerSubmission, InterviewSetup, OnboardingUpdate, ResultSubmission, TestSetup,
    WorkflowAction,
};
pub use domain::{
    CandidateDetails, Decision, Interview1Outcome, Interview1Setup, NewWorkflow, Onboarding,
    Stage, StageRecords, TechTest, TechTestSetup, Workflow, WorkflowId,
};
pub use machine::{TransitionContext, WorkflowStateMachine};
pub use repository::WorkflowRepository;
pub use router::{workflow_router, ACTOR_HEADER};
pub use service::{ActivityGroup, PipelineService};
