use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use super::actions::{InterviewSetup, WorkflowAction};
use super::domain::{CandidateDetails, NewWorkflow, Stage, Workflow, WorkflowId};
use super::machine::{TransitionContext, WorkflowStateMachine};
use super::repository::{RepositoryError, WorkflowRepository};
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::error::{ConflictReason, PipelineError};
use crate::panels::domain::{PanelId, SlotId};
use crate::panels::repository::PanelRepository;
use crate::panels::store::SlotStore;
use crate::refs::UserRef;

/// Workflows sharing the same next-activity date.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityGroup {
    pub date: Option<NaiveDate>,
    pub label: String,
    pub workflows: Vec<Workflow>,
}

/// Service composing the stage machine, workflow storage, and the panel slot store.
pub struct PipelineService<W, P> {
    workflows: Arc<W>,
    slots: Arc<SlotStore<P>>,
    machine: WorkflowStateMachine,
    clock: Arc<dyn Clock>,
}

impl<W, P> PipelineService<W, P>
where
    W: WorkflowRepository + 'static,
    P: PanelRepository + 'static,
{
    pub fn new(
        workflows: Arc<W>,
        slots: Arc<SlotStore<P>>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            workflows,
            slots,
            machine: WorkflowStateMachine::new(config),
            clock,
        }
    }

    pub fn slots(&self) -> &Arc<SlotStore<P>> {
        &self.slots
    }

    /// Creates the workflow for a shortlisted application at the first stage.
    pub fn promote(&self, request: NewWorkflow) -> Result<Workflow, PipelineError> {
        let now = self.clock.now();
        let deadline = now + self.machine.config().shortlist_window();
        let workflow = Workflow::start(request, now, deadline)?;
        let stored = self.workflows.insert(workflow)?;
        info!(
            workflow_id = %stored.id,
            application = %stored.application.0,
            "application promoted into pipeline"
        );
        Ok(stored)
    }

    pub fn get(&self, workflow_id: &WorkflowId) -> Result<Workflow, PipelineError> {
        self.workflows
            .fetch(workflow_id)?
            .ok_or_else(|| PipelineError::not_found("workflow", workflow_id))
    }

    /// All workflows ordered by next activity date (unscheduled last), newest first on ties.
    pub fn activities(&self) -> Result<Vec<Workflow>, PipelineError> {
        let mut workflows = self.workflows.list()?;
        workflows.sort_by(|a, b| {
            let by_date = match (a.next_activity_date, b.next_activity_date) {
                (Some(left), Some(right)) => left.cmp(&right),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_date
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(workflows)
    }

    /// Activities bucketed by calendar date of the next activity.
    pub fn activities_by_date(&self) -> Result<Vec<ActivityGroup>, PipelineError> {
        let mut groups: Vec<ActivityGroup> = Vec::new();
        for workflow in self.activities()? {
            let date = workflow.next_activity_date.map(|at| at.date());
            match groups.last_mut() {
                Some(group) if group.date == date => group.workflows.push(workflow),
                _ => groups.push(ActivityGroup {
                    date,
                    label: date
                        .map(|day| day.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "unscheduled".to_string()),
                    workflows: vec![workflow],
                }),
            }
        }
        Ok(groups)
    }

    /// Applies a stage-gated action. Interview setup books the slot first; a failed
    /// commit releases it again so no partial write survives.
    pub fn transition(
        &self,
        workflow_id: &WorkflowId,
        actor: &UserRef,
        action: WorkflowAction,
    ) -> Result<Workflow, PipelineError> {
        self.run(workflow_id, actor, None, action)
    }

    /// Like [`Self::transition`], but additionally pins the stage the workflow must be in.
    /// Result submissions are legal in two stages; the HTTP routes use this to keep the
    /// interview and technical test endpoints apart.
    pub fn transition_at(
        &self,
        workflow_id: &WorkflowId,
        actor: &UserRef,
        stage: Stage,
        action: WorkflowAction,
    ) -> Result<Workflow, PipelineError> {
        self.run(workflow_id, actor, Some(stage), action)
    }

    fn run(
        &self,
        workflow_id: &WorkflowId,
        actor: &UserRef,
        expected: Option<Stage>,
        action: WorkflowAction,
    ) -> Result<Workflow, PipelineError> {
        action.validate()?;
        let workflow = self.get(workflow_id)?;

        let checked = match expected {
            Some(stage) if stage != workflow.current_stage => {
                Err(PipelineError::StateConflict {
                    workflow_id: workflow.id.clone(),
                    action: action.name(),
                    reason: ConflictReason::refused_in(workflow.current_stage),
                })
            }
            _ => self.machine.check(&workflow, &action),
        };
        if let Err(err) = checked {
            warn!(
                %workflow_id,
                action = action.name(),
                stage = %workflow.current_stage,
                "transition refused"
            );
            return Err(err);
        }

        let booked = match &action {
            WorkflowAction::SetupInterview(setup) => Some(self.slots.book_slot(
                &setup.panel_id,
                setup.date,
                &setup.slot_id,
                &workflow.id,
            )?),
            _ => None,
        };

        let context = TransitionContext {
            actor,
            now: self.clock.now(),
            booked_slot: booked.as_ref(),
        };
        let next = match self.machine.apply(&workflow, &action, context) {
            Ok(next) => next,
            Err(err) => {
                self.compensate(&workflow.id, &action);
                return Err(err);
            }
        };

        if let Err(err) = self.commit(&workflow, next.clone(), action.name()) {
            self.compensate(&workflow.id, &action);
            return Err(err);
        }

        info!(
            %workflow_id,
            action = action.name(),
            from = %workflow.current_stage,
            to = %next.current_stage,
            "workflow transitioned"
        );
        Ok(next)
    }

    /// Books a panel slot and moves the workflow from interview setup to interview 1.
    pub fn book_interview_slot(
        &self,
        workflow_id: &WorkflowId,
        actor: &UserRef,
        panel_id: PanelId,
        date: NaiveDate,
        slot_id: SlotId,
        meeting_link: Option<String>,
    ) -> Result<Workflow, PipelineError> {
        self.transition(
            workflow_id,
            actor,
            WorkflowAction::SetupInterview(InterviewSetup {
                panel_id,
                date,
                slot_id,
                meeting_link,
            }),
        )
    }

    /// Stage-independent merge of salary and notice-period details.
    pub fn update_candidate_details(
        &self,
        workflow_id: &WorkflowId,
        patch: CandidateDetails,
    ) -> Result<Workflow, PipelineError> {
        let workflow = self.get(workflow_id)?;
        let details = workflow.candidate_details.merged(patch)?;

        let mut next = workflow.next_revision(self.clock.now());
        next.candidate_details = details;
        self.commit(&workflow, next.clone(), "update_candidate_details")?;

        info!(%workflow_id, "candidate details updated");
        Ok(next)
    }

    fn commit(
        &self,
        previous: &Workflow,
        next: Workflow,
        action: &'static str,
    ) -> Result<(), PipelineError> {
        match self.workflows.replace(next, previous.version) {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict) => {
                warn!(
                    workflow_id = %previous.id,
                    action,
                    expected_version = previous.version,
                    "workflow modified concurrently"
                );
                Err(PipelineError::StateConflict {
                    workflow_id: previous.id.clone(),
                    action,
                    reason: ConflictReason::ConcurrentUpdate,
                })
            }
            Err(RepositoryError::NotFound) => {
                Err(PipelineError::not_found("workflow", &previous.id))
            }
            Err(other) => Err(other.into()),
        }
    }

    fn compensate(&self, workflow_id: &WorkflowId, action: &WorkflowAction) {
        let WorkflowAction::SetupInterview(setup) = action else {
            return;
        };

        match self
            .slots
            .release_slot(&setup.panel_id, setup.date, &setup.slot_id, workflow_id)
        {
            Ok(_) => {}
            Err(err) => error!(
                %workflow_id,
                panel_id = %setup.panel_id,
                slot_id = %setup.slot_id,
                error = %err,
                "failed to release slot after aborted transition"
            ),
        }
    }
}
