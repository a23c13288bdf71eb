use chrono::NaiveDateTime;

use super::actions::{
    AnswerSubmission, InterviewSetup, OnboardingUpdate, ResultSubmission, TestSetup,
    WorkflowAction,
};
use super::domain::{
    Decision, Interview1Outcome, Interview1Setup, Onboarding, Stage, TechTestSetup, Workflow,
};
use crate::config::PipelineConfig;
use crate::error::{ConflictReason, PipelineError};
use crate::panels::domain::TimeSlot;
use crate::refs::UserRef;

/// Inputs a transition needs beyond the workflow and the action itself.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub actor: &'a UserRef,
    pub now: NaiveDateTime,
    /// Slot already reserved for this workflow; required for interview setup.
    pub booked_slot: Option<&'a TimeSlot>,
}

/// Pure stage machine: validates preconditions and computes the next workflow revision.
/// It never touches storage; the pipeline service owns persistence and slot booking.
#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    config: PipelineConfig,
}

impl WorkflowStateMachine {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fails with `StateConflict` unless `action` is legal in the workflow's current stage.
    pub fn check(&self, workflow: &Workflow, action: &WorkflowAction) -> Result<(), PipelineError> {
        let stage = workflow.current_stage;
        if action.permitted_from().contains(&stage) {
            return Ok(());
        }

        Err(PipelineError::StateConflict {
            workflow_id: workflow.id.clone(),
            action: action.name(),
            reason: ConflictReason::refused_in(stage),
        })
    }

    /// Returns the next revision of `workflow`; the input is left untouched.
    pub fn apply(
        &self,
        workflow: &Workflow,
        action: &WorkflowAction,
        context: TransitionContext<'_>,
    ) -> Result<Workflow, PipelineError> {
        self.check(workflow, action)?;

        let mut next = workflow.next_revision(context.now);
        match action {
            WorkflowAction::SetupInterview(setup) => {
                self.setup_interview(&mut next, setup, context)?
            }
            WorkflowAction::RecordResult(submission) => {
                self.record_result(&mut next, submission, context)
            }
            WorkflowAction::SetupTest(setup) => self.setup_test(&mut next, setup, context),
            WorkflowAction::SubmitAnswers(submission) => {
                self.submit_answers(&mut next, submission, context)
            }
            WorkflowAction::UpdateOnboarding(update) => {
                self.update_onboarding(&mut next, *update, context)
            }
        }

        Ok(next)
    }

    fn setup_interview(
        &self,
        next: &mut Workflow,
        setup: &InterviewSetup,
        context: TransitionContext<'_>,
    ) -> Result<(), PipelineError> {
        let slot = context
            .booked_slot
            .filter(|slot| slot.id == setup.slot_id)
            .ok_or_else(|| {
                PipelineError::validation(
                    "slot_id",
                    "the time slot must be reserved before the interview is scheduled",
                )
            })?;

        next.stages.interview1_setup = Some(Interview1Setup {
            panel_id: setup.panel_id.clone(),
            scheduled_date: setup.date,
            scheduled_time: slot.window().label(),
            slot_id: slot.id.clone(),
            meeting_link: setup
                .meeting_link
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            assigned_by: context.actor.clone(),
            setup_at: context.now,
        });
        next.current_stage = Stage::Interview1;
        next.next_activity_date = Some(slot.start_time.on(setup.date));
        Ok(())
    }

    fn record_result(
        &self,
        next: &mut Workflow,
        submission: &ResultSubmission,
        context: TransitionContext<'_>,
    ) {
        let selected = submission.result == Decision::Select;

        if next.current_stage == Stage::Interview1 {
            next.stages.interview1 = Some(Interview1Outcome {
                conducted_at: context.now,
                remarks: submission.remarks.trim().to_string(),
                result: submission.result,
                reviewed_by: context.actor.clone(),
                feedback_link: submission
                    .feedback_link
                    .as_deref()
                    .map(str::trim)
                    .filter(|link| !link.is_empty())
                    .map(str::to_string),
                feedback_form: submission.attachment.clone(),
            });

            if selected {
                next.current_stage = Stage::TechTestSetup;
                next.next_activity_date = Some(context.now + self.config.interview_followup());
            } else {
                next.current_stage = Stage::Rejected;
                next.next_activity_date = None;
            }
            return;
        }

        let mut test = next.stages.technical_test.take().unwrap_or_default();
        test.result = Some(submission.result);
        test.remarks = Some(submission.remarks.trim().to_string());
        test.reviewed_by = Some(context.actor.clone());
        test.reviewed_at = Some(context.now);
        if let Some(file) = &submission.attachment {
            test.result_file = Some(file.clone());
        }
        next.stages.technical_test = Some(test);

        if selected {
            next.current_stage = Stage::Onboarding;
            next.next_activity_date = Some(context.now + self.config.onboarding_window());
        } else {
            next.current_stage = Stage::Rejected;
            next.next_activity_date = None;
        }
    }

    fn setup_test(&self, next: &mut Workflow, setup: &TestSetup, context: TransitionContext<'_>) {
        next.stages.technical_test_setup = Some(TechTestSetup {
            test_paper: setup.test_paper.clone(),
            scheduled_at: setup.scheduled_at,
            evaluators: setup.evaluators.clone(),
            notify_candidate: setup.notify_candidate,
            send_attachment_in_notification: setup.send_attachment_in_notification,
            setup_by: context.actor.clone(),
        });
        next.current_stage = Stage::TechTestScheduled;
        next.next_activity_date = Some(setup.scheduled_at);
    }

    fn submit_answers(
        &self,
        next: &mut Workflow,
        submission: &AnswerSubmission,
        context: TransitionContext<'_>,
    ) {
        let mut test = next.stages.technical_test.take().unwrap_or_default();
        if let Some(setup) = &next.stages.technical_test_setup {
            test.test_paper = Some(setup.test_paper.clone());
            test.scheduled_at = Some(setup.scheduled_at);
            test.evaluators = setup.evaluators.clone();
            test.notify_candidate = setup.notify_candidate;
            test.send_attachment_in_notification = setup.send_attachment_in_notification;
        }
        test.answer_sheet = Some(submission.answer_sheet.clone());
        test.assigned_reviewers = submission.reviewers.clone();
        test.submitted_at = Some(context.now);
        next.stages.technical_test = Some(test);

        next.current_stage = Stage::TechTestReview;
        next.next_activity_date = Some(context.now + self.config.review_window());
    }

    fn update_onboarding(
        &self,
        next: &mut Workflow,
        update: OnboardingUpdate,
        context: TransitionContext<'_>,
    ) {
        let current = next.stages.onboarding.take().unwrap_or_default();
        let mut onboarding = Onboarding {
            background_check_done: update
                .background_check_done
                .unwrap_or(current.background_check_done),
            offer_letter_released: update
                .offer_letter_released
                .unwrap_or(current.offer_letter_released),
            completed_at: current.completed_at,
            completed_by: current.completed_by,
        };

        if update.complete {
            onboarding.completed_at = Some(context.now);
            onboarding.completed_by = Some(context.actor.clone());
            next.current_stage = Stage::Completed;
            next.next_activity_date = None;
        }
        next.stages.onboarding = Some(onboarding);
    }
}
