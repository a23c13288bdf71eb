use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{Decision, Stage};
use crate::error::PipelineError;
use crate::panels::domain::{PanelId, SlotId};
use crate::refs::{FileHandle, UserRef};

/// Stage-gated operation requested against a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowAction {
    SetupInterview(InterviewSetup),
    RecordResult(ResultSubmission),
    SetupTest(TestSetup),
    SubmitAnswers(AnswerSubmission),
    UpdateOnboarding(OnboardingUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSetup {
    pub panel_id: PanelId,
    pub date: NaiveDate,
    pub slot_id: SlotId,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub result: Decision,
    pub remarks: String,
    /// Only recorded for interview results.
    #[serde(default)]
    pub feedback_link: Option<String>,
    /// Feedback form for interviews, result file for technical tests.
    #[serde(default)]
    pub attachment: Option<FileHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetup {
    pub test_paper: FileHandle,
    #[serde(deserialize_with = "crate::dates::deserialize_datetime")]
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub evaluators: Vec<UserRef>,
    #[serde(default)]
    pub notify_candidate: bool,
    #[serde(default)]
    pub send_attachment_in_notification: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub answer_sheet: FileHandle,
    pub reviewers: Vec<UserRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OnboardingUpdate {
    #[serde(default)]
    pub background_check_done: Option<bool>,
    #[serde(default)]
    pub offer_letter_released: Option<bool>,
    #[serde(default)]
    pub complete: bool,
}

impl WorkflowAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetupInterview(_) => "setup_interview",
            Self::RecordResult(_) => "record_result",
            Self::SetupTest(_) => "setup_test",
            Self::SubmitAnswers(_) => "submit_answers",
            Self::UpdateOnboarding(_) => "update_onboarding",
        }
    }

    /// Stages in which the action is legal.
    pub const fn permitted_from(&self) -> &'static [Stage] {
        match self {
            Self::SetupInterview(_) => &[Stage::Interview1Setup],
            Self::RecordResult(_) => &[Stage::Interview1, Stage::TechTestReview],
            Self::SetupTest(_) => &[Stage::TechTestSetup],
            Self::SubmitAnswers(_) => &[Stage::TechTestScheduled],
            Self::UpdateOnboarding(_) => &[Stage::Onboarding],
        }
    }

    /// Payload checks that do not depend on stored state.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self {
            Self::SetupInterview(setup) => {
                if setup.panel_id.0.trim().is_empty() {
                    return Err(PipelineError::validation("panel_id", "panel is required"));
                }
                if setup.slot_id.0.trim().is_empty() {
                    return Err(PipelineError::validation(
                        "slot_id",
                        "time slot selection is required",
                    ));
                }
                validate_link("meeting_link", setup.meeting_link.as_deref())
            }
            Self::RecordResult(submission) => {
                if submission.remarks.trim().is_empty() {
                    return Err(PipelineError::validation("remarks", "remarks are required"));
                }
                validate_link("feedback_link", submission.feedback_link.as_deref())?;
                match &submission.attachment {
                    Some(file) => file.validate("attachment"),
                    None => Ok(()),
                }
            }
            Self::SetupTest(setup) => setup.test_paper.validate("test_paper"),
            Self::SubmitAnswers(submission) => {
                submission.answer_sheet.validate("answer_sheet")?;
                if submission.reviewers.is_empty() {
                    return Err(PipelineError::validation(
                        "reviewers",
                        "at least one reviewer is required",
                    ));
                }
                Ok(())
            }
            Self::UpdateOnboarding(_) => Ok(()),
        }
    }
}

/// Links are optional, but a non-blank link must be http(s).
fn validate_link(field: &'static str, link: Option<&str>) -> Result<(), PipelineError> {
    match link.map(str::trim) {
        Some(value)
            if !value.is_empty()
                && !(value.starts_with("http://") || value.starts_with("https://")) =>
        {
            Err(PipelineError::validation(
                field,
                "link must start with http:// or https://",
            ))
        }
        _ => Ok(()),
    }
}
