use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::panels::domain::{PanelId, SlotId};
use crate::refs::{ApplicationRef, CampaignRef, FileHandle, UserRef};

static WORKFLOW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Identifier wrapper for candidate workflows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl WorkflowId {
    pub(crate) fn next() -> Self {
        let id = WORKFLOW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("wf-{id:06}"))
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage a candidate currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Interview1Setup,
    Interview1,
    TechTestSetup,
    TechTestScheduled,
    TechTestReview,
    Onboarding,
    Completed,
    Rejected,
}

impl Stage {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Interview1Setup,
            Self::Interview1,
            Self::TechTestSetup,
            Self::TechTestScheduled,
            Self::TechTestReview,
            Self::Onboarding,
            Self::Completed,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Interview1Setup => "Interview 1 - Set up",
            Self::Interview1 => "Interview 1",
            Self::TechTestSetup => "Technical Test - Set up",
            Self::TechTestScheduled => "Technical Test - Scheduled",
            Self::TechTestReview => "Technical Test - Review",
            Self::Onboarding => "Onboarding",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reviewer verdict for interview and technical test results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Select,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview1Setup {
    pub panel_id: PanelId,
    pub scheduled_date: NaiveDate,
    /// "HH:MM - HH:MM" of the booked slot.
    pub scheduled_time: String,
    pub slot_id: SlotId,
    pub meeting_link: String,
    pub assigned_by: UserRef,
    pub setup_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview1Outcome {
    pub conducted_at: NaiveDateTime,
    pub remarks: String,
    pub result: Decision,
    pub reviewed_by: UserRef,
    pub feedback_link: Option<String>,
    pub feedback_form: Option<FileHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechTestSetup {
    pub test_paper: FileHandle,
    pub scheduled_at: NaiveDateTime,
    pub evaluators: Vec<UserRef>,
    pub notify_candidate: bool,
    pub send_attachment_in_notification: bool,
    pub setup_by: UserRef,
}

/// Submission and review record. Setup fields are carried forward on submission so the
/// record stays complete on its own; result fields are merged in by the review.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TechTest {
    pub test_paper: Option<FileHandle>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub evaluators: Vec<UserRef>,
    pub notify_candidate: bool,
    pub send_attachment_in_notification: bool,
    pub answer_sheet: Option<FileHandle>,
    pub assigned_reviewers: Vec<UserRef>,
    pub submitted_at: Option<NaiveDateTime>,
    pub result: Option<Decision>,
    pub remarks: Option<String>,
    pub result_file: Option<FileHandle>,
    pub reviewed_by: Option<UserRef>,
    pub reviewed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Onboarding {
    pub background_check_done: bool,
    pub offer_letter_released: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub completed_by: Option<UserRef>,
}

/// One optional sub-record per stage; entering a later stage never clears earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageRecords {
    pub interview1_setup: Option<Interview1Setup>,
    pub interview1: Option<Interview1Outcome>,
    pub technical_test_setup: Option<TechTestSetup>,
    pub technical_test: Option<TechTest>,
    pub onboarding: Option<Onboarding>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub current_salary: Option<f64>,
    pub expected_salary: Option<f64>,
    pub notice_period: Option<String>,
    pub remarks: Option<String>,
}

impl CandidateDetails {
    /// Field-wise merge: fields absent from `patch` keep their stored value.
    pub fn merged(&self, patch: CandidateDetails) -> Result<Self, PipelineError> {
        for (field, value) in [
            ("current_salary", patch.current_salary),
            ("expected_salary", patch.expected_salary),
        ] {
            if let Some(amount) = value {
                if !amount.is_finite() || amount < 0.0 {
                    return Err(PipelineError::validation(
                        field,
                        "salary must be a non-negative number",
                    ));
                }
            }
        }

        Ok(Self {
            current_salary: patch.current_salary.or(self.current_salary),
            expected_salary: patch.expected_salary.or(self.expected_salary),
            notice_period: patch.notice_period.or_else(|| self.notice_period.clone()),
            remarks: patch.remarks.or_else(|| self.remarks.clone()),
        })
    }
}

/// Application promoted into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub application: ApplicationRef,
    pub campaign: CampaignRef,
    pub candidate_name: String,
}

/// Per-candidate pipeline progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub application: ApplicationRef,
    pub campaign: CampaignRef,
    pub candidate_name: String,
    pub current_stage: Stage,
    pub next_activity_date: Option<NaiveDateTime>,
    pub stages: StageRecords,
    pub candidate_details: CandidateDetails,
    /// Bumped on every committed write; used for optimistic concurrency.
    pub version: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Workflow {
    pub fn start(
        request: NewWorkflow,
        now: NaiveDateTime,
        first_deadline: NaiveDateTime,
    ) -> Result<Self, PipelineError> {
        let candidate_name = request.candidate_name.trim();
        if candidate_name.is_empty() {
            return Err(PipelineError::validation(
                "candidate_name",
                "candidate name is required",
            ));
        }
        if request.application.0.trim().is_empty() {
            return Err(PipelineError::validation(
                "application",
                "application reference is required",
            ));
        }
        if request.campaign.0.trim().is_empty() {
            return Err(PipelineError::validation(
                "campaign",
                "campaign reference is required",
            ));
        }

        Ok(Self {
            id: WorkflowId::next(),
            application: request.application,
            campaign: request.campaign,
            candidate_name: candidate_name.to_string(),
            current_stage: Stage::Interview1Setup,
            next_activity_date: Some(first_deadline),
            stages: StageRecords::default(),
            candidate_details: CandidateDetails::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Copy prepared for the next commit: version bumped and timestamp refreshed.
    pub(crate) fn next_revision(&self, now: NaiveDateTime) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }
}
