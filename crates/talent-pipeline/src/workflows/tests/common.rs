use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, RepositoryError};
use crate::panels::domain::{NewPanel, Panel, SlotId, SlotWindow, TimeOfDay};
use crate::panels::store::SlotStore;
use crate::refs::{ApplicationRef, CampaignRef, FileHandle, UserRef};
use crate::storage::{InMemoryPanelRepository, InMemoryWorkflowRepository};
use crate::workflows::actions::{AnswerSubmission, ResultSubmission, TestSetup, WorkflowAction};
use crate::workflows::domain::{Decision, NewWorkflow, Workflow, WorkflowId};
use crate::workflows::repository::WorkflowRepository;
use crate::workflows::service::PipelineService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

/// Monday of the booked interview in every fixture.
pub(super) fn interview_day() -> NaiveDate {
    date(2024, 6, 3)
}

pub(super) fn recruiter() -> UserRef {
    UserRef("user-recruiter".to_string())
}

pub(super) fn file(filename: &str, mime_type: &str) -> FileHandle {
    FileHandle {
        filename: filename.to_string(),
        storage_path: format!("uploads/{filename}"),
        mime_type: mime_type.to_string(),
    }
}

pub(super) fn new_workflow(candidate: &str) -> NewWorkflow {
    NewWorkflow {
        application: ApplicationRef(format!("app-{candidate}")),
        campaign: CampaignRef("campaign-backend-2024".to_string()),
        candidate_name: candidate.to_string(),
    }
}

pub(super) fn decision(result: Decision, remarks: &str) -> WorkflowAction {
    WorkflowAction::RecordResult(ResultSubmission {
        result,
        remarks: remarks.to_string(),
        feedback_link: None,
        attachment: None,
    })
}

pub(super) fn test_setup() -> WorkflowAction {
    WorkflowAction::SetupTest(TestSetup {
        test_paper: file("backend-test.pdf", "application/pdf"),
        scheduled_at: at(2024, 6, 12, 10, 0),
        evaluators: vec![UserRef("user-eval".to_string())],
        notify_candidate: true,
        send_attachment_in_notification: false,
    })
}

pub(super) fn answers() -> WorkflowAction {
    WorkflowAction::SubmitAnswers(AnswerSubmission {
        answer_sheet: file("answers.zip", "application/zip"),
        reviewers: vec![UserRef("user-reviewer".to_string())],
    })
}

pub(super) struct Harness<W> {
    pub(super) service: Arc<PipelineService<W, InMemoryPanelRepository>>,
    pub(super) slots: Arc<SlotStore<InMemoryPanelRepository>>,
    pub(super) clock: Arc<FixedClock>,
    pub(super) panel: Panel,
    pub(super) slot_id: SlotId,
}

pub(super) fn harness() -> Harness<InMemoryWorkflowRepository> {
    harness_with(Arc::new(InMemoryWorkflowRepository::default()))
}

/// Service at 2024-06-01 08:00 with one panel offering 09:00-10:00 on [`interview_day`].
pub(super) fn harness_with<W>(workflows: Arc<W>) -> Harness<W>
where
    W: WorkflowRepository + 'static,
{
    let clock = Arc::new(FixedClock::new(at(2024, 6, 1, 8, 0)));
    let slots = Arc::new(SlotStore::new(
        Arc::new(InMemoryPanelRepository::default()),
        clock.clone(),
    ));
    let panel = slots
        .create_panel(NewPanel {
            name: "Platform Engineering".to_string(),
            description: "Backend interviews".to_string(),
            members: vec![UserRef("user-ana".to_string())],
            timezone: None,
        })
        .expect("panel created");
    let window = SlotWindow::new(
        TimeOfDay::new(9, 0).expect("valid time"),
        TimeOfDay::new(10, 0).expect("valid time"),
    );
    let panel = slots
        .upsert_availability(&panel.id, interview_day(), vec![window])
        .expect("availability stored");
    let slot_id = panel.day(interview_day()).expect("entry").time_slots[0]
        .id
        .clone();

    let service = Arc::new(PipelineService::new(
        workflows,
        slots.clone(),
        clock.clone(),
        PipelineConfig::default(),
    ));

    Harness {
        service,
        slots,
        clock,
        panel,
        slot_id,
    }
}

impl<W> Harness<W>
where
    W: WorkflowRepository + 'static,
{
    pub(super) fn book(&self, workflow_id: &WorkflowId) -> Result<Workflow, PipelineError> {
        self.service.book_interview_slot(
            workflow_id,
            &recruiter(),
            self.panel.id.clone(),
            interview_day(),
            self.slot_id.clone(),
            Some("https://meet.example.com/abc".to_string()),
        )
    }

    pub(super) fn slot_is_open(&self) -> bool {
        self.slots
            .query_available(&self.panel.id, interview_day(), interview_day())
            .expect("query succeeds")
            .iter()
            .any(|entry| entry.slot(&self.slot_id).is_some())
    }

    /// Adds a 09:00-10:00 slot on `day` and returns its id. `day` must differ from
    /// [`interview_day`], whose entry would otherwise be replaced.
    pub(super) fn open_slot(&self, day: NaiveDate) -> SlotId {
        let window = SlotWindow::new(
            TimeOfDay::new(9, 0).expect("valid time"),
            TimeOfDay::new(10, 0).expect("valid time"),
        );
        let panel = self
            .slots
            .upsert_availability(&self.panel.id, day, vec![window])
            .expect("availability stored");
        panel.day(day).expect("entry").time_slots[0].id.clone()
    }

    /// Drives a fresh workflow up to technical test review, interviewing on `day`.
    pub(super) fn at_review(&self, candidate: &str, day: NaiveDate) -> Workflow {
        let workflow = self
            .service
            .promote(new_workflow(candidate))
            .expect("promoted");
        let slot_id = self.open_slot(day);
        self.service
            .book_interview_slot(
                &workflow.id,
                &recruiter(),
                self.panel.id.clone(),
                day,
                slot_id,
                None,
            )
            .expect("interview booked");
        for action in [
            decision(Decision::Select, "solid fundamentals"),
            test_setup(),
            answers(),
        ] {
            self.service
                .transition(&workflow.id, &recruiter(), action)
                .expect("transition applies");
        }
        self.service.get(&workflow.id).expect("workflow stored")
    }
}

/// Repository whose compare-and-set always loses, as if another writer got there first.
#[derive(Default)]
pub(super) struct RacingWorkflowRepository {
    pub(super) inner: InMemoryWorkflowRepository,
}

impl WorkflowRepository for RacingWorkflowRepository {
    fn insert(&self, workflow: Workflow) -> Result<Workflow, RepositoryError> {
        self.inner.insert(workflow)
    }

    fn replace(&self, _workflow: Workflow, _expected_version: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Workflow>, RepositoryError> {
        self.inner.list()
    }
}

/// Repository that accepts inserts and reads but fails every write after that.
#[derive(Default)]
pub(super) struct ReadOnlyWorkflowRepository {
    pub(super) inner: InMemoryWorkflowRepository,
}

impl WorkflowRepository for ReadOnlyWorkflowRepository {
    fn insert(&self, workflow: Workflow) -> Result<Workflow, RepositoryError> {
        self.inner.insert(workflow)
    }

    fn replace(&self, _workflow: Workflow, _expected_version: u64) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Workflow>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
