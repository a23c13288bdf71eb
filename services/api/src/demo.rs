use crate::infra::{in_memory_services, Pipeline};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use std::sync::Arc;
use talent_pipeline::clock::FixedClock;
use talent_pipeline::config::PipelineConfig;
use talent_pipeline::error::{AppError, PipelineError};
use talent_pipeline::panels::domain::weekday_index;
use talent_pipeline::panels::{NewPanel, RecurringRuleExpander, SlotTemplate, TimeOfDay};
use talent_pipeline::refs::{ApplicationRef, CampaignRef, FileHandle, UserRef};
use talent_pipeline::workflows::{
    AnswerSubmission, Decision, NewWorkflow, OnboardingUpdate, ResultSubmission, TestSetup,
    Workflow, WorkflowAction,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First interview date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = talent_pipeline::dates::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args
        .start_date
        .unwrap_or_else(|| Local::now().date_naive());
    let clock = Arc::new(FixedClock::new(morning(start, 8)));
    let (slots, pipeline) = in_memory_services(clock.clone(), PipelineConfig::default());

    println!("Talent pipeline demo starting {start}");

    let panel = slots.create_panel(NewPanel {
        name: "Platform Engineering".to_string(),
        description: "Backend and infrastructure interviews".to_string(),
        members: vec![user("ana"), user("raj")],
        timezone: None,
    })?;
    let templates = vec![template("09:00", "10:00")?, template("14:00", "15:00")?];
    slots.add_recurring_rule(&panel.id, weekday_index(start), templates)?;
    let generated = RecurringRuleExpander::new(slots.clone()).expand(
        &panel.id,
        start,
        start + Duration::days(13),
    )?;
    println!(
        "- Panel {} ({}) generated {} dated entries",
        panel.name,
        panel.id,
        generated.len()
    );

    let workflow = pipeline.promote(NewWorkflow {
        application: ApplicationRef("app-demo-001".to_string()),
        campaign: CampaignRef("campaign-platform".to_string()),
        candidate_name: "Maya Chen".to_string(),
    })?;
    report("Promoted", &workflow);

    let open = slots.query_available(&panel.id, start, start + Duration::days(6))?;
    let Some((date, slot)) = open
        .iter()
        .find_map(|entry| entry.time_slots.first().map(|slot| (entry.date, slot.clone())))
    else {
        println!("  No open slots in the first week; stopping");
        return Ok(());
    };
    println!(
        "- {} open slots this week, booking {} on {date}",
        open.iter().map(|entry| entry.time_slots.len()).sum::<usize>(),
        slot.window().label()
    );

    let recruiter = user("recruiter");
    let workflow = pipeline.book_interview_slot(
        &workflow.id,
        &recruiter,
        panel.id.clone(),
        date,
        slot.id.clone(),
        Some("https://meet.example.com/maya".to_string()),
    )?;
    report("Interview booked", &workflow);

    let rival = pipeline.promote(NewWorkflow {
        application: ApplicationRef("app-demo-002".to_string()),
        campaign: CampaignRef("campaign-platform".to_string()),
        candidate_name: "Jonas Weber".to_string(),
    })?;
    match pipeline.book_interview_slot(
        &rival.id,
        &recruiter,
        panel.id.clone(),
        date,
        slot.id.clone(),
        None,
    ) {
        Ok(_) => println!("  Unexpected double booking for {}", rival.candidate_name),
        Err(err) => println!("  Second booking of the same slot refused: {err}"),
    }

    clock.set(morning(date, 11));
    let workflow = step(
        &pipeline,
        &workflow,
        &user("ana"),
        WorkflowAction::RecordResult(ResultSubmission {
            result: Decision::Select,
            remarks: "Strong systems fundamentals".to_string(),
            feedback_link: Some("https://forms.example.com/feedback/1".to_string()),
            attachment: None,
        }),
        "Interview result recorded",
    )?;

    let test_at = morning(date + Duration::days(2), 10);
    let workflow = step(
        &pipeline,
        &workflow,
        &recruiter,
        WorkflowAction::SetupTest(TestSetup {
            test_paper: document("platform-test.pdf", "application/pdf"),
            scheduled_at: test_at,
            evaluators: vec![user("raj")],
            notify_candidate: true,
            send_attachment_in_notification: false,
        }),
        "Technical test scheduled",
    )?;

    clock.set(test_at + Duration::hours(3));
    let workflow = step(
        &pipeline,
        &workflow,
        &recruiter,
        WorkflowAction::SubmitAnswers(AnswerSubmission {
            answer_sheet: document("answers.zip", "application/zip"),
            reviewers: vec![user("raj")],
        }),
        "Answers submitted",
    )?;

    clock.advance(Duration::days(1));
    let workflow = step(
        &pipeline,
        &workflow,
        &user("raj"),
        WorkflowAction::RecordResult(ResultSubmission {
            result: Decision::Select,
            remarks: "Clean, well tested solution".to_string(),
            feedback_link: None,
            attachment: None,
        }),
        "Technical test reviewed",
    )?;

    clock.advance(Duration::days(3));
    step(
        &pipeline,
        &workflow,
        &recruiter,
        WorkflowAction::UpdateOnboarding(OnboardingUpdate {
            background_check_done: Some(true),
            offer_letter_released: Some(true),
            complete: true,
        }),
        "Onboarding completed",
    )?;

    println!("\nUpcoming activities");
    for group in pipeline.activities_by_date()? {
        println!("  {}", group.label);
        for workflow in &group.workflows {
            println!(
                "    - {} [{}] {}",
                workflow.candidate_name, workflow.id, workflow.current_stage
            );
        }
    }

    Ok(())
}

fn step(
    pipeline: &Pipeline,
    workflow: &Workflow,
    actor: &UserRef,
    action: WorkflowAction,
    label: &str,
) -> Result<Workflow, AppError> {
    let next = pipeline.transition(&workflow.id, actor, action)?;
    report(label, &next);
    Ok(next)
}

fn report(label: &str, workflow: &Workflow) {
    let next = workflow
        .next_activity_date
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "none".to_string());
    println!(
        "- {label}: {} is at '{}' (next activity {next})",
        workflow.candidate_name, workflow.current_stage
    );
}

fn morning(date: NaiveDate, hour: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour)
}

fn template(start: &str, end: &str) -> Result<SlotTemplate, PipelineError> {
    let parse = |raw: &str| {
        TimeOfDay::parse(raw).map_err(|message| PipelineError::validation("time_slots", message))
    };
    Ok(SlotTemplate::new(parse(start)?, parse(end)?))
}

fn user(name: &str) -> UserRef {
    UserRef(format!("user-{name}"))
}

fn document(filename: &str, mime_type: &str) -> FileHandle {
    FileHandle {
        filename: filename.to_string(),
        storage_path: format!("demo/{filename}"),
        mime_type: mime_type.to_string(),
    }
}
