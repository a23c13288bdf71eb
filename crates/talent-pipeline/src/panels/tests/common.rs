use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::error::RepositoryError;
use crate::panels::domain::{NewPanel, Panel, PanelId, SlotTemplate, SlotWindow, TimeOfDay};
use crate::panels::repository::PanelRepository;
use crate::panels::store::SlotStore;
use crate::refs::UserRef;
use crate::storage::InMemoryPanelRepository;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}

pub(super) fn time(raw: &str) -> TimeOfDay {
    TimeOfDay::parse(raw).expect("valid time of day")
}

pub(super) fn window(start: &str, end: &str) -> SlotWindow {
    SlotWindow::new(time(start), time(end))
}

pub(super) fn template(start: &str, end: &str) -> SlotTemplate {
    SlotTemplate::new(time(start), time(end))
}

pub(super) fn new_panel() -> NewPanel {
    NewPanel {
        name: "Platform Engineering".to_string(),
        description: "Backend and infrastructure interviews".to_string(),
        members: vec![UserRef("user-ana".to_string()), UserRef("user-raj".to_string())],
        timezone: None,
    }
}

pub(super) fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(at(2024, 6, 1, 8, 0)))
}

pub(super) fn build_store() -> (Arc<SlotStore<InMemoryPanelRepository>>, Panel) {
    let store = Arc::new(SlotStore::new(
        Arc::new(InMemoryPanelRepository::default()),
        clock(),
    ));
    let panel = store.create_panel(new_panel()).expect("panel created");
    (store, panel)
}

pub(super) struct UnavailableRepository;

impl PanelRepository for UnavailableRepository {
    fn insert(&self, _panel: Panel) -> Result<Panel, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _panel: Panel) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &PanelId) -> Result<Option<Panel>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Panel>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &PanelId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
