//! Process-local repositories used by the API service, the demo, and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::RepositoryError;
use crate::panels::domain::{Panel, PanelId};
use crate::panels::repository::PanelRepository;
use crate::workflows::domain::{Workflow, WorkflowId};
use crate::workflows::repository::WorkflowRepository;

#[derive(Default, Clone)]
pub struct InMemoryPanelRepository {
    panels: Arc<Mutex<HashMap<PanelId, Panel>>>,
}

impl PanelRepository for InMemoryPanelRepository {
    fn insert(&self, panel: Panel) -> Result<Panel, RepositoryError> {
        let mut guard = self.panels.lock().expect("panel repository mutex poisoned");
        if guard.contains_key(&panel.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(panel.id.clone(), panel.clone());
        Ok(panel)
    }

    fn update(&self, panel: Panel) -> Result<(), RepositoryError> {
        let mut guard = self.panels.lock().expect("panel repository mutex poisoned");
        match guard.get_mut(&panel.id) {
            Some(slot) => {
                *slot = panel;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &PanelId) -> Result<Option<Panel>, RepositoryError> {
        let guard = self.panels.lock().expect("panel repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Panel>, RepositoryError> {
        let guard = self.panels.lock().expect("panel repository mutex poisoned");
        let mut panels: Vec<Panel> = guard.values().cloned().collect();
        panels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(panels)
    }

    fn delete(&self, id: &PanelId) -> Result<(), RepositoryError> {
        let mut guard = self.panels.lock().expect("panel repository mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<Mutex<HashMap<WorkflowId, Workflow>>>,
}

impl WorkflowRepository for InMemoryWorkflowRepository {
    fn insert(&self, workflow: Workflow) -> Result<Workflow, RepositoryError> {
        let mut guard = self
            .workflows
            .lock()
            .expect("workflow repository mutex poisoned");
        if guard.contains_key(&workflow.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(workflow.id.clone(), workflow.clone());
        Ok(workflow)
    }

    fn replace(&self, workflow: Workflow, expected_version: u64) -> Result<(), RepositoryError> {
        let mut guard = self
            .workflows
            .lock()
            .expect("workflow repository mutex poisoned");
        match guard.get_mut(&workflow.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = workflow;
                Ok(())
            }
            Some(_) => Err(RepositoryError::Conflict),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        let guard = self
            .workflows
            .lock()
            .expect("workflow repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Workflow>, RepositoryError> {
        let guard = self
            .workflows
            .lock()
            .expect("workflow repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}
