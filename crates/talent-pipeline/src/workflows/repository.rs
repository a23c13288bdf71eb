use super::domain::{Workflow, WorkflowId};
pub use crate::error::RepositoryError;

/// Storage abstraction for workflows.
pub trait WorkflowRepository: Send + Sync {
    fn insert(&self, workflow: Workflow) -> Result<Workflow, RepositoryError>;
    /// Conditional write: succeeds only while the stored version equals `expected_version`,
    /// otherwise fails with [`RepositoryError::Conflict`].
    fn replace(&self, workflow: Workflow, expected_version: u64) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError>;
    fn list(&self) -> Result<Vec<Workflow>, RepositoryError>;
}
