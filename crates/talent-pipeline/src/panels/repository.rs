use super::domain::{Panel, PanelId};
pub use crate::error::RepositoryError;

/// Storage abstraction for panels; the slot store serialises writers per panel on top of it.
pub trait PanelRepository: Send + Sync {
    fn insert(&self, panel: Panel) -> Result<Panel, RepositoryError>;
    fn update(&self, panel: Panel) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &PanelId) -> Result<Option<Panel>, RepositoryError>;
    fn list(&self) -> Result<Vec<Panel>, RepositoryError>;
    fn delete(&self, id: &PanelId) -> Result<(), RepositoryError>;
}
