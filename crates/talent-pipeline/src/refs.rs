//! Opaque references to records owned by collaborators outside the pipeline core.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Identifier of a user (interviewer, reviewer, recruiter) managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRef(pub String);

impl UserRef {
    pub fn system() -> Self {
        Self("system".to_string())
    }
}

/// Identifier of the candidate application that was promoted into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationRef(pub String);

/// Identifier of the hiring campaign the application belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignRef(pub String);

/// Handle to an uploaded document. The pipeline stores it verbatim and never reads the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
}

impl FileHandle {
    pub fn validate(&self, field: &'static str) -> Result<(), PipelineError> {
        if self.filename.trim().is_empty() {
            return Err(PipelineError::validation(field, "filename is required"));
        }
        if self.storage_path.trim().is_empty() {
            return Err(PipelineError::validation(field, "storage path is required"));
        }
        self.mime_type
            .parse::<mime::Mime>()
            .map_err(|err| PipelineError::validation(field, format!("invalid mime type: {err}")))?;
        Ok(())
    }
}
