use crate::config::ConfigError;
use crate::panels::domain::{PanelId, SlotId};
use crate::telemetry::TelemetryError;
use crate::workflows::domain::{Stage, WorkflowId};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Pipeline(PipelineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Pipeline(err) => write!(f, "pipeline error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pipeline(err) => err.into_response(),
            other => {
                let body = Json(json!({ "error": other.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

/// Typed failure returned by every slot store, expander, and pipeline operation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("workflow '{workflow_id}' cannot {action}: {reason}")]
    StateConflict {
        workflow_id: WorkflowId,
        action: &'static str,
        reason: ConflictReason,
    },
    #[error("slot '{slot_id}' on {date} for panel '{panel_id}' is already booked")]
    SlotConflict {
        panel_id: PanelId,
        date: NaiveDate,
        slot_id: SlotId,
    },
    #[error("storage operation failed")]
    Persistence,
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::StateConflict { .. } | PipelineError::SlotConflict { .. } => {
                StatusCode::CONFLICT
            }
            PipelineError::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            PipelineError::Validation { field, message } => json!({
                "error": self.to_string(),
                "field": field,
                "message": message,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for PipelineError {
    fn from(value: RepositoryError) -> Self {
        tracing::error!(error = %value, "repository operation failed");
        Self::Persistence
    }
}

/// Why a workflow action was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    StageMismatch { stage: Stage },
    Terminal { stage: Stage },
    ConcurrentUpdate,
}

impl ConflictReason {
    /// Refusal for an action attempted while the workflow sits in `stage`.
    pub fn refused_in(stage: Stage) -> Self {
        if stage.is_terminal() {
            Self::Terminal { stage }
        } else {
            Self::StageMismatch { stage }
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::StageMismatch { stage } => {
                write!(f, "not permitted in stage '{}'", stage.label())
            }
            ConflictReason::Terminal { stage } => {
                write!(f, "stage '{}' is terminal", stage.label())
            }
            ConflictReason::ConcurrentUpdate => write!(f, "workflow was modified concurrently"),
        }
    }
}

/// Storage failure reported by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was modified concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
