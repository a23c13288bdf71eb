//! Request extractors that report malformed input as field-level validation errors.

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::PipelineError;

/// JSON request body; deserialisation failures become `PipelineError::Validation`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// Query string parameters; deserialisation failures become `PipelineError::Validation`.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> PipelineError {
    let detail = rejection.body_text();
    debug!(%detail, "json body rejected");
    let field = field_path(&detail).unwrap_or("body").to_string();
    PipelineError::validation(field, detail)
}

fn query_rejection(rejection: QueryRejection) -> PipelineError {
    let detail = rejection.body_text();
    debug!(%detail, "query string rejected");
    let field = field_path(&detail).unwrap_or("query").to_string();
    PipelineError::validation(field, detail)
}

/// Pulls the `a[0].b` path out of "<context>: <path>: <cause>" rejection text.
fn field_path(detail: &str) -> Option<&str> {
    let (_, rest) = detail.split_once(": ")?;
    let (path, _) = rest.split_once(": ")?;
    let plain = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    plain.then_some(path)
}
