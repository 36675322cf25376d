//! Error types for wayfare-planner
//!
//! [`PipelineError`] is returned by every orchestrator operation. [`ApiError`]
//! is its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::providers::ProviderError;

/// Failure of a pipeline operation
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed call contract (bad day index, invalid IATA code, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Travel group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Member {user_id} not found in group {group_id}")]
    MemberNotFound { group_id: Uuid, user_id: String },

    /// Operation needs state the group does not have yet
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Text generation returned unusable content
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderError),

    /// Concurrent write won the race
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] wayfare_common::Error),
}

impl PipelineError {
    /// Errors caused by the service or its collaborators rather than the caller
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            PipelineError::Generation(_) | PipelineError::Provider(_) | PipelineError::Persistence(_)
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Group state does not allow the operation yet (422)
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Upstream collaborator failed (502)
    #[error("Upstream failure: {message}")]
    BadGateway { code: &'static str, message: String },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::InvalidInput(msg) => ApiError::BadRequest(msg),
            PipelineError::GroupNotFound(_) | PipelineError::MemberNotFound { .. } => {
                ApiError::NotFound(message)
            }
            PipelineError::NotReady(msg) => ApiError::NotReady(msg),
            PipelineError::Conflict(msg) => ApiError::Conflict(msg),
            PipelineError::Generation(msg) => ApiError::BadGateway {
                code: "GENERATION_FAILED",
                message: msg,
            },
            PipelineError::Provider(e) => ApiError::BadGateway {
                code: "PROVIDER_ERROR",
                message: e.to_string(),
            },
            PipelineError::Persistence(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::NotReady(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "NOT_READY", msg),
            ApiError::BadGateway { code, message } => (StatusCode::BAD_GATEWAY, code, message),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
