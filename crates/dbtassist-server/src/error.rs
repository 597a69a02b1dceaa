//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dbtassist_ai::GenerationError;
use dbtassist_project::ProjectError;
use dbtassist_prompt::PromptError;
use dbtassist_warehouse::PreviewError;
use serde_json::json;

/// A failed request, rendered as `{"detail": "..."}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn missing_param(name: &str) -> Self {
        Self::BadRequest(format!("Missing query parameter '{}'", name))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), detail = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), detail = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::Unavailable => Self::Unavailable(error.to_string()),
            GenerationError::InvalidRequest(_) => Self::BadRequest(error.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(error: ProjectError) -> Self {
        match error {
            ProjectError::InvalidModelName(_) => Self::BadRequest(error.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PreviewError> for ApiError {
    fn from(error: PreviewError) -> Self {
        match error {
            PreviewError::InvalidRelation(_) => Self::BadRequest(error.to_string()),
            PreviewError::RelationNotFound(_) => Self::NotFound(error.to_string()),
            PreviewError::ConfigError(_) | PreviewError::ConnectionError(_) => Self::Unavailable(error.to_string()),
            PreviewError::QueryError(_) => Self::Internal(error.to_string()),
        }
    }
}

/// Errors that stop the server from starting
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to bind {0}: {1}")]
    Bind(String, String),

    #[error("Server error: {0}")]
    Serve(String),
}
