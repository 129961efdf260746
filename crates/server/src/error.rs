//! HTTP error type: every failure leaves the service as `{"error": "..."}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::pipeline::PipelineError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Chunk(e) => Self::bad_request(e.to_string()),
            PipelineError::Llm { provider, source } => {
                error!(provider = %provider, "completion failed: {}", source);
                Self::internal(format!("Failed to generate response from {provider}"))
            }
            PipelineError::LlmNotConfigured => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "LLM provider not configured")
            }
            PipelineError::Embedding(e) => Self::internal(format!("Embedding failed: {e}")),
            PipelineError::Storage(e) => Self::internal(format!("Failed to store chunk: {e}")),
            PipelineError::Index(e) => Self::internal(format!("Failed to index chunk: {e}")),
        }
    }
}
