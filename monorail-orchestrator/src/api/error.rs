//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use monorail_core::PipelineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => {
                tracing::warn!("Permission denied: {}", msg);
                (StatusCode::FORBIDDEN, msg)
            }
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PipelineError::Configuration(_) => ApiError::BadRequest(err.to_string()),
            PipelineError::PermissionDenied { .. } => ApiError::Forbidden(err.to_string()),
            PipelineError::QueueFull(_) => ApiError::Unavailable(err.to_string()),
            PipelineError::StageFailure { .. }
            | PipelineError::Collaborator(_)
            | PipelineError::QueueClosed(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_status() {
        let cases = [
            (PipelineError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (
                PipelineError::Configuration("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::PermissionDenied {
                    action: "function:Create".to_string(),
                    resource: "function:foo/*".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                PipelineError::QueueFull("foo".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PipelineError::QueueClosed("foo".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
