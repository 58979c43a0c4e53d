//! HTTP response types and utilities
//!
//! Every JSON endpoint answers with the same [`ApiResponse`] envelope, and
//! every [`AppError`] maps to exactly one status code here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::{AppError, AppResult};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Status code for each error kind
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Busy => StatusCode::CONFLICT,
        AppError::NoSources { .. } | AppError::NoOutputs => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Repository(_)
        | AppError::Source(_)
        | AppError::Persistence(_)
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Helper function to convert AppResult to HTTP response
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => ok(data),
        Err(error) => handle_error(error),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let status = status_for(&error);
    let message = match &error {
        AppError::Validation { message } => message.clone(),
        AppError::NotFound { resource, id } => format!("{} with id '{}' not found", resource, id),
        AppError::Repository(_) => {
            error!("Configuration store failure: {}", error);
            "Configuration store operation failed".to_string()
        }
        _ => error.to_string(),
    };

    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            status_for(&AppError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::not_found("source", Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&AppError::Busy), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&AppError::NoOutputs),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&AppError::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_success_envelope_omits_error() {
        let body = serde_json::to_value(ApiResponse::success(3)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 3);
        assert!(body.get("error").is_none());
    }
}
