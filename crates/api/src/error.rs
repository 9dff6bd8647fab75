//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use corebank_db::StoreError;
use corebank_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// Handler error rendered as `{ "error": code, "message": text }`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// The wrapped application error.
    #[must_use]
    pub const fn inner(&self) -> &AppError {
        &self.0
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let app = match err {
            StoreError::Validation(msg) => AppError::Validation(msg),
            StoreError::Verification(e) => AppError::BusinessRule(e.to_string()),
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Transient(e) => AppError::Unavailable(e.to_string()),
            StoreError::Cancelled => AppError::Unavailable("request timed out".to_string()),
            StoreError::Enqueue(msg) => AppError::Internal(msg),
            StoreError::Database(e) => AppError::Database(e.to_string()),
        };
        Self(app)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.0.is_client_error() {
            warn!(error = %self.0, "request rejected");
            self.0.to_string()
        } else {
            error!(error = %self.0, "request failed");
            match &self.0 {
                AppError::Unavailable(_) => "Service temporarily unavailable, retry later".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code().to_ascii_lowercase(),
                "message": message
            })),
        )
            .into_response()
    }
}
