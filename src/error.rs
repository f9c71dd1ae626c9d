use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Application error type
///
/// Every failure that reaches the HTTP boundary is one of these variants.
/// Status codes are chosen by matching on the variant (and on the tagged
/// store/auth error inside it), never by inspecting message text.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Client Errors =====
    #[error("Validation error: {0}")]
    Validation(String),

    // ===== Storage Errors =====
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // ===== Authentication Errors =====
    /// Header missing or not a bearer credential
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Token error: {0}")]
    Auth(#[from] AuthError),

    // ===== Admission Control =====
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    // ===== Internal Server Errors =====
    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Cancelled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Request validation failed".to_string(),
            AppError::Store(StoreError::InvalidId(_)) => "Invalid message ID".to_string(),
            AppError::Store(StoreError::NotFound) => "Message not found".to_string(),
            AppError::Store(StoreError::Cancelled(_)) => {
                "Storage operation timed out".to_string()
            }
            AppError::Store(_) => "Storage error".to_string(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Auth(_) => "Invalid or expired token".to_string(),
            AppError::RateLimited { .. } => {
                "Too many requests, please try again later".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Store(StoreError::InvalidId(_)) => "INVALID_ID",
            AppError::Store(StoreError::NotFound) => "NOT_FOUND",
            AppError::Store(StoreError::Cancelled(_)) => "STORE_TIMEOUT",
            AppError::Store(_) => "STORE_ERROR",
            AppError::Unauthorized(_) | AppError::Auth(_) => "AUTH_ERROR",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Optional detail for the caller. Server faults never carry backend text.
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::Validation(msg) => Some(msg.clone()),
            AppError::Store(StoreError::InvalidId(id)) => {
                Some(format!("'{}' is not a valid message identifier", id))
            }
            AppError::Store(StoreError::Cancelled(after)) => {
                Some(format!("operation exceeded {} ms", after.as_millis()))
            }
            AppError::Auth(e) => Some(e.to_string()),
            AppError::RateLimited { retry_after } => Some(format!(
                "retry after {} second(s)",
                retry_after_secs(*retry_after)
            )),
            _ => None,
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Authentication failed"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let mut body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }

        let mut response = (status, axum::Json(body)).into_response();

        if let AppError::RateLimited { retry_after } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs(*retry_after).to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Whole seconds for `Retry-After`, rounded up and never zero.
fn retry_after_secs(after: Duration) -> u64 {
    let secs = after.as_secs() + u64::from(after.subsec_nanos() > 0);
    secs.max(1)
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create an authentication error for a missing or malformed header
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }
}
