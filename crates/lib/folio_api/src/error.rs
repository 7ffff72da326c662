//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use folio_core::auth::AuthError;
use folio_core::cipher::CipherError;
use folio_core::notify::NotificationError;
use folio_core::store::StoreError;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Every authentication failure collapses to this, with no body, so
    /// callers cannot tell which check failed.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "Forbidden"),
            AppError::NotificationFailed(m) => {
                warn!(error = %m, "notification delivery failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "notification_failed",
                    "Notification could not be delivered",
                )
            }
            AppError::Unavailable(m) => {
                error!(error = %m, "store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "Service temporarily unavailable",
                )
            }
            AppError::Internal(m) => {
                error!(error = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(
                ref db @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => AppError::Unavailable(db.to_string()),
            StoreError::Database(db) => AppError::Internal(db.to_string()),
            StoreError::Corrupt(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError | AuthError::TokenError(_) => AppError::Unauthorized,
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CipherError> for AppError {
    fn from(_: CipherError) -> Self {
        AppError::Validation("Invalid identifier".into())
    }
}

impl From<NotificationError> for AppError {
    fn from(e: NotificationError) -> Self {
        AppError::NotificationFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unauthorized_has_no_body() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn store_failures_are_server_errors() {
        let resp = AppError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let resp = AppError::from(StoreError::Corrupt("bad row".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn cipher_failures_do_not_leak_detail() {
        match AppError::from(CipherError::Decrypt) {
            AppError::Validation(msg) => assert_eq!(msg, "Invalid identifier"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn notification_failure_is_bad_gateway() {
        let resp = AppError::from(NotificationError::NoChannel(1)).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
