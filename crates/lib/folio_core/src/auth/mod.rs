//! Authentication and credential logic.
//!
//! Provides password hashing and JWT issuance/validation shared by the API
//! layer and operator tooling.

pub mod jwt;
pub mod password;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
