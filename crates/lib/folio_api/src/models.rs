//! Wire models for the HTTP API (camelCase JSON).

use folio_core::cipher::{CipherError, IdCipher};
use folio_core::models::{Status, User, UserType};
use serde::{Deserialize, Serialize};

/// Error body for non-401 failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store_connected: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Status,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
    pub user_type: UserType,
}

/// Public view of a user. `id` is the obfuscated identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
    pub role: UserType,
    pub status: Status,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub verified: bool,
}

impl UserProfile {
    pub fn from_user(user: &User, cipher: &IdCipher) -> Result<Self, CipherError> {
        Ok(Self {
            id: cipher.encrypt_numeric_id(user.id)?,
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            country_code: user.country_code.clone(),
            role: user.user_type,
            status: user.status,
            email_verified: user.email_verified,
            mobile_verified: user.mobile_verified,
            verified: user.verified,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
    /// RFC 3339 expiry of the refresh token.
    pub refresh_expires_at: String,
    pub user: UserProfile,
}
