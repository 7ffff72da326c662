//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, RefreshRequest, ResetPasswordRequest, TokenResponse,
};
use crate::services::auth;

/// `POST /auth/login`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::login(&state, &body).await?))
}

/// `POST /auth/refresh`: exchange the current token pair for a new one.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::refresh(&state, &body).await?))
}

/// `POST /auth/logout`: revoke the caller's refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> AppResult<StatusCode> {
    auth::logout(&state, &caller.user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /auth/forgot-password`: always 202 unless delivery fails.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> AppResult<StatusCode> {
    auth::forgot_password(&state, &body.username).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `POST /auth/reset-password`: set a new password with a reset token.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    auth::reset_password(&state, &body.token, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}
