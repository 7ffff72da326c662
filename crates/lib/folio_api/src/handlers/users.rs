//! Profile and user administration handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChangePasswordRequest, CreateUserRequest, UpdateProfileRequest, UpdateStatusRequest,
    UserProfile,
};
use crate::services::{auth, users};

/// `GET /users/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(users::profile(&state, &caller.user)?))
}

/// `PATCH /users/me`
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(users::update_profile(&state, &caller.user, body).await?))
}

/// `POST /users/me/password`
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    auth::change_password(
        &state,
        &caller.user,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/users`: SupAdmin only.
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = users::create_user(&state, &caller.user, body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `PATCH /admin/users/{id}/status`: SupAdmin only. `id` is encrypted.
pub async fn set_status_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(
        users::set_status(&state, &caller.user, &id, body.status).await?,
    ))
}
