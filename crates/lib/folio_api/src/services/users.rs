//! User profile and administration service.

use folio_core::auth::password;
use folio_core::models::{NewUser, ProfileUpdate, Status, User};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UpdateProfileRequest, UserProfile};

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn profile(state: &AppState, user: &User) -> AppResult<UserProfile> {
    Ok(UserProfile::from_user(user, &state.cipher)?)
}

/// Apply a partial profile update. Changing the email or mobile clears the
/// matching verification flag.
pub async fn update_profile(
    state: &AppState,
    user: &User,
    req: UpdateProfileRequest,
) -> AppResult<UserProfile> {
    let update = ProfileUpdate {
        name: non_blank(req.name),
        email: non_blank(req.email),
        mobile: non_blank(req.mobile),
        country_code: non_blank(req.country_code),
    };
    let updated = state
        .store
        .update_profile(user.id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!(user_id = user.id, "profile updated");
    profile(state, &updated)
}

/// Change another user's status by encrypted id.
///
/// Admins cannot deactivate themselves. Suspending or deleting a user also
/// revokes their refresh token.
pub async fn set_status(
    state: &AppState,
    actor: &User,
    encrypted_id: &str,
    status: Status,
) -> AppResult<UserProfile> {
    let user_id = state.cipher.decrypt_numeric_id(encrypted_id)?;
    if user_id == actor.id && status != Status::Active {
        return Err(AppError::Validation(
            "You cannot deactivate your own account".into(),
        ));
    }

    if !state.store.set_status(user_id, status).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    if status != Status::Active {
        state.store.clear_refresh_token(user_id).await?;
    }

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!(actor_id = actor.id, user_id, %status, "user status changed");
    profile(state, &user)
}

/// Create an account with a freshly salted password.
pub async fn create_user(
    state: &AppState,
    actor: &User,
    req: CreateUserRequest,
) -> AppResult<UserProfile> {
    let username = req.username.trim().to_string();
    let name = req.name.trim().to_string();
    if username.is_empty() || name.is_empty() {
        return Err(AppError::Validation("Name and username are required".into()));
    }
    let (hash, salt) = password::new_password_hash(&req.password)?;

    let user = state
        .store
        .create_user(
            NewUser {
                name,
                email: non_blank(req.email),
                mobile: non_blank(req.mobile),
                country_code: non_blank(req.country_code),
                username,
                user_type: req.user_type,
            },
            &hash,
            &salt,
        )
        .await?;
    info!(actor_id = actor.id, user_id = user.id, role = %user.user_type, "user created");
    profile(state, &user)
}
