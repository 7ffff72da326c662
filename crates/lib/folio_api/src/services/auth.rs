//! Authentication service: login, refresh, logout and password flows.

use chrono::{Duration, Utc};
use folio_core::auth::jwt::{AccessGrant, IssuedAccessToken, IssuedRefreshToken, hash_refresh_token};
use folio_core::auth::password::{self, PasswordCheck};
use folio_core::models::{ResetSession, User};
use folio_core::notify::notify_user;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, RefreshRequest, TokenResponse, UserProfile};

/// Length of the random key bound into a password-reset session.
const RESET_KEY_LEN: usize = 32;

const RESET_SUBJECT: &str = "Reset your Folio password";

fn generate_reset_key() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_KEY_LEN)
        .map(char::from)
        .collect()
}

fn grant_for(user: &User, remember_me: bool) -> AccessGrant<'_> {
    AccessGrant {
        user_id: user.id,
        role: user.user_type.label(),
        email_verified: user.email_verified,
        mobile_verified: user.mobile_verified,
        remember_me,
    }
}

fn token_response(
    state: &AppState,
    user: &User,
    access: IssuedAccessToken,
    refresh: IssuedRefreshToken,
) -> AppResult<TokenResponse> {
    Ok(TokenResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        expires_in: access.expires_in,
        token_type: "Bearer".into(),
        refresh_expires_at: refresh.expires_at.to_rfc3339(),
        user: UserProfile::from_user(user, &state.cipher)?,
    })
}

// ---------------------------------------------------------------------------
// Session flows
// ---------------------------------------------------------------------------

/// Verify credentials and open a session.
///
/// Unknown user, wrong password and inactive account all yield the same
/// bare 401, and each costs one password derivation.
pub async fn login(state: &AppState, req: &LoginRequest) -> AppResult<TokenResponse> {
    let Some(user) = state.store.find_user_by_username(&req.username).await? else {
        debug!("login for unknown username");
        password::hash_dummy(&req.password);
        return Err(AppError::Unauthorized);
    };
    let Some(credential) = state.store.find_credential(user.id).await? else {
        warn!(user_id = user.id, "user has no credential record");
        password::hash_dummy(&req.password);
        return Err(AppError::Unauthorized);
    };

    let check = password::check_password(
        &req.password,
        &credential,
        state.config.secrets.legacy_password_salt.as_deref(),
    )?;
    if check == PasswordCheck::Mismatch {
        debug!(user_id = user.id, "password mismatch");
        return Err(AppError::Unauthorized);
    }
    if !user.is_active() {
        debug!(user_id = user.id, status = %user.status, "login for inactive user");
        return Err(AppError::Unauthorized);
    }

    if check == PasswordCheck::MatchNeedsRehash {
        let salt = password::generate_salt();
        let hash = password::hash_password(&req.password, &salt)?;
        state.store.set_password(user.id, &hash, &salt).await?;
        info!(user_id = user.id, "migrated legacy password hash");
    }

    let access = state
        .tokens
        .issue_access_token(&grant_for(&user, req.remember_me))?;
    let refresh = state.tokens.issue_refresh_token();
    state
        .store
        .set_refresh_token(user.id, &hash_refresh_token(&refresh.token), refresh.expires_at)
        .await?;

    info!(user_id = user.id, remember_me = req.remember_me, "user logged in");
    token_response(state, &user, access, refresh)
}

/// Exchange an (possibly expired) access token plus the current refresh
/// token for a new pair. The refresh token rotates atomically: of two
/// concurrent exchanges with the same token, exactly one succeeds.
pub async fn refresh(state: &AppState, req: &RefreshRequest) -> AppResult<TokenResponse> {
    let claims = state
        .tokens
        .claims_ignoring_expiry(&req.access_token)
        .ok_or(AppError::Unauthorized)?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .filter(User::is_active)
        .ok_or(AppError::Unauthorized)?;

    let refresh = state.tokens.issue_refresh_token();
    let rotated = state
        .store
        .rotate_refresh_token(
            user.id,
            &hash_refresh_token(&req.refresh_token),
            &hash_refresh_token(&refresh.token),
            refresh.expires_at,
            Utc::now(),
        )
        .await?;
    if !rotated {
        warn!(user_id, "refresh token rejected");
        return Err(AppError::Unauthorized);
    }

    let access = state
        .tokens
        .issue_access_token(&grant_for(&user, claims.remember_me))?;
    debug!(user_id, "session refreshed");
    token_response(state, &user, access, refresh)
}

/// Drop the caller's refresh token. Outstanding access tokens run out on
/// their own.
pub async fn logout(state: &AppState, user: &User) -> AppResult<()> {
    state.store.clear_refresh_token(user.id).await?;
    info!(user_id = user.id, "user logged out");
    Ok(())
}

// ---------------------------------------------------------------------------
// Password flows
// ---------------------------------------------------------------------------

/// Start a password reset. Unknown or inactive usernames are accepted
/// silently. For a real user a single-use session is stored and a link is
/// sent through the user's preferred channel.
pub async fn forgot_password(state: &AppState, username: &str) -> AppResult<()> {
    let Some(user) = state
        .store
        .find_user_by_username(username)
        .await?
        .filter(User::is_active)
    else {
        debug!("password reset requested for unknown or inactive user");
        return Ok(());
    };

    let key = generate_reset_key();
    state
        .store
        .create_reset_session(ResetSession {
            username: user.username.clone(),
            key: key.clone(),
            expires_at: Utc::now() + Duration::minutes(state.config.reset_session_ttl_minutes),
        })
        .await?;

    let token = state.tokens.issue_password_reset_token(&user.username, &key)?;
    let link = format!(
        "{}/reset-password?token={token}",
        state.config.public_base_url.trim_end_matches('/')
    );
    let body = format!(
        "A password reset was requested for {}. Open {link} within {} minutes to choose a new password.",
        user.username, state.config.reset_session_ttl_minutes
    );
    notify_user(state.notifier.as_ref(), &user, RESET_SUBJECT, &body).await?;

    info!(user_id = user.id, "password reset link sent");
    Ok(())
}

/// Complete a password reset. The session is consumed before the password
/// changes, so a token works at most once.
pub async fn reset_password(state: &AppState, token: &str, new_password: &str) -> AppResult<()> {
    let claims = state
        .tokens
        .validate_reset_token(token)
        .ok_or(AppError::Unauthorized)?;
    password::validate_new_password(new_password)?;

    let consumed = state
        .store
        .consume_reset_session(&claims.username, &claims.key, Utc::now())
        .await?;
    if !consumed {
        debug!("reset session missing, used or expired");
        return Err(AppError::Unauthorized);
    }

    let user = state
        .store
        .find_user_by_username(&claims.username)
        .await?
        .filter(User::is_active)
        .ok_or(AppError::Unauthorized)?;

    let (hash, salt) = password::new_password_hash(new_password)?;
    state.store.set_password(user.id, &hash, &salt).await?;
    state.store.clear_refresh_token(user.id).await?;

    info!(user_id = user.id, "password reset completed");
    Ok(())
}

/// Change the caller's password after re-checking the current one. Other
/// sessions lose their refresh token.
pub async fn change_password(
    state: &AppState,
    user: &User,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let credential = state
        .store
        .find_credential(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let check = password::check_password(
        current_password,
        &credential,
        state.config.secrets.legacy_password_salt.as_deref(),
    )?;
    if check == PasswordCheck::Mismatch {
        debug!(user_id = user.id, "current password mismatch");
        return Err(AppError::Unauthorized);
    }

    let (hash, salt) = password::new_password_hash(new_password)?;
    state.store.set_password(user.id, &hash, &salt).await?;
    state.store.clear_refresh_token(user.id).await?;

    info!(user_id = user.id, "password changed");
    Ok(())
}
