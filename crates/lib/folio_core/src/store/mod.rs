//! User and credential persistence.
//!
//! [`UserStore`] is the narrow interface the authorization filter and the
//! auth flows depend on. [`PgUserStore`] backs it with PostgreSQL;
//! [`MemoryUserStore`] keeps everything in process for tests and local runs.
//!
//! Refresh-token rotation and reset-session consumption are conditional
//! updates in every implementation, so two concurrent callers presenting the
//! same secret cannot both succeed.

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Credential, NewUser, ProfileUpdate, ResetSession, Status, User};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// User and credential lookups and mutations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Fetch a user by numeric id.
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Fetch a user by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Create an active user together with its credential record.
    async fn create_user(
        &self,
        user: NewUser,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User, StoreError>;

    /// Fetch the credential record for a user.
    async fn find_credential(&self, user_id: i64) -> Result<Option<Credential>, StoreError>;

    /// Replace the password hash and salt.
    async fn set_password(
        &self,
        user_id: i64,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<(), StoreError>;

    /// Unconditionally store a new refresh token hash (login).
    async fn set_refresh_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Replace the refresh token only if the stored hash still equals
    /// `expected_hash` and has not expired at `now`. Returns whether the
    /// swap happened.
    async fn rotate_refresh_token(
        &self,
        user_id: i64,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Remove any stored refresh token.
    async fn clear_refresh_token(&self, user_id: i64) -> Result<(), StoreError>;

    /// Change account status. Returns `false` if the user does not exist.
    async fn set_status(&self, user_id: i64, status: Status) -> Result<bool, StoreError>;

    /// Apply a partial profile update, returning the updated user.
    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError>;

    /// Persist a password-reset session.
    async fn create_reset_session(&self, session: ResetSession) -> Result<(), StoreError>;

    /// Consume a reset session. Succeeds at most once per session and never
    /// for an expired one.
    async fn consume_reset_session(
        &self,
        username: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
