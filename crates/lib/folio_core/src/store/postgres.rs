//! PostgreSQL-backed [`UserStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{StoreError, UserStore};
use crate::models::{Credential, NewUser, ProfileUpdate, ResetSession, Status, User};

const USER_COLUMNS: &str = "id, name, email, mobile, country_code, username, status, user_type, \
     email_verified, mobile_verified, verified";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: Option<String>,
    mobile: Option<String>,
    country_code: Option<String>,
    username: String,
    status: String,
    user_type: String,
    email_verified: bool,
    mobile_verified: bool,
    verified: bool,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            country_code: row.country_code,
            username: row.username,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("user {}: {e}", row.id)))?,
            user_type: row
                .user_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("user {}: {e}", row.id)))?,
            email_verified: row.email_verified,
            mobile_verified: row.mobile_verified,
            verified: row.verified,
        })
    }
}

type CredentialRow = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<DateTime<Utc>>,
);

/// Store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(
        &self,
        user: NewUser,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, mobile, country_code, username, status, user_type) \
             VALUES ($1, $2, $3, $4, $5, 'active', $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.country_code)
        .bind(&user.username)
        .bind(user.user_type.label())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                StoreError::Conflict(format!("username '{}' is taken", user.username))
            } else {
                StoreError::Database(e)
            }
        })?;

        sqlx::query(
            "INSERT INTO credentials (user_id, password_hash, password_salt) VALUES ($1, $2, $3)",
        )
        .bind(row.id)
        .bind(password_hash)
        .bind(password_salt)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        User::try_from(row)
    }

    async fn find_credential(&self, user_id: i64) -> Result<Option<Credential>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, password_hash, password_salt, refresh_token_hash, refresh_expires_at \
             FROM credentials WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(user_id, password_hash, password_salt, refresh_token_hash, refresh_expires_at)| {
                Credential {
                    user_id,
                    password_hash,
                    password_salt,
                    refresh_token_hash,
                    refresh_expires_at,
                }
            },
        ))
    }

    async fn set_password(
        &self,
        user_id: i64,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE credentials SET password_hash = $2, password_salt = $3, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(password_salt)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE credentials \
             SET refresh_token_hash = $2, refresh_expires_at = $3, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: i64,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE credentials \
             SET refresh_token_hash = $3, refresh_expires_at = $4, updated_at = now() \
             WHERE user_id = $1 \
               AND refresh_token_hash = $2 \
               AND refresh_expires_at > $5",
        )
        .bind(user_id)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(new_expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE credentials \
             SET refresh_token_hash = NULL, refresh_expires_at = NULL, updated_at = now() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, user_id: i64, status: Status) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET status = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        // Right-hand sides see the pre-update row, so the verification
        // resets compare against the old email/mobile.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               email_verified = email_verified AND ($3::text IS NULL OR $3 IS NOT DISTINCT FROM email), \
               mobile_verified = mobile_verified AND ($4::text IS NULL OR $4 IS NOT DISTINCT FROM mobile), \
               verified = (email_verified AND ($3::text IS NULL OR $3 IS NOT DISTINCT FROM email)) \
                       OR (mobile_verified AND ($4::text IS NULL OR $4 IS NOT DISTINCT FROM mobile)), \
               email = COALESCE($3, email), \
               mobile = COALESCE($4, mobile), \
               country_code = COALESCE($5, country_code), \
               updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.name)
        .bind(update.email)
        .bind(update.mobile)
        .bind(update.country_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_reset_session(&self, session: ResetSession) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM password_reset_sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "INSERT INTO password_reset_sessions (username, reset_key, expires_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(&session.username)
        .bind(&session.key)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset_session(
        &self,
        username: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM password_reset_sessions \
             WHERE username = $1 AND reset_key = $2 AND expires_at > $3",
        )
        .bind(username)
        .bind(key)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
