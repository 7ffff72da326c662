//! In-process [`UserStore`] backed by concurrent maps.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{StoreError, UserStore};
use crate::models::{Credential, NewUser, ProfileUpdate, ResetSession, Status, User};

/// Map-backed store. Per-entry locks make the conditional updates atomic.
#[derive(Debug)]
pub struct MemoryUserStore {
    next_id: AtomicI64,
    users: DashMap<i64, User>,
    usernames: DashMap<String, i64>,
    credentials: DashMap<i64, Credential>,
    reset_sessions: DashMap<(String, String), DateTime<Utc>>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            users: DashMap::new(),
            usernames: DashMap::new(),
            credentials: DashMap::new(),
            reset_sessions: DashMap::new(),
        }
    }

    /// Insert a credential record as-is (e.g. a legacy unsalted one).
    pub fn put_credential(&self, credential: Credential) {
        self.credentials.insert(credential.user_id, credential);
    }

    /// Overwrite the stored verification flags for a user.
    pub fn set_verification(&self, user_id: i64, email: bool, mobile: bool) {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.email_verified = email;
            user.mobile_verified = mobile;
            user.verified = email || mobile;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let id = match self.usernames.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.find_user(id).await
    }

    async fn create_user(
        &self,
        user: NewUser,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User, StoreError> {
        let id = match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "username '{}' is taken",
                    user.username
                )));
            }
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(id);
                id
            }
        };

        let created = User {
            id,
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            country_code: user.country_code,
            username: user.username,
            status: Status::Active,
            user_type: user.user_type,
            email_verified: false,
            mobile_verified: false,
            verified: false,
        };
        self.users.insert(id, created.clone());
        self.credentials.insert(
            id,
            Credential {
                user_id: id,
                password_hash: password_hash.to_string(),
                password_salt: Some(password_salt.to_string()),
                refresh_token_hash: None,
                refresh_expires_at: None,
            },
        );
        Ok(created)
    }

    async fn find_credential(&self, user_id: i64) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.get(&user_id).map(|c| c.value().clone()))
    }

    async fn set_password(
        &self,
        user_id: i64,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<(), StoreError> {
        if let Some(mut cred) = self.credentials.get_mut(&user_id) {
            cred.password_hash = password_hash.to_string();
            cred.password_salt = Some(password_salt.to_string());
        }
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(mut cred) = self.credentials.get_mut(&user_id) {
            cred.refresh_token_hash = Some(token_hash.to_string());
            cred.refresh_expires_at = Some(expires_at);
        }
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
        let Some(mut cred) = self.credentials.get_mut(&user_id) else {
            return Ok(false);
        };
        let matches = cred.refresh_token_hash.as_deref() == Some(expected_hash)
            && cred.refresh_expires_at.is_some_and(|exp| exp > now);
        if !matches {
            return Ok(false);
        }
        cred.refresh_token_hash = Some(new_hash.to_string());
        cred.refresh_expires_at = Some(new_expires_at);
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: i64) -> Result<(), StoreError> {
        if let Some(mut cred) = self.credentials.get_mut(&user_id) {
            cred.refresh_token_hash = None;
            cred.refresh_expires_at = None;
        }
        Ok(())
    }

    async fn set_status(&self, user_id: i64, status: Status) -> Result<bool, StoreError> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            if user.email.as_deref() != Some(email.as_str()) {
                user.email_verified = false;
            }
            user.email = Some(email);
        }
        if let Some(mobile) = update.mobile {
            if user.mobile.as_deref() != Some(mobile.as_str()) {
                user.mobile_verified = false;
            }
            user.mobile = Some(mobile);
        }
        if let Some(code) = update.country_code {
            user.country_code = Some(code);
        }
        user.verified = user.email_verified || user.mobile_verified;
        Ok(Some(user.value().clone()))
    }

    async fn create_reset_session(&self, session: ResetSession) -> Result<(), StoreError> {
        self.reset_sessions
            .insert((session.username, session.key), session.expires_at);
        Ok(())
    }

    async fn consume_reset_session(
        &self,
        username: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let id = (username.to_string(), key.to_string());
        if self
            .reset_sessions
            .remove_if(&id, |_, expires_at| *expires_at > now)
            .is_some()
        {
            return Ok(true);
        }
        self.reset_sessions.remove(&id);
        Ok(false)
    }
}
