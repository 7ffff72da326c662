//! Outbound notification channels (email, SMS).
//!
//! Delivery providers live outside this crate; they plug in through
//! [`Notifier`]. [`LogNotifier`] only records that a message would be sent.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::User;

/// Delivery failures. Kept separate from authentication errors so callers
/// can tell "could not notify" apart from "not allowed".
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("sms delivery failed: {0}")]
    Sms(String),

    #[error("user {0} has no email or mobile number on file")]
    NoChannel(i64),
}

/// A notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str)
    -> Result<(), NotificationError>;

    async fn send_sms(
        &self,
        country_code: &str,
        mobile: &str,
        body: &str,
    ) -> Result<(), NotificationError>;
}

/// Writes a tracing event per message instead of delivering it.
///
/// Bodies are not logged since they may carry reset links.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        info!(to, subject, body_len = body.len(), "email queued");
        Ok(())
    }

    async fn send_sms(
        &self,
        country_code: &str,
        mobile: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        info!(country_code, mobile, body_len = body.len(), "sms queued");
        Ok(())
    }
}

/// Send to the user's email if present, otherwise to their mobile number.
pub async fn notify_user(
    notifier: &dyn Notifier,
    user: &User,
    subject: &str,
    body: &str,
) -> Result<(), NotificationError> {
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        return notifier.send_email(email, subject, body).await;
    }
    match (user.country_code.as_deref(), user.mobile.as_deref()) {
        (Some(code), Some(mobile)) if !mobile.is_empty() => {
            notifier.send_sms(code, mobile, body).await
        }
        _ => Err(NotificationError::NoChannel(user.id)),
    }
}
