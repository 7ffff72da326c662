//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API wire models
//! (which use camelCase and expose encrypted identifiers).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unknown enum label when parsing a status or user type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Account status. Only `Active` accounts may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Suspended,
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Suspended => "suspended",
            Status::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "suspended" => Ok(Status::Suspended),
            "deleted" => Ok(Status::Deleted),
            _ => Err(ParseEnumError {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// The two admin tenants.
///
/// The wire/role labels are `SupAdmin` for the primary administrator and
/// `RegexUser` for the secondary account class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    #[serde(rename = "SupAdmin")]
    SuperAdmin,
    #[serde(rename = "RegexUser")]
    RegularAdmin,
}

impl UserType {
    /// Role label embedded in access tokens and used for route policy.
    pub fn label(&self) -> &'static str {
        match self {
            UserType::SuperAdmin => "SupAdmin",
            UserType::RegularAdmin => "RegexUser",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SupAdmin" => Ok(UserType::SuperAdmin),
            "RegexUser" => Ok(UserType::RegularAdmin),
            _ => Err(ParseEnumError {
                kind: "user type",
                value: s.to_string(),
            }),
        }
    }
}

/// Domain user. Never hard-deleted; deletion is `Status::Deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
    pub username: String,
    pub status: Status,
    pub user_type: UserType,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub verified: bool,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
    pub username: String,
    pub user_type: UserType,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub country_code: Option<String>,
}

/// Credential record, one per user.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: i64,
    pub password_hash: String,
    /// `None` for records hashed with the legacy shared salt.
    pub password_salt: Option<String>,
    /// SHA-256 hex of the current refresh token.
    pub refresh_token_hash: Option<String>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Password-reset session binding a username to a single-use key.
#[derive(Debug, Clone)]
pub struct ResetSession {
    pub username: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Active".parse::<Status>().unwrap(), Status::Active);
        assert_eq!("suspended".parse::<Status>().unwrap(), Status::Suspended);
        assert!("banned".parse::<Status>().is_err());
    }

    #[test]
    fn user_type_uses_role_labels() {
        assert_eq!(UserType::SuperAdmin.label(), "SupAdmin");
        assert_eq!("RegexUser".parse::<UserType>().unwrap(), UserType::RegularAdmin);
        assert!("supadmin".parse::<UserType>().is_err());
        assert_eq!(
            serde_json::to_string(&UserType::RegularAdmin).unwrap(),
            "\"RegexUser\""
        );
    }
}
