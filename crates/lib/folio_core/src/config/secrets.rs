//! Secrets configuration resolved from the environment.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::distr::Alphanumeric;
use rand::{Rng, RngCore, rng};

use super::ConfigError;

/// Minimum JWT signing secret length in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "folio-api";

/// Default `aud` claim.
pub const DEFAULT_AUDIENCE: &str = "folio-admin";

/// Cryptographic material and token identity.
#[derive(Clone)]
pub struct SecretsConfig {
    /// HMAC-SHA256 signing key for all JWTs.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// AES-128 key for identifier obfuscation.
    pub id_key: [u8; 16],
    /// Fixed 128-bit IV for identifier obfuscation.
    pub id_iv: [u8; 16],
    /// Shared salt used by credentials created before per-user salts.
    pub legacy_password_salt: Option<String>,
}

impl fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("id_key", &"<redacted>")
            .field("id_iv", &"<redacted>")
            .field(
                "legacy_password_salt",
                &self.legacy_password_salt.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl SecretsConfig {
    /// Reads secrets from environment variables.
    ///
    /// | Variable                     | Required | Format                  |
    /// |------------------------------|----------|-------------------------|
    /// | `FOLIO_JWT_SECRET`           | yes      | ≥ 32 bytes              |
    /// | `FOLIO_JWT_ISSUER`           | no       | default `folio-api`     |
    /// | `FOLIO_JWT_AUDIENCE`         | no       | default `folio-admin`   |
    /// | `FOLIO_ID_KEY`               | yes      | base64, 16 bytes        |
    /// | `FOLIO_ID_IV`                | yes      | base64, 16 bytes        |
    /// | `FOLIO_LEGACY_PASSWORD_SALT` | no       | base64                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads secrets through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("FOLIO_JWT_SECRET").ok_or(ConfigError::Missing("FOLIO_JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "FOLIO_JWT_SECRET",
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let id_key = decode_block(
            "FOLIO_ID_KEY",
            &get("FOLIO_ID_KEY").ok_or(ConfigError::Missing("FOLIO_ID_KEY"))?,
        )?;
        let id_iv = decode_block(
            "FOLIO_ID_IV",
            &get("FOLIO_ID_IV").ok_or(ConfigError::Missing("FOLIO_ID_IV"))?,
        )?;

        let legacy_password_salt = get("FOLIO_LEGACY_PASSWORD_SALT");
        if let Some(salt) = &legacy_password_salt {
            STANDARD
                .decode(salt)
                .map_err(|e| ConfigError::Invalid {
                    key: "FOLIO_LEGACY_PASSWORD_SALT",
                    reason: e.to_string(),
                })?;
        }

        Ok(Self {
            jwt_secret,
            jwt_issuer: get("FOLIO_JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.into()),
            jwt_audience: get("FOLIO_JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_AUDIENCE.into()),
            id_key,
            id_iv,
            legacy_password_salt,
        })
    }

    /// Fresh random secrets, for development setups and tests.
    pub fn generate() -> Self {
        let jwt_secret: String = rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        let mut id_key = [0u8; 16];
        let mut id_iv = [0u8; 16];
        rng().fill_bytes(&mut id_key);
        rng().fill_bytes(&mut id_iv);
        Self {
            jwt_secret,
            jwt_issuer: DEFAULT_ISSUER.into(),
            jwt_audience: DEFAULT_AUDIENCE.into(),
            id_key,
            id_iv,
            legacy_password_salt: None,
        }
    }

    /// Render as `KEY=value` lines suitable for a `.env` file.
    pub fn to_env_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("FOLIO_JWT_SECRET={}", self.jwt_secret),
            format!("FOLIO_JWT_ISSUER={}", self.jwt_issuer),
            format!("FOLIO_JWT_AUDIENCE={}", self.jwt_audience),
            format!("FOLIO_ID_KEY={}", STANDARD.encode(self.id_key)),
            format!("FOLIO_ID_IV={}", STANDARD.encode(self.id_iv)),
        ];
        if let Some(salt) = &self.legacy_password_salt {
            lines.push(format!("FOLIO_LEGACY_PASSWORD_SALT={salt}"));
        }
        lines
    }
}

fn decode_block(key: &'static str, value: &str) -> Result<[u8; 16], ConfigError> {
    let bytes = STANDARD.decode(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    bytes.try_into().map_err(|v: Vec<u8>| ConfigError::Invalid {
        key,
        reason: format!("expected 16 bytes, got {}", v.len()),
    })
}
