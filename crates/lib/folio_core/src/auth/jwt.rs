//! JWT access/reset token issuance and verification, plus refresh tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{RngCore, rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::AuthError;
use crate::config::SecretsConfig;

/// Access token lifetime without "remember me": 1 hour.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 60 * 60;

/// Access token lifetime with "remember me": 180 days.
pub const REMEMBER_ME_EXPIRY_SECS: i64 = 180 * 24 * 60 * 60;

/// Refresh token lifetime: 1 year.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 365;

/// Refresh token entropy in bytes.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// String-encoded numeric user id.
    #[serde(rename = "UserId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub role: String,
    #[serde(rename = "EmailVerified")]
    pub email_verified: bool,
    #[serde(rename = "MobileVerified")]
    pub mobile_verified: bool,
    #[serde(rename = "RememberMe")]
    pub remember_me: bool,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl AccessClaims {
    /// Numeric user id, if present and well-formed.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id.as_deref()?.parse().ok()
    }
}

/// Claims embedded in password-reset tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub username: String,
    pub key: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
}

/// Input for [`TokenIssuer::issue_access_token`].
#[derive(Debug, Clone)]
pub struct AccessGrant<'a> {
    pub user_id: i64,
    pub role: &'a str,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub remember_me: bool,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_in: i64,
    pub claims: AccessClaims,
}

/// A freshly minted refresh token. Only its hash is persisted.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token signing settings.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    /// Clock skew tolerance when checking `exp`/`nbf`.
    pub leeway_secs: u64,
}

impl TokenSettings {
    pub fn from_config(config: &SecretsConfig) -> Self {
        Self {
            secret: config.jwt_secret.as_bytes().to_vec(),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            leeway_secs: 0,
        }
    }
}

/// Stateless JWT issuer/validator. Cheap to clone.
#[derive(Clone)]
pub struct TokenIssuer {
    settings: TokenSettings,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.settings.issuer)
            .field("audience", &self.settings.audience)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(settings: TokenSettings) -> Self {
        let encoding = EncodingKey::from_secret(&settings.secret);
        let decoding = DecodingKey::from_secret(&settings.secret);
        Self {
            settings,
            encoding,
            decoding,
        }
    }

    pub fn from_config(config: &SecretsConfig) -> Self {
        Self::new(TokenSettings::from_config(config))
    }

    /// Lifetime in seconds for the given "remember me" choice.
    pub fn lifetime_secs(remember_me: bool) -> i64 {
        if remember_me {
            REMEMBER_ME_EXPIRY_SECS
        } else {
            ACCESS_TOKEN_EXPIRY_SECS
        }
    }

    /// Sign an HS256 access token.
    pub fn issue_access_token(
        &self,
        grant: &AccessGrant<'_>,
    ) -> Result<IssuedAccessToken, AuthError> {
        self.issue_access_token_at(grant, Utc::now())
    }

    fn issue_access_token_at(
        &self,
        grant: &AccessGrant<'_>,
        now: DateTime<Utc>,
    ) -> Result<IssuedAccessToken, AuthError> {
        let expires_in = Self::lifetime_secs(grant.remember_me);
        let claims = AccessClaims {
            user_id: Some(grant.user_id.to_string()),
            role: grant.role.to_string(),
            email_verified: grant.email_verified,
            mobile_verified: grant.mobile_verified,
            remember_me: grant.remember_me,
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::seconds(expires_in)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        Ok(IssuedAccessToken {
            token,
            expires_in,
            claims,
        })
    }

    /// Mint an opaque refresh token expiring in one year.
    pub fn issue_refresh_token(&self) -> IssuedRefreshToken {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rng().fill_bytes(&mut bytes);
        IssuedRefreshToken {
            token: STANDARD.encode(bytes),
            expires_at: Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
        }
    }

    /// Sign a password-reset token. It carries no `exp`; the reset session
    /// in the store bounds its usefulness.
    pub fn issue_password_reset_token(
        &self,
        username: &str,
        key: &str,
    ) -> Result<String, AuthError> {
        let claims = ResetClaims {
            username: username.to_string(),
            key: key.to_string(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: Utc::now().timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    fn validation(&self, check_lifetime: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);
        validation.leeway = self.settings.leeway_secs;
        validation.validate_exp = check_lifetime;
        validation.validate_nbf = check_lifetime;
        if check_lifetime {
            validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);
        } else {
            validation.set_required_spec_claims(&["iss", "aud"]);
        }
        validation
    }

    /// Verify signature, algorithm, issuer, audience and lifetime.
    pub fn validate_and_get_claims(&self, token: &str) -> Option<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation(true))
            .map_err(|e| debug!(error = %e, "access token rejected"))
            .ok()
            .map(|data| data.claims)
    }

    /// Like [`validate_and_get_claims`](Self::validate_and_get_claims) but
    /// accepts expired tokens. Only for the refresh exchange.
    pub fn claims_ignoring_expiry(&self, token: &str) -> Option<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation(false))
            .map_err(|e| debug!(error = %e, "access token rejected"))
            .ok()
            .map(|data| data.claims)
    }

    /// Verify a password-reset token.
    pub fn validate_reset_token(&self, token: &str) -> Option<ResetClaims> {
        decode::<ResetClaims>(token, &self.decoding, &self.validation(false))
            .map_err(|e| debug!(error = %e, "reset token rejected"))
            .ok()
            .map(|data| data.claims)
    }
}

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
