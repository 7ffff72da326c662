//! API server configuration.

use folio_core::config::{ConfigError, SecretsConfig};

/// Default lifetime of a password-reset session.
pub const DEFAULT_RESET_SESSION_TTL_MINUTES: i64 = 15;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Base URL of the admin front end, used to build reset links.
    pub public_base_url: String,
    /// Minutes a password-reset session stays usable.
    pub reset_session_ttl_minutes: i64,
    /// Signing keys, id cipher material and legacy salt.
    pub secrets: SecretsConfig,
}

/// Parse `FOLIO_RESET_TTL_MINUTES`. Unset means the default; anything other
/// than a positive integer is rejected.
fn parse_reset_ttl(raw: Option<String>) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_RESET_SESSION_TTL_MINUTES);
    };
    let minutes: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "FOLIO_RESET_TTL_MINUTES",
        reason: format!("not an integer: {raw}"),
    })?;
    if minutes <= 0 {
        return Err(ConfigError::Invalid {
            key: "FOLIO_RESET_TTL_MINUTES",
            reason: format!("must be positive, got {minutes}"),
        });
    }
    Ok(minutes)
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                  | Default                           |
    /// |---------------------------|-----------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3100`                  |
    /// | `DATABASE_URL`            | `postgres://localhost:5432/folio` |
    /// | `FOLIO_PUBLIC_BASE_URL`   | `http://localhost:5173`           |
    /// | `FOLIO_RESET_TTL_MINUTES` | `15`                              |
    /// | secrets                   | see [`SecretsConfig::from_env`]   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let reset_session_ttl_minutes =
            parse_reset_ttl(std::env::var("FOLIO_RESET_TTL_MINUTES").ok())?;
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/folio".into()),
            public_base_url: std::env::var("FOLIO_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            reset_session_ttl_minutes,
            secrets: SecretsConfig::from_env()?,
        })
    }

    /// Configuration with freshly generated secrets, for tests and local runs.
    pub fn ephemeral() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            public_base_url: "http://localhost:5173".into(),
            reset_session_ttl_minutes: DEFAULT_RESET_SESSION_TTL_MINUTES,
            secrets: SecretsConfig::generate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_ttl_defaults_when_unset() {
        assert_eq!(
            parse_reset_ttl(None).unwrap(),
            DEFAULT_RESET_SESSION_TTL_MINUTES
        );
        assert_eq!(parse_reset_ttl(Some(" 30 ".into())).unwrap(), 30);
    }

    #[test]
    fn reset_ttl_must_be_a_positive_integer() {
        for raw in ["0", "-5", "ten", ""] {
            let err = parse_reset_ttl(Some(raw.into())).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::Invalid {
                        key: "FOLIO_RESET_TTL_MINUTES",
                        ..
                    }
                ),
                "{raw}: {err}"
            );
        }
    }
}
