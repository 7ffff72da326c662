//! Password hashing via PBKDF2-HMAC-SHA1 with a per-user salt.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::{RngCore, rng};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use super::AuthError;
use crate::models::auth::Credential;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Derived key length in bytes (256 bits).
const HASH_LEN: usize = 32;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Outcome of checking a password against a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Mismatch,
    Match,
    /// Matched against the legacy shared salt; the caller should rehash.
    MatchNeedsRehash,
}

fn derive(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
    pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, iterations, out);
}

/// Generate a fresh random salt, base64-encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rng().fill_bytes(&mut salt);
    STANDARD.encode(salt)
}

/// Hash a password with the given base64 salt. Returns a 44-char base64 digest.
pub fn hash_password(password: &str, salt_b64: &str) -> Result<String, AuthError> {
    let salt = STANDARD
        .decode(salt_b64)
        .map_err(|e| AuthError::Internal(format!("salt decode: {e}")))?;
    if salt.is_empty() {
        return Err(AuthError::Internal("empty password salt".into()));
    }
    let mut out = [0u8; HASH_LEN];
    derive(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut out);
    Ok(STANDARD.encode(out))
}

/// Constant-time comparison of two encoded hashes.
pub fn verify_password(provided_hash: &str, stored_hash: &str) -> bool {
    provided_hash
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

/// Run one full derivation against a fixed salt and discard the result.
/// Used where there is no stored hash, so the request costs the same as a
/// real comparison.
pub fn hash_dummy(password: &str) {
    let mut out = [0u8; HASH_LEN];
    derive(password.as_bytes(), &[0u8; SALT_LEN], PBKDF2_ITERATIONS, &mut out);
    std::hint::black_box(out);
}

/// Generate a salt and hash a new password. Returns `(hash, salt)`.
pub fn new_password_hash(password: &str) -> Result<(String, String), AuthError> {
    validate_new_password(password)?;
    let salt = generate_salt();
    let hash = hash_password(password, &salt)?;
    Ok((hash, salt))
}

/// Reject passwords that are too short to be stored.
pub fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Check a plaintext password against a stored credential.
///
/// Credentials written before per-user salts existed carry no salt and were
/// hashed with a single shared salt; those are checked against
/// `legacy_salt` and reported as [`PasswordCheck::MatchNeedsRehash`].
pub fn check_password(
    password: &str,
    credential: &Credential,
    legacy_salt: Option<&str>,
) -> Result<PasswordCheck, AuthError> {
    let (salt, legacy) = match credential.password_salt.as_deref() {
        Some(salt) => (salt, false),
        None => match legacy_salt {
            Some(salt) => (salt, true),
            None => {
                return Err(AuthError::Internal(
                    "credential has no salt and no legacy salt is configured".into(),
                ));
            }
        },
    };

    let provided = hash_password(password, salt)?;
    if !verify_password(&provided, &credential.password_hash) {
        return Ok(PasswordCheck::Mismatch);
    }
    Ok(if legacy {
        PasswordCheck::MatchNeedsRehash
    } else {
        PasswordCheck::Match
    })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn fastest_of_three(f: impl Fn()) -> Duration {
        (0..3)
            .map(|_| {
                let start = Instant::now();
                f();
                start.elapsed()
            })
            .min()
            .unwrap()
    }

    #[test]
    fn dummy_hash_costs_a_full_derivation() {
        let salt = generate_salt();
        let real = fastest_of_three(|| {
            hash_password("correct horse battery", &salt).unwrap();
        });
        let dummy = fastest_of_three(|| hash_dummy("correct horse battery"));
        assert!(dummy * 4 >= real, "dummy {dummy:?} vs real {real:?}");
    }

    fn credential(hash: String, salt: Option<String>) -> Credential {
        Credential {
            user_id: 1,
            password_hash: hash,
            password_salt: salt,
            refresh_token_hash: None,
            refresh_expires_at: None,
        }
    }

    #[test]
    fn pbkdf2_sha1_matches_rfc6070_vector() {
        let mut out = [0u8; 20];
        derive(b"password", b"salt", 1, &mut out);
        let hex: String = out.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "0c60c80f961f0e71f3a9b524af6012062fe037a6");
    }

    #[test]
    fn hash_is_deterministic_and_256_bit() {
        let salt = generate_salt();
        let a = hash_password("correct horse", &salt).unwrap();
        let b = hash_password("correct horse", &salt).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 44);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn different_salts_give_different_hashes() {
        let a = hash_password("pw-12345678", &generate_salt()).unwrap();
        let b = hash_password("pw-12345678", &generate_salt()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_salt_is_rejected() {
        assert!(hash_password("pw", "not base64!!").is_err());
        assert!(hash_password("pw", "").is_err());
    }

    #[test]
    fn verify_compares_exactly() {
        assert!(verify_password("abc", "abc"));
        assert!(!verify_password("abc", "abd"));
        assert!(!verify_password("abc", "abcd"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            new_password_hash("short"),
            Err(AuthError::ValidationError(_))
        ));
        let (hash, salt) = new_password_hash("long enough").unwrap();
        assert_eq!(hash_password("long enough", &salt).unwrap(), hash);
    }

    #[test]
    fn check_password_with_own_salt() {
        let (hash, salt) = new_password_hash("s3cret-pass").unwrap();
        let cred = credential(hash, Some(salt));
        assert_eq!(
            check_password("s3cret-pass", &cred, None).unwrap(),
            PasswordCheck::Match
        );
        assert_eq!(
            check_password("wrong-pass", &cred, None).unwrap(),
            PasswordCheck::Mismatch
        );
    }

    #[test]
    fn legacy_credentials_need_rehash() {
        let legacy_salt = generate_salt();
        let hash = hash_password("old-password", &legacy_salt).unwrap();
        let cred = credential(hash, None);
        assert_eq!(
            check_password("old-password", &cred, Some(&legacy_salt)).unwrap(),
            PasswordCheck::MatchNeedsRehash
        );
        assert!(check_password("old-password", &cred, None).is_err());
    }
}
