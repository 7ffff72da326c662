//! Reversible identifier obfuscation.
//!
//! Public-facing ids are encrypted with AES-128-CBC and PKCS#7 padding under a
//! configured key and a fixed 128-bit IV, so the same id always maps to the
//! same token. Output is URL-safe base64 without padding. This hides
//! sequential database keys; it is not meant to provide confidentiality for
//! arbitrary data.

use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

use crate::config::SecretsConfig;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Cipher errors. Messages never include key material.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("malformed identifier encoding")]
    Encoding,

    #[error("identifier failed to decrypt")]
    Decrypt,

    #[error("decrypted identifier is not valid")]
    Plaintext,
}

/// Deterministic id cipher.
#[derive(Clone)]
pub struct IdCipher {
    key: [u8; 16],
    iv: [u8; 16],
}

impl std::fmt::Debug for IdCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdCipher { .. }")
    }
}

impl IdCipher {
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    pub fn from_config(config: &SecretsConfig) -> Self {
        Self::new(config.id_key, config.id_iv)
    }

    /// Encrypt `value` into a URL-safe token.
    pub fn encrypt_id(&self, value: &str) -> Result<String, CipherError> {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(value.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    /// Reverse [`encrypt_id`](Self::encrypt_id).
    ///
    /// Accepts tokens with or without trailing `=` padding.
    pub fn decrypt_id(&self, token: &str) -> Result<String, CipherError> {
        let ciphertext = URL_SAFE_NO_PAD
            .decode(token.trim_end_matches('='))
            .map_err(|_| CipherError::Encoding)?;
        let plaintext = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::Plaintext)
    }

    pub fn encrypt_numeric_id(&self, id: i64) -> Result<String, CipherError> {
        self.encrypt_id(&id.to_string())
    }

    pub fn decrypt_numeric_id(&self, token: &str) -> Result<i64, CipherError> {
        self.decrypt_id(token)?
            .parse()
            .map_err(|_| CipherError::Plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> IdCipher {
        IdCipher::new(*b"0123456789abcdef", *b"fedcba9876543210")
    }

    #[test]
    fn round_trip_printable_strings() {
        let c = cipher();
        for value in ["", "1", "42", "hello world", "~!@#$%^&*()_+{}|:<>?", "ünïcödé"] {
            let token = c.encrypt_id(value).unwrap();
            assert_eq!(c.decrypt_id(&token).unwrap(), value);
        }
    }

    #[test]
    fn encryption_is_deterministic() {
        let c = cipher();
        assert_eq!(c.encrypt_id("1234").unwrap(), c.encrypt_id("1234").unwrap());
        assert_ne!(c.encrypt_id("1234").unwrap(), c.encrypt_id("1235").unwrap());
    }

    #[test]
    fn output_is_url_safe() {
        let c = cipher();
        for i in 0..500 {
            let token = c.encrypt_numeric_id(i).unwrap();
            assert!(
                !token.contains(['+', '/', '=']),
                "token {token} is not URL-safe"
            );
        }
    }

    #[test]
    fn padded_tokens_are_accepted() {
        let c = cipher();
        let mut token = c.encrypt_id("7").unwrap();
        while token.len() % 4 != 0 {
            token.push('=');
        }
        assert_eq!(c.decrypt_id(&token).unwrap(), "7");
    }

    #[test]
    fn numeric_round_trip() {
        let c = cipher();
        let token = c.encrypt_numeric_id(981_234).unwrap();
        assert_eq!(c.decrypt_numeric_id(&token).unwrap(), 981_234);
    }

    #[test]
    fn malformed_input_fails() {
        let c = cipher();
        assert!(matches!(c.decrypt_id("***"), Err(CipherError::Encoding)));
        // Three bytes is not a whole block.
        assert!(matches!(c.decrypt_id("AAAA"), Err(CipherError::Decrypt)));
    }

    #[test]
    fn short_ids_fill_one_block() {
        let c = cipher();
        for value in ["1", "42", "981234", "123456789012345"] {
            let raw = URL_SAFE_NO_PAD.decode(c.encrypt_id(value).unwrap()).unwrap();
            assert_eq!(raw.len(), 16, "{value}");
        }
        let raw = URL_SAFE_NO_PAD.decode(c.encrypt_id("1234567890123456").unwrap()).unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn known_pair_does_not_reveal_other_ids() {
        let c = cipher();
        let known = URL_SAFE_NO_PAD.decode(c.encrypt_id("17").unwrap()).unwrap();
        let other = URL_SAFE_NO_PAD.decode(c.encrypt_id("42").unwrap()).unwrap();

        // A keystream mode would give ct(a) ^ ct(b) == a ^ b.
        let recovered: Vec<u8> = known
            .iter()
            .zip(&other)
            .zip(b"17")
            .map(|((k, o), p)| k ^ o ^ p)
            .collect();
        assert_ne!(recovered, b"42");

        // Ids differing in one byte produce unrelated blocks.
        let differing = known.iter().zip(&other).filter(|(k, o)| k != o).count();
        assert!(differing > 2, "only {differing} bytes differ");
    }

    #[test]
    fn tampered_token_does_not_round_trip() {
        let c = cipher();
        let token = c.encrypt_id("99").unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        bytes[0] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);
        assert_ne!(c.decrypt_id(&tampered).ok().as_deref(), Some("99"));
    }

    #[test]
    fn different_key_cannot_decrypt() {
        let token = cipher().encrypt_id("5").unwrap();
        let other = IdCipher::new(*b"ffffffffffffffff", *b"fedcba9876543210");
        assert_ne!(other.decrypt_id(&token).ok().as_deref(), Some("5"));
    }
}
