//! # folio_core
//!
//! Core authentication domain logic for Folio: identifier cipher, password
//! hashing, token issuance, and the user/credential store.

pub mod auth;
pub mod cipher;
pub mod config;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
