use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operator tooling for Folio deployments.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Hash a password the way the server stores it.
    ///
    /// Without `--salt` a fresh salt is generated and the password must meet
    /// the minimum length. With `--salt` (e.g. the legacy shared salt) the
    /// hash is computed as-is.
    HashPassword {
        password: String,

        /// Base64 salt to hash with.
        #[arg(long)]
        salt: Option<String>,
    },

    /// Encrypt an identifier with the configured id key.
    EncryptId { value: String },

    /// Decrypt an identifier produced by `encrypt-id` or the API.
    DecryptId { token: String },

    /// Generate a fresh set of secrets as `.env` lines.
    GenSecrets {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}
