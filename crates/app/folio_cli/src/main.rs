// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use folio_core::auth::password;
use folio_core::cipher::IdCipher;
use folio_core::config::SecretsConfig;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn cipher_from_env() -> Result<IdCipher> {
    dotenvy::dotenv().ok();
    let secrets = SecretsConfig::from_env()?;
    Ok(IdCipher::from_config(&secrets))
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::HashPassword { password: pw, salt } => {
            let (hash, salt) = match salt {
                Some(salt) => (password::hash_password(pw, salt)?, salt.clone()),
                None => password::new_password_hash(pw)?,
            };
            println!("hash={hash}");
            println!("salt={salt}");
        }
        Commands::EncryptId { value } => {
            println!("{}", cipher_from_env()?.encrypt_id(value)?);
        }
        Commands::DecryptId { token } => {
            println!("{}", cipher_from_env()?.decrypt_id(token)?);
        }
        Commands::GenSecrets { output } => {
            let mut text = SecretsConfig::generate().to_env_lines().join("\n");
            text.push('\n');
            match output {
                Some(path) => {
                    std::fs::write(path, text)?;
                    log::info!("wrote secrets to {}", path.display());
                }
                None => print!("{text}"),
            }
        }
    }

    Ok(())
}
