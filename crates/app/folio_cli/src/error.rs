use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("{}", .0)]
    Config(#[from] folio_core::config::ConfigError),

    #[error("{}", .0)]
    Cipher(#[from] folio_core::cipher::CipherError),

    #[error("{}", .0)]
    Auth(#[from] folio_core::auth::AuthError),
}
