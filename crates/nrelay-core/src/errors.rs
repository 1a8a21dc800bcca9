use std::path::PathBuf;

/// Core error type for the relay.
///
/// Adapter crates map their library errors into `Config` (client construction) or
/// `Delivery` (send failures).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("user already exists: {0}")]
    DuplicateUser(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("authentication denied")]
    AuthDenied,

    #[error("password hash error: {0}")]
    PasswordHash(String),

    #[error("{0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, Error>;
