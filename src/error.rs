use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogReaderError>;

#[derive(Debug, Error)]
pub enum LogReaderError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("cannot determine home directory for the default log location")]
    HomeDirUnavailable,

    #[error("cannot access log directory {}: {reason}", path.display())]
    DirectoryAccessError { path: PathBuf, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
