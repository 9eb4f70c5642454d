//! Error types raised by checkpoint repositories.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("checkpoint repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted checkpoint {name}: {reason}")]
    CorruptedData { name: String, reason: String },
}
