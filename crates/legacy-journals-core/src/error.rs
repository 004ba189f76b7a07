//! Core error types.

use thiserror::Error;

/// Store-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A row is missing a required column or holds the wrong kind of value.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
