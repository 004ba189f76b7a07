//! Runner error types.

use std::path::PathBuf;

use thiserror::Error;

/// Runner errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The database file does not exist.
    #[error("database not found: {}", .0.display())]
    DatabaseNotFound(PathBuf),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] legacy_journals_core::Error),

    /// Migration error.
    #[error(transparent)]
    Migration(#[from] legacy_journals_core::MigrationError),
}
