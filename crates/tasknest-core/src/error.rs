//! Error types for tasknest-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using tasknest-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tasknest-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No authenticated owner is established for this call
    #[error("No authenticated owner; sign in before accessing records")]
    Unauthenticated,

    /// Remote store error
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Whether retrying the failed operation later is likely to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Remote(error) => error.is_transient(),
            _ => false,
        }
    }
}
