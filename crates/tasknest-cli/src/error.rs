use std::io;

use tasknest_core::auth::AuthError;
use tasknest_core::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tasknest_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No title provided")]
    EmptyTitle,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Record not found for id/prefix: {0}")]
    RecordNotFound(String),
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("Invalid due date '{0}'; use YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDue(String),
    #[error("Only tasks can be completed; {0} is a note")]
    NotATask(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error(
        "Sync is not configured. Run `tasknest config init --remote-url <URL>` or set TASKNEST_REMOTE_URL."
    )]
    SyncNotConfigured,
}
