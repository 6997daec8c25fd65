//! Remote authoritative store.
//!
//! [`RemoteClient`] is the only way the sync engine reaches the remote store.
//! Every call is scoped by a mandatory owner id. Failures are reported as
//! [`RemoteError`], which knows whether retrying later is worthwhile.

mod http;
mod memory;
mod wire;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::models::{Record, RecordId};

pub use http::HttpRemoteClient;
pub use memory::{MemoryRemoteClient, RemoteCallCounts};
pub use wire::WireRecord;

/// Errors reported by a [`RemoteClient`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
    #[error("Remote deadline exceeded: {0}")]
    DeadlineExceeded(String),
    #[error("Remote resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Remote rejected credentials: {0}")]
    Unauthorized(String),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
}

impl RemoteError {
    /// Whether the failure is likely to go away on retry.
    ///
    /// Unavailability, deadlines and quota exhaustion are transient by kind;
    /// other API errors are transient when their message reads like a
    /// connectivity problem.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::DeadlineExceeded(_) | Self::ResourceExhausted(_) => true,
            Self::Api(message) => is_connectivity_message(message),
            Self::Unauthorized(_) | Self::InvalidPayload(_) | Self::InvalidConfiguration(_) => false,
        }
    }
}

/// Match error text against connectivity keywords.
pub fn is_connectivity_message(message: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(network|connection|connect|timeout|timed out|unreachable|unavailable|offline|dns|socket|reset by peer|broken pipe)\b",
            )
            .expect("Invalid regex")
        })
        .is_match(message)
}

/// Owner-scoped access to the authoritative record store
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Every record the owner has on the remote store
    async fn fetch_all(&self, owner_id: &str) -> Result<Vec<Record>, RemoteError>;

    /// Create or overwrite a record
    async fn upsert(&self, owner_id: &str, record: &Record) -> Result<(), RemoteError>;

    /// Delete a record; deleting a missing record succeeds
    async fn delete(&self, owner_id: &str, id: &RecordId) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_are_classified() {
        assert!(RemoteError::Unavailable("down".into()).is_transient());
        assert!(RemoteError::DeadlineExceeded("slow".into()).is_transient());
        assert!(RemoteError::ResourceExhausted("quota".into()).is_transient());
        assert!(!RemoteError::Unauthorized("nope".into()).is_transient());
        assert!(!RemoteError::InvalidPayload("bad json".into()).is_transient());
    }

    #[test]
    fn api_errors_use_keyword_match() {
        assert!(RemoteError::Api("upstream connection reset by peer".into()).is_transient());
        assert!(RemoteError::Api("Network is unreachable (500)".into()).is_transient());
        assert!(!RemoteError::Api("record validation failed (422)".into()).is_transient());
    }
}
