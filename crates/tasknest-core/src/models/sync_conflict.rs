//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::RecordId;

/// Strategy label for a regular last-write-wins resolution
pub const STRATEGY_LWW: &str = "lww";
/// Strategy label for equal timestamps with diverging content (left untouched)
pub const STRATEGY_LWW_TIE: &str = "lww-tie";

/// Which copy survived a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictWinner {
    Local,
    Remote,
    /// Neither copy was replaced
    None,
}

impl ConflictWinner {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::None => "none",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "local" => Self::Local,
            "remote" => Self::Remote,
            _ => Self::None,
        }
    }
}

/// Recorded sync conflict resolved by strategy (e.g., LWW)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Record involved in the conflict
    pub record_id: RecordId,
    /// Local copy's timestamp when the conflict was detected
    pub local_updated_at: i64,
    /// Remote copy's timestamp when the conflict was detected
    pub remote_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Surviving copy
    pub winner: ConflictWinner,
    /// Resolution strategy name
    pub strategy: String,
}
