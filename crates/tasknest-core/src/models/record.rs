//! Record model (tasks and notes)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::now_millis;

/// Identifier of a record, unique across all owners.
///
/// Locally created records use UUID v7 (time-sortable); identifiers received from
/// the remote store are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Borrow the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Kind of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Actionable item with an optional due date
    #[default]
    Task,
    /// Free-form note
    Note,
}

impl RecordKind {
    /// Stable ordinal used in storage and on the wire
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Task => 0,
            Self::Note => 1,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Task),
            1 => Some(Self::Note),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Task => "task",
            Self::Note => "note",
        })
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Stable ordinal used in storage and on the wire
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// Per-record synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local copy matches what the remote store last acknowledged
    Synced,
    /// Local change not yet uploaded
    #[default]
    NeedsSync,
    /// Upload in flight
    Syncing,
    /// Last upload attempt failed; retried on the next pass
    Failed,
}

impl SyncStatus {
    pub const ALL: [Self; 4] = [Self::Synced, Self::NeedsSync, Self::Syncing, Self::Failed];

    /// Stable ordinal used in storage
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Synced => 0,
            Self::NeedsSync => 1,
            Self::Syncing => 2,
            Self::Failed => 3,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Synced),
            1 => Some(Self::NeedsSync),
            2 => Some(Self::Syncing),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::NeedsSync => "needs-sync",
            Self::Syncing => "syncing",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A task or note owned by the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, never changes once created
    pub id: RecordId,
    /// Task or note
    pub kind: RecordKind,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Due timestamp (Unix ms)
    pub due_at: Option<i64>,
    /// Priority
    pub priority: Priority,
    /// Completion flag
    pub completed: bool,
    /// Free-text note
    pub note: Option<String>,
    /// Creation timestamp (Unix ms), set once
    pub created_at: i64,
    /// Last update timestamp (Unix ms), monotonic per writer
    pub updated_at: i64,
    /// Local synchronization state
    pub sync_status: SyncStatus,
    /// When the record was last confirmed against the remote store (Unix ms)
    pub last_sync_at: Option<i64>,
}

impl Record {
    /// Create a new record of the given kind
    #[must_use]
    pub fn new(kind: RecordKind, title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            kind,
            title: title.into(),
            description: String::new(),
            due_at: None,
            priority: Priority::default(),
            completed: false,
            note: None,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::NeedsSync,
            last_sync_at: None,
        }
    }

    /// Create a new task
    #[must_use]
    pub fn task(title: impl Into<String>) -> Self {
        Self::new(RecordKind::Task, title)
    }

    /// Create a new note with body text
    #[must_use]
    pub fn note(title: impl Into<String>, body: impl Into<String>) -> Self {
        let mut record = Self::new(RecordKind::Note, title);
        record.note = Some(body.into());
        record
    }

    /// Bump `updated_at` after a local edit.
    ///
    /// The new value is strictly greater than the previous one even when the
    /// wall clock has not advanced or went backwards.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at.saturating_add(1));
    }

    /// `updated_at >= created_at`
    pub const fn has_valid_timestamps(&self) -> bool {
        self.updated_at >= self.created_at
    }

    /// Compare user-visible content and timestamps, ignoring local sync metadata.
    pub fn same_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.title == other.title
            && self.description == other.description
            && self.due_at == other.due_at
            && self.priority == other.priority
            && self.completed == other.completed
            && self.note == other.note
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }

    /// Get title truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.title.chars().take(max_len).collect()
    }
}
