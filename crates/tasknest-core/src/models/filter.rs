//! Record query criteria

use super::{Priority, RecordKind, SyncStatus};

/// Criteria for [`crate::services::RecordStore::get_by_criteria`].
///
/// Unset fields match everything; set fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub kind: Option<RecordKind>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub sync_status: Option<SyncStatus>,
    /// Only records due strictly before this timestamp (Unix ms)
    pub due_before: Option<i64>,
    /// Case-insensitive substring of title, description or note
    pub text: Option<String>,
    pub limit: Option<usize>,
}

impl RecordFilter {
    #[must_use]
    pub const fn kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn sync_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = Some(status);
        self
    }

    #[must_use]
    pub const fn due_before(mut self, timestamp: i64) -> Self {
        self.due_before = Some(timestamp);
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
