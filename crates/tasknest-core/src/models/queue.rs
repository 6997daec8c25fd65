//! Sync queue entry model

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RecordId;
use crate::util::now_millis;

/// Table name used for record mutations in the sync queue
pub const RECORDS_TABLE: &str = "records";

/// Kind of pending mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOperation {
    Insert,
    Update,
    Delete,
}

impl QueueOperation {
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Insert => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Insert),
            1 => Some(Self::Update),
            2 => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(label)
    }
}

/// A pending mutation awaiting confirmation by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    /// Queue row identifier (assigned on enqueue)
    pub id: i64,
    /// Target table/collection
    pub table_name: String,
    /// Record the mutation applies to
    pub record_id: RecordId,
    /// Mutation kind
    pub operation: QueueOperation,
    /// JSON snapshot of the record at mutation time; empty for deletes
    pub payload: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Number of failed passes this entry took part in
    pub attempts: u32,
}

/// A queue entry before it has been persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueEntry {
    pub table_name: String,
    pub record_id: RecordId,
    pub operation: QueueOperation,
    pub payload: String,
    pub created_at: i64,
}

impl NewQueueEntry {
    /// Entry for a record mutation carrying a payload snapshot
    #[must_use]
    pub fn for_record(record_id: RecordId, operation: QueueOperation, payload: String) -> Self {
        let payload = if operation == QueueOperation::Delete {
            String::new()
        } else {
            payload
        };
        Self {
            table_name: RECORDS_TABLE.to_string(),
            record_id,
            operation,
            payload,
            created_at: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_entries_carry_no_payload() {
        let entry = NewQueueEntry::for_record(
            RecordId::new(),
            QueueOperation::Delete,
            "{\"id\":\"x\"}".to_string(),
        );
        assert!(entry.payload.is_empty());
        assert_eq!(entry.table_name, RECORDS_TABLE);
    }

    #[test]
    fn operation_ordinals_roundtrip() {
        for op in [
            QueueOperation::Insert,
            QueueOperation::Update,
            QueueOperation::Delete,
        ] {
            assert_eq!(QueueOperation::from_ordinal(op.ordinal()), Some(op));
        }
        assert_eq!(QueueOperation::from_ordinal(7), None);
    }
}
