//! Sync queue repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use super::repository::parse_record_id;
use crate::error::Result;
use crate::models::{NewQueueEntry, QueueOperation, SyncQueueEntry};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for the durable pending-mutation log, scoped to a single owner
pub trait SyncQueueRepository {
    /// Append an entry, returning its row id
    fn enqueue(&self, entry: &NewQueueEntry) -> Result<i64>;

    /// Oldest pending entries first
    fn peek_pending(&self, limit: usize) -> Result<Vec<SyncQueueEntry>>;

    /// Remove a confirmed entry
    fn mark_completed(&self, entry_id: i64) -> Result<bool>;

    /// Bump the attempt counter, returning the new value
    fn increment_attempt(&self, entry_id: i64) -> Result<Option<u32>>;

    /// Number of pending entries
    fn len(&self) -> Result<usize>;
}

/// `SQLite` implementation of `SyncQueueRepository`
pub struct SqliteSyncQueueRepository<'a> {
    conn: &'a Connection,
    owner_id: &'a str,
}

impl<'a> SqliteSyncQueueRepository<'a> {
    /// Create a new repository with the given connection and owner scope
    pub const fn new(conn: &'a Connection, owner_id: &'a str) -> Self {
        Self { conn, owner_id }
    }

    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncQueueEntry> {
        Ok(SyncQueueEntry {
            id: row.get(0)?,
            table_name: row.get(1)?,
            record_id: parse_record_id(row, 2)?,
            operation: QueueOperation::from_ordinal(row.get(3)?).unwrap_or(QueueOperation::Update),
            payload: row.get(4)?,
            created_at: row.get(5)?,
            attempts: row.get(6)?,
        })
    }
}

impl SyncQueueRepository for SqliteSyncQueueRepository<'_> {
    fn enqueue(&self, entry: &NewQueueEntry) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_queue (owner_id, table_name, record_id, operation, payload, created_at, attempts)
             VALUES (?, ?, ?, ?, ?, ?, 0)",
            params![
                self.owner_id,
                entry.table_name,
                entry.record_id.as_str(),
                entry.operation.ordinal(),
                entry.payload,
                entry.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn peek_pending(&self, limit: usize) -> Result<Vec<SyncQueueEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_name, record_id, operation, payload, created_at, attempts
             FROM sync_queue
             WHERE owner_id = ?
             ORDER BY created_at ASC, id ASC
             LIMIT ?",
        )?;

        let entries = stmt
            .query_map(params![self.owner_id, limit as i64], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn mark_completed(&self, entry_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM sync_queue WHERE owner_id = ? AND id = ?",
            params![self.owner_id, entry_id],
        )?;
        Ok(rows > 0)
    }

    fn increment_attempt(&self, entry_id: i64) -> Result<Option<u32>> {
        let attempts = self
            .conn
            .query_row(
                "UPDATE sync_queue SET attempts = attempts + 1
                 WHERE owner_id = ? AND id = ?
                 RETURNING attempts",
                params![self.owner_id, entry_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(attempts)
    }

    fn len(&self) -> Result<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE owner_id = ?",
            params![self.owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
