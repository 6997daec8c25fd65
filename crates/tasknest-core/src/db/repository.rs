//! Record repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::{Error, Result};
use crate::models::{
    ConflictWinner, Priority, QueueOperation, Record, RecordFilter, RecordId, RecordKind,
    SyncConflict, SyncStatus,
};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

const RECORD_COLUMNS: &str = "id, kind, title, description, due_at, priority, completed, note, \
     created_at, updated_at, sync_status, last_sync_at";

/// Trait for record storage operations, scoped to a single owner
pub trait RecordRepository {
    /// Insert a new record exactly as given
    fn insert(&self, record: &Record) -> Result<()>;

    /// Overwrite an existing record exactly as given (created_at is kept)
    fn update(&self, record: &Record) -> Result<()>;

    /// Apply a remote-origin copy unless the stored row is at least as new.
    ///
    /// A record with a pending local delete is never re-inserted. Returns
    /// whether the row was written.
    fn apply_remote(&self, record: &Record) -> Result<bool>;

    /// Overwrite an existing row with a newer remote copy; never inserts.
    fn apply_remote_update(&self, record: &Record) -> Result<bool>;

    /// Hard-delete a record
    fn delete(&self, id: &RecordId) -> Result<()>;

    /// Get a record by ID
    fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// All records, most recently updated first
    fn list_all(&self) -> Result<Vec<Record>>;

    /// Records matching the filter, most recently updated first
    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// IDs starting with the given prefix
    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Set the sync status, optionally only if `updated_at` still matches
    fn set_sync_status(
        &self,
        id: &RecordId,
        status: SyncStatus,
        expected_updated_at: Option<i64>,
        synced_at: Option<i64>,
    ) -> Result<bool>;

    /// Move every `Syncing` record to `Failed`
    fn fail_in_flight(&self) -> Result<usize>;

    /// Record counts grouped by sync status
    fn count_by_status(&self) -> Result<Vec<(SyncStatus, usize)>>;

    /// Append a conflict resolution to the log.
    ///
    /// Returns `false` when the same record, timestamps and strategy are
    /// already logged.
    fn record_conflict(&self, conflict: &SyncConflict) -> Result<bool>;

    /// Most recent conflict resolutions
    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
    owner_id: &'a str,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection and owner scope
    pub const fn new(conn: &'a Connection, owner_id: &'a str) -> Self {
        Self { conn, owner_id }
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
        Ok(Record {
            id: parse_record_id(row, 0)?,
            kind: RecordKind::from_ordinal(row.get(1)?).unwrap_or_default(),
            title: row.get(2)?,
            description: row.get(3)?,
            due_at: row.get(4)?,
            priority: Priority::from_ordinal(row.get(5)?).unwrap_or_default(),
            completed: row.get(6)?,
            note: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            sync_status: SyncStatus::from_ordinal(row.get(10)?).unwrap_or_default(),
            last_sync_at: row.get(11)?,
        })
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        let winner: String = row.get(5)?;
        Ok(SyncConflict {
            id: row.get(0)?,
            record_id: parse_record_id(row, 1)?,
            local_updated_at: row.get(2)?,
            remote_updated_at: row.get(3)?,
            resolved_at: row.get(4)?,
            winner: ConflictWinner::parse(&winner),
            strategy: row.get(6)?,
        })
    }
}

/// Read a stored record id, rejecting values that do not parse.
pub(crate) fn parse_record_id(row: &rusqlite::Row<'_>, column: usize) -> rusqlite::Result<RecordId> {
    let raw: String = row.get(column)?;
    raw.parse().map_err(|error: Error| {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn insert(&self, record: &Record) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (owner_id, id, kind, title, description, due_at, priority, completed,
                 note, created_at, updated_at, sync_status, last_sync_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                self.owner_id,
                record.id.as_str(),
                record.kind.ordinal(),
                record.title,
                record.description,
                record.due_at,
                record.priority.ordinal(),
                record.completed,
                record.note,
                record.created_at,
                record.updated_at,
                record.sync_status.ordinal(),
                record.last_sync_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, record: &Record) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE records
             SET kind = ?, title = ?, description = ?, due_at = ?, priority = ?, completed = ?,
                 note = ?, updated_at = ?, sync_status = ?, last_sync_at = ?
             WHERE owner_id = ? AND id = ?",
            params![
                record.kind.ordinal(),
                record.title,
                record.description,
                record.due_at,
                record.priority.ordinal(),
                record.completed,
                record.note,
                record.updated_at,
                record.sync_status.ordinal(),
                record.last_sync_at,
                self.owner_id,
                record.id.as_str(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(record.id.to_string()));
        }
        Ok(())
    }

    fn apply_remote(&self, record: &Record) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT INTO records (owner_id, id, kind, title, description, due_at, priority, completed,
                 note, created_at, updated_at, sync_status, last_sync_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13
             WHERE NOT EXISTS (
                 SELECT 1 FROM sync_queue
                 WHERE owner_id = ?1 AND record_id = ?2 AND operation = ?14
             )
             ON CONFLICT(owner_id, id) DO UPDATE SET
                 kind = excluded.kind,
                 title = excluded.title,
                 description = excluded.description,
                 due_at = excluded.due_at,
                 priority = excluded.priority,
                 completed = excluded.completed,
                 note = excluded.note,
                 updated_at = excluded.updated_at,
                 sync_status = excluded.sync_status,
                 last_sync_at = excluded.last_sync_at
             WHERE excluded.updated_at > records.updated_at",
            params![
                self.owner_id,
                record.id.as_str(),
                record.kind.ordinal(),
                record.title,
                record.description,
                record.due_at,
                record.priority.ordinal(),
                record.completed,
                record.note,
                record.created_at,
                record.updated_at,
                record.sync_status.ordinal(),
                record.last_sync_at,
                QueueOperation::Delete.ordinal(),
            ],
        )?;
        Ok(rows > 0)
    }

    fn apply_remote_update(&self, record: &Record) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE records
             SET kind = ?, title = ?, description = ?, due_at = ?, priority = ?, completed = ?,
                 note = ?, updated_at = ?, sync_status = ?, last_sync_at = ?
             WHERE owner_id = ? AND id = ? AND updated_at < ?",
            params![
                record.kind.ordinal(),
                record.title,
                record.description,
                record.due_at,
                record.priority.ordinal(),
                record.completed,
                record.note,
                record.updated_at,
                record.sync_status.ordinal(),
                record.last_sync_at,
                self.owner_id,
                record.id.as_str(),
                record.updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, id: &RecordId) -> Result<()> {
        let rows = self.conn.execute(
            "DELETE FROM records WHERE owner_id = ? AND id = ?",
            params![self.owner_id, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE owner_id = ? AND id = ?"),
                params![self.owner_id, id.as_str()],
                Self::parse_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<Record>> {
        self.find(&RecordFilter::default())
    }

    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE owner_id = ?");
        let mut values: Vec<Value> = vec![Value::from(self.owner_id.to_string())];

        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            values.push(Value::from(i64::from(kind.ordinal())));
        }
        if let Some(completed) = filter.completed {
            sql.push_str(" AND completed = ?");
            values.push(Value::from(completed));
        }
        if let Some(priority) = filter.priority {
            sql.push_str(" AND priority = ?");
            values.push(Value::from(i64::from(priority.ordinal())));
        }
        if let Some(status) = filter.sync_status {
            sql.push_str(" AND sync_status = ?");
            values.push(Value::from(i64::from(status.ordinal())));
        }
        if let Some(due_before) = filter.due_before {
            sql.push_str(" AND due_at IS NOT NULL AND due_at < ?");
            values.push(Value::from(due_before));
        }
        if let Some(text) = filter.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            sql.push_str(
                " AND (title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' \
                 OR COALESCE(note, '') LIKE ? ESCAPE '\\')",
            );
            let pattern = format!("%{}%", escape_like(text));
            for _ in 0..3 {
                values.push(Value::from(pattern.clone()));
            }
        }

        sql.push_str(" ORDER BY updated_at DESC, id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::from(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values), Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let pattern = format!("{}%", escape_like(prefix.trim()));
        let mut stmt = self.conn.prepare(
            "SELECT id FROM records
             WHERE owner_id = ? AND id LIKE ? ESCAPE '\\'
             ORDER BY id ASC
             LIMIT ?",
        )?;

        let ids = stmt
            .query_map(params![self.owner_id, pattern, limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    fn set_sync_status(
        &self,
        id: &RecordId,
        status: SyncStatus,
        expected_updated_at: Option<i64>,
        synced_at: Option<i64>,
    ) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE records
             SET sync_status = ?, last_sync_at = COALESCE(?, last_sync_at)
             WHERE owner_id = ? AND id = ? AND (? IS NULL OR updated_at = ?)",
            params![
                status.ordinal(),
                synced_at,
                self.owner_id,
                id.as_str(),
                expected_updated_at,
                expected_updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    fn fail_in_flight(&self) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE records SET sync_status = ? WHERE owner_id = ? AND sync_status = ?",
            params![
                SyncStatus::Failed.ordinal(),
                self.owner_id,
                SyncStatus::Syncing.ordinal()
            ],
        )?;
        Ok(rows)
    }

    fn count_by_status(&self) -> Result<Vec<(SyncStatus, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT sync_status, COUNT(*) FROM records
             WHERE owner_id = ?
             GROUP BY sync_status
             ORDER BY sync_status ASC",
        )?;

        let counts = stmt
            .query_map(params![self.owner_id], |row| {
                Ok((row.get::<_, u8>(0)?, row.get::<_, usize>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts
            .into_iter()
            .filter_map(|(ordinal, count)| SyncStatus::from_ordinal(ordinal).map(|s| (s, count)))
            .collect())
    }

    fn record_conflict(&self, conflict: &SyncConflict) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO sync_conflicts (owner_id, record_id, local_updated_at, remote_updated_at,
                 resolved_at, winner, strategy)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                self.owner_id,
                conflict.record_id.as_str(),
                conflict.local_updated_at,
                conflict.remote_updated_at,
                conflict.resolved_at,
                conflict.winner.as_str(),
                conflict.strategy,
            ],
        )?;
        Ok(rows > 0)
    }

    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_id, local_updated_at, remote_updated_at, resolved_at, winner, strategy
             FROM sync_conflicts
             WHERE owner_id = ?
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;

        let conflicts = stmt
            .query_map(params![self.owner_id, limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }
}
