//! Owner-scoped record store shared by callers and the sync engine.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::db::{
    Database, RecordRepository, SqliteRecordRepository, SqliteSyncQueueRepository,
    SyncQueueRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    NewQueueEntry, QueueOperation, Record, RecordFilter, RecordId, SyncConflict, SyncStatus,
};
use crate::remote::WireRecord;
use crate::util::now_millis;

use super::SyncQueue;

/// Thread-safe, owner-scoped access to records.
///
/// All writes go through one connection guarded by an async mutex, so local
/// mutations and remote-origin downloads never interleave.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Mutex<Database>>,
    auth: Arc<dyn AuthProvider>,
}

impl RecordStore {
    /// Open a record store at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        tracing::debug!("Opened record store at {}", db_path.display());
        Ok(Self::from_database(db, auth))
    }

    /// Open an in-memory record store (primarily for tests).
    pub fn open_in_memory(auth: Arc<dyn AuthProvider>) -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?, auth))
    }

    fn from_database(db: Database, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            auth,
        }
    }

    /// Queue view over the same database and owner scope.
    pub fn sync_queue(&self) -> SyncQueue {
        SyncQueue::new(self.db.clone(), self.auth.clone())
    }

    fn owner(&self) -> Result<String> {
        self.auth.current_owner_id().ok_or(Error::Unauthenticated)
    }

    /// Insert a new record.
    ///
    /// With `sync_needed` the record is stored as `NeedsSync` and an insert entry
    /// is queued in the same transaction; without it the record is treated as a
    /// remote-origin copy and stored as `Synced`.
    pub async fn insert(&self, record: &Record, sync_needed: bool) -> Result<Record> {
        validate_timestamps(record)?;
        let owner = self.owner()?;
        let stored = mark_for_write(record, sync_needed);

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        SqliteRecordRepository::new(&tx, &owner).insert(&stored)?;
        if sync_needed {
            SqliteSyncQueueRepository::new(&tx, &owner).enqueue(&NewQueueEntry::for_record(
                stored.id.clone(),
                QueueOperation::Insert,
                payload_for(&stored)?,
            ))?;
        }
        tx.commit()?;

        Ok(stored)
    }

    /// Update an existing record.
    ///
    /// With `sync_needed` this is a local edit: `updated_at` must not go
    /// backwards and an update entry is queued atomically. Without it the record
    /// is a remote-origin copy and is only applied when newer than the stored
    /// row; the returned record is whatever is stored afterwards.
    pub async fn update(&self, record: &Record, sync_needed: bool) -> Result<Record> {
        validate_timestamps(record)?;
        let owner = self.owner()?;

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        let stored = {
            let repo = SqliteRecordRepository::new(&tx, &owner);
            let existing = repo
                .get(&record.id)?
                .ok_or_else(|| Error::NotFound(record.id.to_string()))?;

            if sync_needed {
                if record.updated_at < existing.updated_at {
                    return Err(Error::InvalidInput(format!(
                        "update of {} would move updated_at backwards",
                        record.id
                    )));
                }
                let stored = Record {
                    created_at: existing.created_at,
                    ..mark_for_write(record, true)
                };
                repo.update(&stored)?;
                SqliteSyncQueueRepository::new(&tx, &owner).enqueue(
                    &NewQueueEntry::for_record(
                        stored.id.clone(),
                        QueueOperation::Update,
                        payload_for(&stored)?,
                    ),
                )?;
                stored
            } else {
                let incoming = mark_for_write(record, false);
                if repo.apply_remote_update(&incoming)? {
                    Record {
                        created_at: existing.created_at,
                        ..incoming
                    }
                } else {
                    tracing::debug!(
                        "Kept local copy of {}: stored updated_at {} >= incoming {}",
                        record.id,
                        existing.updated_at,
                        record.updated_at
                    );
                    existing
                }
            }
        };
        tx.commit()?;

        Ok(stored)
    }

    /// Delete a record, queueing a delete entry when `sync_needed`.
    pub async fn delete(&self, id: &RecordId, sync_needed: bool) -> Result<()> {
        let owner = self.owner()?;

        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        SqliteRecordRepository::new(&tx, &owner).delete(id)?;
        if sync_needed {
            SqliteSyncQueueRepository::new(&tx, &owner).enqueue(&NewQueueEntry::for_record(
                id.clone(),
                QueueOperation::Delete,
                String::new(),
            ))?;
        }
        tx.commit()?;

        Ok(())
    }

    /// All records of the current owner, most recently updated first.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).list_all()
    }

    /// Fetch a record by id.
    pub async fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).get(id)
    }

    /// Records matching `filter`, most recently updated first.
    pub async fn get_by_criteria(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).find(filter)
    }

    /// IDs starting with `prefix` (for short-id lookups).
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).list_ids_by_prefix(prefix, limit)
    }

    /// Record counts per sync status (statuses with no records are omitted).
    pub async fn count_by_status(&self) -> Result<Vec<(SyncStatus, usize)>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).count_by_status()
    }

    /// Most recent conflict resolutions.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), &owner).list_conflicts(limit)
    }

    pub(crate) async fn mark_syncing(&self, owner: &str, id: &RecordId) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).set_sync_status(
            id,
            SyncStatus::Syncing,
            None,
            None,
        )
    }

    /// Mark an uploaded record as synced unless it was edited during the upload.
    pub(crate) async fn mark_synced(
        &self,
        owner: &str,
        id: &RecordId,
        uploaded_updated_at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = SqliteRecordRepository::new(db.connection(), owner);
        let synced = repo.set_sync_status(
            id,
            SyncStatus::Synced,
            Some(uploaded_updated_at),
            Some(now_millis()),
        )?;
        if !synced {
            // Edited mid-upload: the newer edit still needs its own upload
            repo.set_sync_status(id, SyncStatus::NeedsSync, None, None)?;
        }
        Ok(synced)
    }

    pub(crate) async fn fail_in_flight(&self, owner: &str) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).fail_in_flight()
    }

    /// Store a remote record that was absent locally, unless a local delete is pending.
    pub(crate) async fn apply_remote(&self, owner: &str, record: &Record) -> Result<bool> {
        let incoming = mark_for_write(record, false);
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).apply_remote(&incoming)
    }

    /// Overwrite a local record with a newer remote copy; a deleted row stays deleted.
    pub(crate) async fn apply_remote_update(&self, owner: &str, record: &Record) -> Result<bool> {
        let incoming = mark_for_write(record, false);
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).apply_remote_update(&incoming)
    }

    /// Mark a record `Failed` unless it was edited since `updated_at`.
    pub(crate) async fn mark_failed(
        &self,
        owner: &str,
        id: &RecordId,
        updated_at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).set_sync_status(
            id,
            SyncStatus::Failed,
            Some(updated_at),
            None,
        )
    }

    pub(crate) async fn record_conflict(&self, owner: &str, conflict: &SyncConflict) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).record_conflict(conflict)
    }

    pub(crate) async fn get_all_for(&self, owner: &str) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        SqliteRecordRepository::new(db.connection(), owner).list_all()
    }
}

fn validate_timestamps(record: &Record) -> Result<()> {
    if record.has_valid_timestamps() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "record {} has updated_at before created_at",
            record.id
        )))
    }
}

fn mark_for_write(record: &Record, sync_needed: bool) -> Record {
    let mut stored = record.clone();
    if sync_needed {
        stored.sync_status = SyncStatus::NeedsSync;
    } else {
        stored.sync_status = SyncStatus::Synced;
        stored.last_sync_at = Some(now_millis());
    }
    stored
}

fn payload_for(record: &Record) -> Result<String> {
    let wire =
        WireRecord::try_from(record).map_err(|error| Error::InvalidInput(error.to_string()))?;
    Ok(serde_json::to_string(&wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionAuth;
    use crate::models::Priority;

    fn signed_in_store() -> RecordStore {
        let auth = Arc::new(SessionAuth::signed_in("owner-1").unwrap());
        RecordStore::open_in_memory(auth).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_with_sync_writes_record_and_queue_entry() {
        let store = signed_in_store();
        let queue = store.sync_queue();

        let record = Record::task("Plan trip");
        let stored = store.insert(&record, true).await.unwrap();
        assert_eq!(stored.sync_status, SyncStatus::NeedsSync);

        let pending = queue.peek_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, QueueOperation::Insert);
        assert_eq!(pending[0].record_id, record.id);

        let payload: WireRecord = serde_json::from_str(&pending[0].payload).unwrap();
        assert_eq!(payload.title, "Plan trip");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_without_sync_marks_synced_and_skips_queue() {
        let store = signed_in_store();

        let stored = store.insert(&Record::task("From remote"), false).await.unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert!(stored.last_sync_at.is_some());
        assert_eq!(store.sync_queue().len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_insert_leaves_no_queue_entry() {
        let store = signed_in_store();
        let record = Record::task("Once");
        store.insert(&record, true).await.unwrap();

        assert!(store.insert(&record, true).await.is_err());
        assert_eq!(store.sync_queue().len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn operations_without_owner_are_unauthenticated() {
        let store = RecordStore::open_in_memory(Arc::new(SessionAuth::new())).unwrap();

        let error = store.insert(&Record::task("x"), true).await.unwrap_err();
        assert!(matches!(error, Error::Unauthenticated));
        assert!(matches!(
            store.get_all().await.unwrap_err(),
            Error::Unauthenticated
        ));
        assert!(matches!(
            store.sync_queue().len().await.unwrap_err(),
            Error::Unauthenticated
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_update_queues_entry_and_keeps_created_at() {
        let store = signed_in_store();
        let record = store.insert(&Record::task("Draft"), true).await.unwrap();

        let mut edited = record.clone();
        edited.title = "Final".to_string();
        edited.priority = Priority::High;
        edited.created_at = record.created_at - 1;
        edited.touch();
        let stored = store.update(&edited, true).await.unwrap();

        assert_eq!(stored.created_at, record.created_at);
        assert_eq!(stored.title, "Final");
        let pending = store.sync_queue().peek_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].operation, QueueOperation::Update);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_update_rejects_backwards_timestamp() {
        let store = signed_in_store();
        let mut record = Record::task("Clocked");
        record.updated_at += 1_000;
        store.insert(&record, true).await.unwrap();

        let mut stale = record.clone();
        stale.updated_at -= 500;
        let error = store.update(&stale, true).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_update_never_overwrites_newer_local_copy() {
        let store = signed_in_store();
        let mut local = Record::task("Local");
        local.updated_at += 10_000;
        store.insert(&local, true).await.unwrap();

        let mut remote = local.clone();
        remote.title = "Old remote".to_string();
        remote.updated_at -= 5_000;
        let stored = store.update(&remote, false).await.unwrap();
        assert_eq!(stored.title, "Local");
        assert_eq!(stored.sync_status, SyncStatus::NeedsSync);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_queues_entry_without_payload() {
        let store = signed_in_store();
        let record = store.insert(&Record::task("Gone"), true).await.unwrap();

        store.delete(&record.id, true).await.unwrap();
        assert!(store.get_by_id(&record.id).await.unwrap().is_none());

        let pending = store.sync_queue().peek_pending(10).await.unwrap();
        assert_eq!(pending.last().unwrap().operation, QueueOperation::Delete);
        assert!(pending.last().unwrap().payload.is_empty());

        assert!(matches!(
            store.delete(&record.id, true).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_timestamps_are_rejected() {
        let store = signed_in_store();
        let mut record = Record::task("Backwards");
        record.updated_at = record.created_at - 1;
        assert!(matches!(
            store.insert(&record, true).await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unrepresentable_due_date_is_rejected_before_queueing() {
        let store = signed_in_store();
        let mut record = Record::task("Someday");
        record.due_at = Some(i64::MAX);

        assert!(matches!(
            store.insert(&record, true).await.unwrap_err(),
            Error::InvalidInput(message) if message.contains("dueAt")
        ));
        assert!(store.get_by_id(&record.id).await.unwrap().is_none());
        assert_eq!(store.sync_queue().len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mark_synced_detects_mid_upload_edit() {
        let store = signed_in_store();
        let record = store.insert(&Record::task("Racing"), true).await.unwrap();

        let mut edited = record.clone();
        edited.touch();
        store.update(&edited, true).await.unwrap();

        assert!(!store
            .mark_synced("owner-1", &record.id, record.updated_at)
            .await
            .unwrap());
        let stored = store.get_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::NeedsSync);
    }
}
