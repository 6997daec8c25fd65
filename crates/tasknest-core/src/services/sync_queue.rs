//! Owner-scoped view of the durable pending-mutation log.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::db::{Database, SqliteSyncQueueRepository, SyncQueueRepository};
use crate::error::{Error, Result};
use crate::models::{NewQueueEntry, SyncQueueEntry};

/// Dumb durable log of pending mutations.
///
/// Entries are only appended, peeked, removed, or have their attempt counter
/// bumped. Deciding when an entry has failed too often is up to the caller.
#[derive(Clone)]
pub struct SyncQueue {
    db: Arc<Mutex<Database>>,
    auth: Arc<dyn AuthProvider>,
}

impl SyncQueue {
    pub(crate) fn new(db: Arc<Mutex<Database>>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { db, auth }
    }

    fn owner(&self) -> Result<String> {
        self.auth.current_owner_id().ok_or(Error::Unauthenticated)
    }

    pub async fn enqueue(&self, entry: &NewQueueEntry) -> Result<i64> {
        let owner = self.owner()?;
        self.enqueue_for(&owner, entry).await
    }

    /// Oldest entries first, at most `limit`.
    pub async fn peek_pending(&self, limit: usize) -> Result<Vec<SyncQueueEntry>> {
        let owner = self.owner()?;
        self.peek_pending_for(&owner, limit).await
    }

    /// Remove an entry whose mutation the remote has confirmed.
    pub async fn mark_completed(&self, entry_id: i64) -> Result<bool> {
        let owner = self.owner()?;
        self.remove_for(&owner, entry_id).await
    }

    /// Bump the attempt counter and return the new count.
    pub async fn increment_attempt(&self, entry_id: i64) -> Result<u32> {
        let owner = self.owner()?;
        self.increment_attempt_for(&owner, entry_id).await
    }

    /// Remove an entry regardless of outcome.
    pub async fn remove(&self, entry_id: i64) -> Result<bool> {
        let owner = self.owner()?;
        self.remove_for(&owner, entry_id).await
    }

    pub async fn len(&self) -> Result<usize> {
        let owner = self.owner()?;
        let db = self.db.lock().await;
        SqliteSyncQueueRepository::new(db.connection(), &owner).len()
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn enqueue_for(&self, owner: &str, entry: &NewQueueEntry) -> Result<i64> {
        let db = self.db.lock().await;
        SqliteSyncQueueRepository::new(db.connection(), owner).enqueue(entry)
    }

    pub(crate) async fn peek_pending_for(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<SyncQueueEntry>> {
        let db = self.db.lock().await;
        SqliteSyncQueueRepository::new(db.connection(), owner).peek_pending(limit)
    }

    pub(crate) async fn remove_for(&self, owner: &str, entry_id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        SqliteSyncQueueRepository::new(db.connection(), owner).mark_completed(entry_id)
    }

    pub(crate) async fn increment_attempt_for(&self, owner: &str, entry_id: i64) -> Result<u32> {
        let db = self.db.lock().await;
        SqliteSyncQueueRepository::new(db.connection(), owner)
            .increment_attempt(entry_id)?
            .ok_or_else(|| Error::NotFound(format!("queue entry {entry_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionAuth;
    use crate::models::{QueueOperation, RecordId};
    use crate::services::RecordStore;

    fn queue_for(owner: &str) -> SyncQueue {
        let auth = Arc::new(SessionAuth::signed_in(owner).unwrap());
        RecordStore::open_in_memory(auth).unwrap().sync_queue()
    }

    #[tokio::test]
    async fn peek_returns_oldest_first() {
        let queue = queue_for("owner-1");
        let first = RecordId::new();
        let second = RecordId::new();
        let mut early = NewQueueEntry::for_record(first.clone(), QueueOperation::Insert, "{}".into());
        early.created_at -= 1_000;
        queue
            .enqueue(&NewQueueEntry::for_record(second, QueueOperation::Update, "{}".into()))
            .await
            .unwrap();
        queue.enqueue(&early).await.unwrap();

        let pending = queue.peek_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].record_id, first);
        assert_eq!(queue.peek_pending(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attempts_and_completion() {
        let queue = queue_for("owner-1");
        let id = queue
            .enqueue(&NewQueueEntry::for_record(
                RecordId::new(),
                QueueOperation::Delete,
                String::new(),
            ))
            .await
            .unwrap();

        assert_eq!(queue.increment_attempt(id).await.unwrap(), 1);
        assert_eq!(queue.increment_attempt(id).await.unwrap(), 2);
        assert!(queue.mark_completed(id).await.unwrap());
        assert!(queue.is_empty().await.unwrap());
        assert!(matches!(
            queue.increment_attempt(id).await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(!queue.remove(id).await.unwrap());
    }
}
