//! In-process remote store.
//!
//! Useful for embedding the engine without a server and for exercising sync
//! behavior in tests: it can inject latency and queued failures.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{RemoteClient, RemoteError};
use crate::models::{Record, RecordId, SyncStatus};

/// Number of calls served, including failed ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCallCounts {
    pub fetch_all: usize,
    pub upsert: usize,
    pub delete: usize,
}

#[derive(Default)]
struct MemoryRemoteState {
    owners: HashMap<String, BTreeMap<RecordId, Record>>,
    failures: VecDeque<RemoteError>,
    latency: Duration,
    calls: RemoteCallCounts,
}

#[derive(Clone, Default)]
pub struct MemoryRemoteClient {
    state: Arc<Mutex<MemoryRemoteState>>,
}

impl MemoryRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRemoteState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store a record directly, bypassing failure injection
    pub fn put(&self, owner_id: &str, record: &Record) {
        self.lock()
            .owners
            .entry(owner_id.to_string())
            .or_default()
            .insert(record.id.clone(), as_remote_copy(record));
    }

    pub fn get(&self, owner_id: &str, id: &RecordId) -> Option<Record> {
        self.lock()
            .owners
            .get(owner_id)
            .and_then(|records| records.get(id).cloned())
    }

    pub fn records(&self, owner_id: &str) -> Vec<Record> {
        self.lock()
            .owners
            .get(owner_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    /// Fail the next `count` calls with `error`
    pub fn fail_next_n(&self, count: usize, error: &RemoteError) {
        let mut state = self.lock();
        for _ in 0..count {
            state.failures.push_back(error.clone());
        }
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn calls(&self) -> RemoteCallCounts {
        self.lock().calls
    }

    async fn begin_call(&self, count: impl FnOnce(&mut RemoteCallCounts)) -> Result<(), RemoteError> {
        let latency = {
            let mut state = self.lock();
            count(&mut state.calls);
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.lock().failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn as_remote_copy(record: &Record) -> Record {
    Record {
        sync_status: SyncStatus::Synced,
        last_sync_at: None,
        ..record.clone()
    }
}

#[async_trait]
impl RemoteClient for MemoryRemoteClient {
    async fn fetch_all(&self, owner_id: &str) -> Result<Vec<Record>, RemoteError> {
        self.begin_call(|calls| calls.fetch_all += 1).await?;
        Ok(self.records(owner_id))
    }

    async fn upsert(&self, owner_id: &str, record: &Record) -> Result<(), RemoteError> {
        self.begin_call(|calls| calls.upsert += 1).await?;
        self.put(owner_id, record);
        Ok(())
    }

    async fn delete(&self, owner_id: &str, id: &RecordId) -> Result<(), RemoteError> {
        self.begin_call(|calls| calls.delete += 1).await?;
        if let Some(records) = self.lock().owners.get_mut(owner_id) {
            records.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_are_owner_scoped() {
        let remote = MemoryRemoteClient::new();
        let record = Record::task("remote");
        remote.upsert("alice", &record).await.unwrap();

        assert_eq!(remote.fetch_all("alice").await.unwrap().len(), 1);
        assert!(remote.fetch_all("bob").await.unwrap().is_empty());
        assert_eq!(
            remote.get("alice", &record.id).unwrap().sync_status,
            SyncStatus::Synced
        );
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let remote = MemoryRemoteClient::new();
        remote.fail_next(RemoteError::Unavailable("offline".into()));

        assert!(remote.fetch_all("alice").await.is_err());
        assert!(remote.fetch_all("alice").await.is_ok());
        assert_eq!(remote.calls().fetch_all, 2);
    }

    #[tokio::test]
    async fn delete_of_missing_record_succeeds() {
        let remote = MemoryRemoteClient::new();
        remote.delete("alice", &RecordId::new()).await.unwrap();
        assert_eq!(remote.calls().delete, 1);
    }
}
