//! Last-write-wins reconciliation pass.

use std::cmp::Ordering as TimestampOrder;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;

use super::{SkipReason, SyncResult};
use crate::auth::AuthProvider;
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::models::{
    ConflictWinner, QueueOperation, Record, RecordId, SyncConflict, SyncQueueEntry, SyncStatus,
    STRATEGY_LWW, STRATEGY_LWW_TIE,
};
use crate::remote::{RemoteClient, RemoteError};
use crate::services::{RecordStore, SyncQueue};
use crate::state::{Activity, SyncState};
use crate::util::now_millis;

#[derive(Debug, Default, Clone, Copy)]
struct PassStats {
    uploaded: usize,
    downloaded: usize,
    conflicts: usize,
    deletes: usize,
}

/// Clears the running flag when the pass ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reconciles the local store with the remote store for the signed-in owner.
///
/// At most one pass runs at a time; a concurrent [`sync_now`](Self::sync_now)
/// returns `Skipped` immediately instead of waiting.
pub struct SyncEngine {
    store: RecordStore,
    queue: SyncQueue,
    remote: Arc<dyn RemoteClient>,
    auth: Arc<dyn AuthProvider>,
    connectivity: ConnectivityMonitor,
    running: AtomicBool,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        store: RecordStore,
        remote: Arc<dyn RemoteClient>,
        auth: Arc<dyn AuthProvider>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        Self {
            queue: store.sync_queue(),
            store,
            remote,
            auth,
            connectivity,
            running: AtomicBool::new(false),
            config: SyncConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Owner changes, for triggering a pass after sign-in.
    pub fn owner_changes(&self) -> watch::Receiver<Option<String>> {
        self.auth.subscribe()
    }

    /// Read-only view of the process-wide sync state.
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.connectivity.state().subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Delay before retrying after `result`, if it warrants a retry.
    pub const fn retry_delay_for(&self, result: &SyncResult) -> Option<Duration> {
        if result.is_transient_failure() {
            Some(self.config.retry_delay)
        } else {
            None
        }
    }

    /// Run one reconciliation pass.
    pub async fn sync_now(&self) -> SyncResult {
        if !self.connectivity.is_online() {
            tracing::debug!("Sync skipped: offline");
            return SyncResult::Skipped {
                reason: SkipReason::Offline,
            };
        }
        let Some(owner) = self.auth.current_owner_id() else {
            tracing::debug!("Sync skipped: no authenticated owner");
            return SyncResult::NoAuth;
        };
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::debug!("Sync skipped: pass already running");
            return SyncResult::Skipped {
                reason: SkipReason::AlreadyRunning,
            };
        };

        let state = self.connectivity.state();
        state.set_activity(Activity::Syncing);
        let started = Instant::now();

        let entries = match self
            .queue
            .peek_pending_for(&owner, self.config.queue_batch_limit)
            .await
        {
            Ok(entries) => entries,
            Err(error) => {
                tracing::error!("Sync failed reading the queue: {error}");
                state.finish_pass(None);
                return SyncResult::Failed {
                    error: error.to_string(),
                    transient: false,
                };
            }
        };

        let outcome = match tokio::time::timeout(
            self.config.pass_timeout,
            self.run_pass(&owner, &entries),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Remote(RemoteError::DeadlineExceeded(format!(
                "sync pass exceeded {}s",
                self.config.pass_timeout.as_secs()
            )))),
        };

        match outcome {
            Ok(stats) => {
                let settled = self.settle_success(&owner, &entries).await;
                state.finish_pass(Some(Utc::now()));
                tracing::info!(
                    "Sync completed in {}ms: uploaded {}, downloaded {}, conflicts {}, deletes {}, queue entries settled {}",
                    started.elapsed().as_millis(),
                    stats.uploaded,
                    stats.downloaded,
                    stats.conflicts,
                    stats.deletes,
                    settled
                );
                SyncResult::Success {
                    uploaded: stats.uploaded,
                    downloaded: stats.downloaded,
                    conflicts: stats.conflicts,
                }
            }
            Err(error) => {
                let transient = error.is_transient();
                let dropped = self.settle_failure(&owner, &entries).await;
                state.finish_pass(None);
                if transient {
                    tracing::warn!(
                        "Sync failed transiently, retry in {}s: {error} (queue entries dropped: {dropped})",
                        self.config.retry_delay.as_secs()
                    );
                } else {
                    tracing::error!("Sync failed: {error} (queue entries dropped: {dropped})");
                }
                SyncResult::Failed {
                    error: error.to_string(),
                    transient,
                }
            }
        }
    }

    async fn run_pass(&self, owner: &str, entries: &[SyncQueueEntry]) -> Result<PassStats> {
        let mut stats = PassStats::default();

        // A full diff cannot tell a local delete from a remote insert
        for entry in entries
            .iter()
            .filter(|entry| entry.operation == QueueOperation::Delete)
        {
            self.remote.delete(owner, &entry.record_id).await?;
            tracing::debug!("Replayed delete of {}", entry.record_id);
            stats.deletes += 1;
        }

        let local = self.store.get_all_for(owner).await?;
        let mut remote: HashMap<RecordId, Record> = self
            .remote
            .fetch_all(owner)
            .await?
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();

        for local_record in local {
            let Some(remote_record) = remote.remove(&local_record.id) else {
                tracing::debug!("Uploading new record {}", local_record.id);
                self.upload(owner, &local_record).await?;
                stats.uploaded += 1;
                continue;
            };

            match local_record.updated_at.cmp(&remote_record.updated_at) {
                TimestampOrder::Greater => {
                    tracing::debug!(
                        "Local copy of {} is newer ({} > {}), uploading",
                        local_record.id,
                        local_record.updated_at,
                        remote_record.updated_at
                    );
                    self.upload(owner, &local_record).await?;
                    self.log_conflict(
                        owner,
                        &local_record,
                        &remote_record,
                        ConflictWinner::Local,
                        STRATEGY_LWW,
                    )
                    .await?;
                    stats.uploaded += 1;
                    stats.conflicts += 1;
                }
                TimestampOrder::Less => {
                    tracing::debug!(
                        "Remote copy of {} is newer ({} > {}), downloading",
                        remote_record.id,
                        remote_record.updated_at,
                        local_record.updated_at
                    );
                    if self.download_newer(owner, &remote_record).await? {
                        self.log_conflict(
                            owner,
                            &local_record,
                            &remote_record,
                            ConflictWinner::Remote,
                            STRATEGY_LWW,
                        )
                        .await?;
                        stats.downloaded += 1;
                        stats.conflicts += 1;
                    }
                }
                TimestampOrder::Equal => {
                    self.reconcile_tie(owner, &local_record, &remote_record)
                        .await?;
                }
            }
        }

        for remote_record in remote.into_values() {
            tracing::debug!("Downloading new record {}", remote_record.id);
            if self.download(owner, &remote_record).await? {
                stats.downloaded += 1;
            }
        }

        Ok(stats)
    }

    async fn upload(&self, owner: &str, record: &Record) -> Result<()> {
        self.store.mark_syncing(owner, &record.id).await?;
        self.remote.upsert(owner, record).await?;
        if !self
            .store
            .mark_synced(owner, &record.id, record.updated_at)
            .await?
        {
            tracing::debug!("{} changed during upload; left for the next pass", record.id);
        }
        Ok(())
    }

    /// Store a remote-only record; `false` when it was deleted or created locally meanwhile.
    async fn download(&self, owner: &str, record: &Record) -> Result<bool> {
        let applied = self.store.apply_remote(owner, record).await?;
        if !applied {
            tracing::debug!("Skipped download of {}: changed locally during the pass", record.id);
        }
        Ok(applied)
    }

    /// Replace a local record with its newer remote copy; `false` when the
    /// local row was edited or deleted meanwhile.
    async fn download_newer(&self, owner: &str, record: &Record) -> Result<bool> {
        let applied = self.store.apply_remote_update(owner, record).await?;
        if !applied {
            tracing::debug!("Kept local state of {}: changed during the pass", record.id);
        }
        Ok(applied)
    }

    async fn reconcile_tie(&self, owner: &str, local: &Record, remote: &Record) -> Result<()> {
        if local.same_content(remote) {
            if local.sync_status != SyncStatus::Synced {
                self.store
                    .mark_synced(owner, &local.id, local.updated_at)
                    .await?;
            }
            return Ok(());
        }

        let first_seen = self
            .log_conflict(owner, local, remote, ConflictWinner::None, STRATEGY_LWW_TIE)
            .await?;
        if first_seen {
            tracing::warn!(
                "Record {} differs from remote copy at identical timestamp {}; left unchanged",
                local.id,
                local.updated_at
            );
        } else {
            tracing::debug!("Record {} still tied with remote copy", local.id);
        }

        // Unresolvable until one side is edited again
        if local.sync_status != SyncStatus::Failed {
            self.store
                .mark_failed(owner, &local.id, local.updated_at)
                .await?;
        }
        Ok(())
    }

    async fn log_conflict(
        &self,
        owner: &str,
        local: &Record,
        remote: &Record,
        winner: ConflictWinner,
        strategy: &str,
    ) -> Result<bool> {
        let conflict = SyncConflict {
            id: 0,
            record_id: local.id.clone(),
            local_updated_at: local.updated_at,
            remote_updated_at: remote.updated_at,
            resolved_at: now_millis(),
            winner,
            strategy: strategy.to_string(),
        };
        self.store.record_conflict(owner, &conflict).await
    }

    async fn settle_success(&self, owner: &str, entries: &[SyncQueueEntry]) -> usize {
        let mut settled = 0;
        for entry in entries {
            match self.queue.remove_for(owner, entry.id).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::error!("Failed to settle queue entry {}: {error}", entry.id);
                }
            }
        }
        settled
    }

    /// Charge a failed attempt to every peeked entry, dropping exhausted ones.
    async fn settle_failure(&self, owner: &str, entries: &[SyncQueueEntry]) -> usize {
        match self.store.fail_in_flight(owner).await {
            Ok(0) => {}
            Ok(count) => tracing::debug!("Marked {count} in-flight records as failed"),
            Err(error) => tracing::error!("Failed to mark in-flight records as failed: {error}"),
        }

        let mut dropped = 0;
        for entry in entries {
            let attempts = match self.queue.increment_attempt_for(owner, entry.id).await {
                Ok(attempts) => attempts,
                Err(error) => {
                    tracing::error!("Failed to count attempt for queue entry {}: {error}", entry.id);
                    continue;
                }
            };
            if attempts < self.config.max_queue_attempts {
                continue;
            }

            match self.queue.remove_for(owner, entry.id).await {
                Ok(_) => {
                    dropped += 1;
                    tracing::warn!(
                        "Dropped queue entry {} ({} of {}) after {attempts} failed attempts; the change may never reach the remote",
                        entry.id,
                        entry.operation,
                        entry.record_id
                    );
                }
                Err(error) => {
                    tracing::error!("Failed to drop queue entry {}: {error}", entry.id);
                }
            }
        }
        dropped
    }
}
