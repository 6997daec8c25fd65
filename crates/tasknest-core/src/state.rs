//! Process-wide sync state shared with observers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Network reachability as last reported by the connectivity monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Whether a reconciliation pass is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Syncing,
}

/// Subsystem-wide sync state, as shown by a status indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncState {
    pub connectivity: Connectivity,
    pub activity: Activity,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl SyncState {
    pub const fn is_online(&self) -> bool {
        matches!(self.connectivity, Connectivity::Online)
    }

    pub const fn is_syncing(&self) -> bool {
        matches!(self.activity, Activity::Syncing)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Online,
            activity: Activity::Idle,
            last_sync_time: None,
        }
    }
}

/// Write side of [`SyncState`].
///
/// Held only by the connectivity monitor and the sync engine; everyone else gets
/// a receiver from [`SyncStateHandle::subscribe`].
#[derive(Clone, Debug)]
pub struct SyncStateHandle {
    tx: Arc<watch::Sender<SyncState>>,
}

impl SyncStateHandle {
    pub fn new(initial: SyncState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Read-only view for observers.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SyncState {
        *self.tx.borrow()
    }

    pub(crate) fn set_connectivity(&self, connectivity: Connectivity) {
        self.tx.send_if_modified(|state| {
            let changed = state.connectivity != connectivity;
            state.connectivity = connectivity;
            changed
        });
    }

    pub(crate) fn set_activity(&self, activity: Activity) {
        self.tx.send_if_modified(|state| {
            let changed = state.activity != activity;
            state.activity = activity;
            changed
        });
    }

    pub(crate) fn finish_pass(&self, synced_at: Option<DateTime<Utc>>) {
        self.tx.send_modify(|state| {
            state.activity = Activity::Idle;
            if synced_at.is_some() {
                state.last_sync_time = synced_at;
            }
        });
    }
}

impl Default for SyncStateHandle {
    fn default() -> Self {
        Self::new(SyncState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_pass_keeps_previous_sync_time_on_failure() {
        let handle = SyncStateHandle::default();
        let now = Utc::now();

        handle.set_activity(Activity::Syncing);
        handle.finish_pass(Some(now));
        handle.set_activity(Activity::Syncing);
        handle.finish_pass(None);

        let state = handle.snapshot();
        assert_eq!(state.activity, Activity::Idle);
        assert_eq!(state.last_sync_time, Some(now));
    }

    #[test]
    fn subscribers_observe_connectivity_changes() {
        let handle = SyncStateHandle::default();
        let mut rx = handle.subscribe();
        rx.mark_unchanged();

        handle.set_connectivity(Connectivity::Online);
        assert!(!rx.has_changed().unwrap());

        handle.set_connectivity(Connectivity::Offline);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_online());
    }
}
