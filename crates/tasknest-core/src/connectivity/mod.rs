//! Network reachability tracking.
//!
//! [`ConnectivityMonitor`] holds the current online flag and publishes
//! transitions to subscribers (the scheduler reacts to them). A background
//! probe task can drive it from a [`ReachabilityProbe`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::{Connectivity, SyncState, SyncStateHandle};

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

/// Platform reachability signal.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `Some(reachable)`, or `None` when this platform cannot tell.
    async fn is_reachable(&self) -> Option<bool>;
}

/// Probe for platforms without a reachability signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeOnline;

#[async_trait]
impl ReachabilityProbe for AssumeOnline {
    async fn is_reachable(&self) -> Option<bool> {
        None
    }
}

/// Treats a successful TCP connect to `addr` as being online.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    /// `addr` is `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self) -> Option<bool> {
        let addr = self.addr.trim();
        if addr.is_empty() {
            return None;
        }

        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Some(true),
            Ok(Err(error)) => {
                tracing::debug!("Reachability probe to {addr} failed: {error}");
                Some(false)
            }
            Err(_) => {
                tracing::debug!("Reachability probe to {addr} timed out");
                Some(false)
            }
        }
    }
}

/// Current online flag plus a transition stream.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    online_tx: Arc<watch::Sender<bool>>,
    state: SyncStateHandle,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let connectivity = if initially_online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        };
        let state = SyncStateHandle::new(SyncState {
            connectivity,
            ..SyncState::default()
        });
        let (online_tx, _online_rx) = watch::channel(initially_online);
        Self {
            online_tx: Arc::new(online_tx),
            state,
        }
    }

    /// Record the latest reachability reading.
    ///
    /// Returns whether this was a transition.
    pub fn report(&self, online: bool) -> bool {
        let changed = self.online_tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            self.state.set_connectivity(if online {
                Connectivity::Online
            } else {
                Connectivity::Offline
            });
            if online {
                tracing::info!("Connectivity regained");
            } else {
                tracing::info!("Connectivity lost");
            }
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        *self.online_tx.borrow()
    }

    /// Online/offline transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }

    /// Shared sync state this monitor publishes connectivity into.
    pub const fn state(&self) -> &SyncStateHandle {
        &self.state
    }

    /// Poll `probe` every `interval` until the returned task is aborted.
    ///
    /// A probe answering `None` counts as online.
    pub fn spawn_probe(
        &self,
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                let online = probe.is_reachable().await.unwrap_or(true);
                monitor.report(online);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::TcpListener;

    struct Toggle(AtomicBool);

    #[async_trait]
    impl ReachabilityProbe for Toggle {
        async fn is_reachable(&self) -> Option<bool> {
            Some(self.0.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn report_only_signals_transitions() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(!monitor.report(true));
        assert!(monitor.report(false));
        assert!(!monitor.is_online());
        assert!(!monitor.state().snapshot().is_online());
        assert!(monitor.report(true));
        assert!(monitor.state().snapshot().is_online());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.report(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_task_drives_monitor() {
        let monitor = ConnectivityMonitor::new(true);
        let probe = Arc::new(Toggle(AtomicBool::new(false)));
        let task = monitor.spawn_probe(probe.clone(), Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!monitor.is_online());

        probe.0.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(monitor.is_online());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_reachability_counts_as_online() {
        let monitor = ConnectivityMonitor::new(false);
        let task = monitor.spawn_probe(Arc::new(AssumeOnline), Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(monitor.is_online());
        task.abort();
    }

    #[tokio::test]
    async fn tcp_probe_reports_listener_reachability() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        assert_eq!(TcpProbe::new(addr.clone()).is_reachable().await, Some(true));
        drop(listener);
        assert_eq!(TcpProbe::new("").is_reachable().await, None);
    }
}
