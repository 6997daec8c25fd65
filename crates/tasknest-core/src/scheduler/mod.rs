//! Background sync scheduling.
//!
//! A single worker task owns every automatic pass: one at start-up when online,
//! one per periodic tick while online, one whenever connectivity comes back or
//! an owner signs in, manual requests, and the retry after a transient failure.
//! The periodic timer only exists while online.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

use crate::sync::{SyncEngine, SyncResult};

const MANUAL_REQUEST_CAPACITY: usize = 16;

/// What caused a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Startup,
    Periodic,
    ConnectivityRegained,
    OwnerChanged,
    Manual,
    Retry,
}

enum Event {
    Shutdown,
    Connectivity(bool),
    Owner(Option<String>),
    Tick,
    Retry,
    Manual(oneshot::Sender<SyncResult>),
    Closed,
}

/// Handle to a running scheduler worker.
///
/// Dropping the handle stops the worker after its current pass.
pub struct SchedulerHandle {
    requests: mpsc::Sender<oneshot::Sender<SyncResult>>,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the worker for a pass and wait for its result.
    ///
    /// Returns `None` if the worker has stopped.
    pub async fn request_sync(&self) -> Option<SyncResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests.send(reply_tx).await.ok()?;
        reply_rx.await.ok()
    }

    /// Stop the worker and wait for it to finish.
    pub async fn shutdown(self) {
        let Self {
            shutdown, worker, ..
        } = self;
        let _ = shutdown.send(());
        if let Err(error) = worker.await {
            tracing::warn!("Sync scheduler worker ended abnormally: {error}");
        }
    }
}

pub struct SyncScheduler;

impl SyncScheduler {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(engine: Arc<SyncEngine>) -> SchedulerHandle {
        let (requests, request_rx) = mpsc::channel(MANUAL_REQUEST_CAPACITY);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(run_worker(engine, request_rx, shutdown_rx));
        SchedulerHandle {
            requests,
            shutdown,
            worker,
        }
    }
}

fn periodic_timer(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn retry_elapsed(retry: Option<&mut Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

async fn run_pass(engine: &SyncEngine, trigger: Trigger) -> (SyncResult, Option<Pin<Box<Sleep>>>) {
    tracing::debug!("Sync pass triggered by {trigger:?}");
    let result = engine.sync_now().await;
    let retry = engine.retry_delay_for(&result).map(|delay| {
        tracing::debug!("Retry armed in {}s", delay.as_secs());
        Box::pin(tokio::time::sleep(delay))
    });
    (result, retry)
}

async fn run_worker(
    engine: Arc<SyncEngine>,
    mut requests: mpsc::Receiver<oneshot::Sender<SyncResult>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let period = engine.config().periodic_interval;
    let mut online_rx = engine.connectivity().subscribe();
    let mut owner_rx = engine.owner_changes();
    owner_rx.borrow_and_update();

    let mut periodic: Option<Interval> = None;
    let mut retry: Option<Pin<Box<Sleep>>> = None;

    if *online_rx.borrow_and_update() {
        periodic = Some(periodic_timer(period));
        (_, retry) = run_pass(&engine, Trigger::Startup).await;
    } else {
        tracing::info!("Sync scheduler started offline; waiting for connectivity");
    }

    loop {
        let event = tokio::select! {
            _ = &mut shutdown => Event::Shutdown,
            changed = online_rx.changed() => match changed {
                Ok(()) => Event::Connectivity(*online_rx.borrow_and_update()),
                Err(_) => Event::Closed,
            },
            changed = owner_rx.changed() => match changed {
                Ok(()) => Event::Owner(owner_rx.borrow_and_update().clone()),
                Err(_) => Event::Closed,
            },
            () = next_tick(periodic.as_mut()) => Event::Tick,
            () = retry_elapsed(retry.as_mut()) => Event::Retry,
            request = requests.recv() => match request {
                Some(reply) => Event::Manual(reply),
                None => Event::Closed,
            },
        };

        let trigger = match event {
            Event::Shutdown | Event::Closed => break,
            Event::Connectivity(true) => {
                periodic = Some(periodic_timer(period));
                Trigger::ConnectivityRegained
            }
            Event::Connectivity(false) => {
                periodic = None;
                tracing::debug!("Periodic sync suspended while offline");
                continue;
            }
            Event::Owner(Some(_)) => Trigger::OwnerChanged,
            Event::Owner(None) => {
                retry = None;
                continue;
            }
            Event::Tick => {
                tracing::debug!("Sync scheduler tick");
                Trigger::Periodic
            }
            Event::Retry => Trigger::Retry,
            Event::Manual(reply) => {
                let (result, next_retry) = run_pass(&engine, Trigger::Manual).await;
                retry = next_retry;
                let _ = reply.send(result);
                continue;
            }
        };

        (_, retry) = run_pass(&engine, trigger).await;
    }

    tracing::info!("Sync scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthSession, SessionAuth};
    use crate::config::SyncConfig;
    use crate::connectivity::ConnectivityMonitor;
    use crate::remote::{MemoryRemoteClient, RemoteError};
    use crate::services::RecordStore;

    struct Fixture {
        remote: MemoryRemoteClient,
        auth: Arc<SessionAuth>,
        monitor: ConnectivityMonitor,
        engine: Arc<SyncEngine>,
    }

    fn fixture(online: bool, auth: SessionAuth) -> Fixture {
        let auth = Arc::new(auth);
        let store = RecordStore::open_in_memory(auth.clone()).unwrap();
        let remote = MemoryRemoteClient::new();
        let monitor = ConnectivityMonitor::new(online);
        let engine = Arc::new(
            SyncEngine::new(store, Arc::new(remote.clone()), auth.clone(), monitor.clone())
                .with_config(SyncConfig::default()),
        );
        Fixture {
            remote,
            auth,
            monitor,
            engine,
        }
    }

    fn signed_in() -> SessionAuth {
        SessionAuth::signed_in("owner-1").unwrap()
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn runs_startup_pass_when_online() {
        let f = fixture(true, signed_in());
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(1).await;
        assert_eq!(f.remote.calls().fetch_all, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_passes_stop_while_offline() {
        let f = fixture(true, signed_in());
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(301).await;
        assert_eq!(f.remote.calls().fetch_all, 2);

        f.monitor.report(false);
        advance(1_200).await;
        assert_eq!(f.remote.calls().fetch_all, 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn regaining_connectivity_triggers_pass_and_rearms_timer() {
        let f = fixture(false, signed_in());
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(600).await;
        assert_eq!(f.remote.calls().fetch_all, 0);

        f.monitor.report(true);
        advance(1).await;
        assert_eq!(f.remote.calls().fetch_all, 1);

        advance(300).await;
        assert_eq!(f.remote.calls().fetch_all, 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried_once_after_delay() {
        let f = fixture(true, signed_in());
        f.remote
            .fail_next(RemoteError::Unavailable("network down".into()));
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(29).await;
        assert_eq!(f.remote.calls().fetch_all, 1);

        advance(2).await;
        assert_eq!(f.remote.calls().fetch_all, 2);

        // Retry succeeded: nothing more until the periodic tick
        advance(60).await;
        assert_eq!(f.remote.calls().fetch_all, 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_is_not_retried() {
        let f = fixture(true, signed_in());
        f.remote
            .fail_next(RemoteError::Unauthorized("revoked (401)".into()));
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(120).await;
        assert_eq!(f.remote.calls().fetch_all, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_triggers_pass() {
        let f = fixture(true, SessionAuth::new());
        let handle = SyncScheduler::spawn(f.engine.clone());

        advance(1).await;
        assert_eq!(f.remote.calls().fetch_all, 0);

        f.auth.sign_in(AuthSession::new("owner-1")).unwrap();
        advance(1).await;
        assert_eq!(f.remote.calls().fetch_all, 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_request_returns_pass_result() {
        let f = fixture(true, signed_in());
        let handle = SyncScheduler::spawn(f.engine.clone());

        let result = handle.request_sync().await.unwrap();
        assert!(result.is_success());
        assert_eq!(f.remote.calls().fetch_all, 2);
        handle.shutdown().await;
    }
}
