//! tasknest-core - Core library for Tasknest
//!
//! This crate contains the record model, the owner-scoped local store with its
//! durable sync queue, and the offline-first sync subsystem: remote clients,
//! connectivity monitoring, the last-write-wins sync engine and the background
//! scheduler driving it.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use auth::{AuthProvider, AuthSession, SessionAuth};
pub use config::SyncConfig;
pub use connectivity::{AssumeOnline, ConnectivityMonitor, ReachabilityProbe, TcpProbe};
pub use error::{Error, Result};
pub use models::{Priority, Record, RecordFilter, RecordId, RecordKind, SyncStatus};
pub use remote::{HttpRemoteClient, MemoryRemoteClient, RemoteClient, RemoteError};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use services::{RecordStore, SyncQueue};
pub use state::{SyncState, SyncStateHandle};
pub use sync::{SkipReason, SyncEngine, SyncResult};
