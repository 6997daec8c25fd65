//! Database layer for Tasknest

mod connection;
mod migrations;
mod queue_repository;
mod repository;

pub use connection::Database;
pub use queue_repository::{SqliteSyncQueueRepository, SyncQueueRepository};
pub use repository::{RecordRepository, SqliteRecordRepository};
