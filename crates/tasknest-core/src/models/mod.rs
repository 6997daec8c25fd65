//! Data models for Tasknest

mod filter;
mod queue;
mod record;
mod sync_conflict;

pub use filter::RecordFilter;
pub use queue::{NewQueueEntry, QueueOperation, SyncQueueEntry, RECORDS_TABLE};
pub use record::{Priority, Record, RecordId, RecordKind, SyncStatus};
pub use sync_conflict::{ConflictWinner, SyncConflict, STRATEGY_LWW, STRATEGY_LWW_TIE};
