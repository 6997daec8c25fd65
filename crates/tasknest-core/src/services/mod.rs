//! Services for Tasknest

mod record_store;
mod sync_queue;

pub use record_store::RecordStore;
pub use sync_queue::SyncQueue;
