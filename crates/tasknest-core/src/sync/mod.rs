//! Reconciliation between the local record store and the remote store.
//!
//! [`SyncEngine::sync_now`] runs one last-write-wins pass and reports the
//! outcome as a [`SyncResult`]; it never returns an error or panics on remote
//! failure. Scheduling passes is the job of [`crate::scheduler`].

mod engine;


use std::fmt;

pub use engine::SyncEngine;

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::AlreadyRunning => write!(f, "another sync is already running"),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Skipped {
        reason: SkipReason,
    },
    /// No authenticated owner
    NoAuth,
    Success {
        uploaded: usize,
        downloaded: usize,
        conflicts: usize,
    },
    Failed {
        error: String,
        transient: bool,
    },
}

impl SyncResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failed in a way worth retrying after a delay
    pub const fn is_transient_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                transient: true,
                ..
            }
        )
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::NoAuth => write!(f, "not signed in"),
            Self::Success {
                uploaded,
                downloaded,
                conflicts,
            } => write!(
                f,
                "uploaded {uploaded}, downloaded {downloaded}, conflicts {conflicts}"
            ),
            Self::Failed { error, transient } => {
                if *transient {
                    write!(f, "failed (will retry): {error}")
                } else {
                    write!(f, "failed: {error}")
                }
            }
        }
    }
}
