use std::path::Path;

use serde::Serialize;
use tasknest_core::{AuthProvider, Record, SyncStatus};

use crate::commands::common::{format_sync_timestamp, open_context};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub profile: String,
    pub owner_id: Option<String>,
    pub remote_url: Option<String>,
    pub records: usize,
    pub synced: usize,
    pub needs_sync: usize,
    pub syncing: usize,
    pub failed: usize,
    pub queued: usize,
    pub last_sync_at: Option<i64>,
}

impl StatusReport {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("profile:     {}", self.profile),
            format!(
                "owner:       {}",
                self.owner_id.as_deref().unwrap_or("(not signed in)")
            ),
            format!(
                "remote:      {}",
                self.remote_url.as_deref().unwrap_or("(not configured)")
            ),
            format!(
                "records:     {} ({} synced, {} pending, {} syncing, {} failed)",
                self.records, self.synced, self.needs_sync, self.syncing, self.failed
            ),
            format!("queued:      {}", self.queued),
        ];
        lines.push(format!(
            "last sync:   {}",
            self.last_sync_at
                .map_or_else(|| "never".to_string(), format_sync_timestamp)
        ));
        lines
    }
}

pub fn last_sync_of(records: &[Record]) -> Option<i64> {
    records.iter().filter_map(|record| record.last_sync_at).max()
}

pub async fn run_status(as_json: bool, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let owner_id = context.auth.current_owner_id();

    let mut report = StatusReport {
        profile: context.profile_name.clone(),
        owner_id: owner_id.clone(),
        remote_url: context.profile.remote_url(),
        records: 0,
        synced: 0,
        needs_sync: 0,
        syncing: 0,
        failed: 0,
        queued: 0,
        last_sync_at: None,
    };

    if owner_id.is_some() {
        for (status, count) in context.store.count_by_status().await? {
            report.records += count;
            match status {
                SyncStatus::Synced => report.synced = count,
                SyncStatus::NeedsSync => report.needs_sync = count,
                SyncStatus::Syncing => report.syncing = count,
                SyncStatus::Failed => report.failed = count,
            }
        }
        report.queued = context.store.sync_queue().len().await?;
        report.last_sync_at = last_sync_of(&context.store.get_all().await?);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in report.lines() {
            println!("{line}");
        }
    }
    Ok(())
}
