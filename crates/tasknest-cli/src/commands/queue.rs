use std::path::Path;

use tasknest_core::models::SyncQueueEntry;

use crate::commands::common::{format_sync_timestamp, open_context, short_id};
use crate::error::CliError;

pub fn format_queue_lines(entries: &[SyncQueueEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "#{:<5} {:<6}  {:<13}  attempts={}  queued {}",
                entry.id,
                entry.operation.to_string(),
                short_id(entry.record_id.as_str()),
                entry.attempts,
                format_sync_timestamp(entry.created_at)
            )
        })
        .collect()
}

pub async fn run_queue(
    limit: usize,
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let entries = context.store.sync_queue().peek_pending(limit).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("Sync queue is empty.");
    } else {
        for line in format_queue_lines(&entries) {
            println!("{line}");
        }
    }
    Ok(())
}
