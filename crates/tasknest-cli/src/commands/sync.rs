use std::path::Path;

use tasknest_core::SyncResult;

use crate::commands::common::{
    build_engine, format_sync_conflict_lines, open_context, sync_conflict_to_item,
    SyncConflictItem,
};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let engine = build_engine(&context).await?;

    report_sync_result(engine.sync_now().await)
}

/// Print a pass outcome; failures and a missing owner become errors.
pub fn report_sync_result(result: SyncResult) -> Result<(), CliError> {
    match result {
        SyncResult::Success { .. } => {
            println!("Sync completed: {result}");
            Ok(())
        }
        SyncResult::Skipped { .. } => {
            println!("Sync {result}");
            Ok(())
        }
        SyncResult::NoAuth => Err(CliError::SyncFailed(
            "not signed in; run `tasknest auth login --owner <ID>` first".into(),
        )),
        SyncResult::Failed { error, transient } => {
            let hint = if transient {
                " (temporary; try again later)"
            } else {
                ""
            };
            Err(CliError::SyncFailed(format!("{error}{hint}")))
        }
    }
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let conflicts = context.store.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
