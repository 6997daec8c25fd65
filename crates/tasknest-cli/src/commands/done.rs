use std::path::Path;

use tasknest_core::RecordKind;

use crate::commands::common::{normalize_record_identifier, open_context, resolve_record};
use crate::error::CliError;

pub async fn run_done(
    id: &str,
    undo: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let context = open_context(db_path, profile)?;
    let mut record = resolve_record(&normalized_id, &context.store).await?;

    if record.kind != RecordKind::Task {
        return Err(CliError::NotATask(record.id.to_string()));
    }

    let completed = !undo;
    if record.completed != completed {
        record.completed = completed;
        record.touch();
        context.store.update(&record, true).await?;
    }

    println!("{}", record.id);
    Ok(())
}
