use std::path::Path;

use crate::commands::common::{normalize_record_identifier, open_context, resolve_record};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let context = open_context(db_path, profile)?;
    let record = resolve_record(&normalized_id, &context.store).await?;

    context.store.delete(&record.id, true).await?;
    println!("{}", record.id);
    Ok(())
}
