use std::path::Path;

use crate::commands::common::{
    format_record_details, normalize_record_identifier, open_context, resolve_record,
};
use crate::error::CliError;

pub async fn run_show(
    id: &str,
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let context = open_context(db_path, profile)?;
    let record = resolve_record(&normalized_id, &context.store).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        for line in format_record_details(&record) {
            println!("{line}");
        }
    }
    Ok(())
}
