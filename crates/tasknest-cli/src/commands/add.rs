use std::path::Path;

use tasknest_core::{Priority, Record};

use crate::cli::PriorityArg;
use crate::commands::common::{normalize_content, open_context, parse_due, resolve_title};
use crate::error::CliError;

pub struct AddOptions<'a> {
    pub title_parts: &'a [String],
    pub note: bool,
    pub description: Option<String>,
    pub body: Option<String>,
    pub priority: Option<PriorityArg>,
    pub due: Option<String>,
}

pub async fn run_add(
    options: AddOptions<'_>,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let title = resolve_title(options.title_parts)?;
    let due_at = options.due.as_deref().map(parse_due).transpose()?;

    let body = options.body.as_deref().and_then(normalize_content);
    let mut record = if options.note {
        Record::note(title, body.unwrap_or_default())
    } else {
        let mut task = Record::task(title);
        task.note = body;
        task
    };
    if let Some(description) = options.description.as_deref().and_then(normalize_content) {
        record.description = description;
    }
    record.priority = options.priority.map_or_else(Priority::default, Priority::from);
    record.due_at = due_at;

    let context = open_context(db_path, profile)?;
    let stored = context.store.insert(&record, true).await?;

    println!("{}", stored.id);
    Ok(())
}
