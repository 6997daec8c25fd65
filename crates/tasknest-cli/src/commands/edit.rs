use std::path::Path;

use tasknest_core::Record;

use crate::cli::PriorityArg;
use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_record_identifier,
    open_context, parse_due, resolve_record,
};
use crate::error::CliError;

#[derive(Default)]
pub struct EditOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub priority: Option<PriorityArg>,
    pub due: Option<String>,
    pub clear_due: bool,
}

impl EditOptions {
    const fn has_field_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.body.is_some()
            || self.priority.is_some()
            || self.due.is_some()
            || self.clear_due
    }
}

/// Apply explicit field changes; returns whether anything differs.
pub fn apply_edits(record: &mut Record, options: EditOptions) -> Result<bool, CliError> {
    let before = record.clone();

    if let Some(title) = options.title {
        record.title = normalize_content(&title).ok_or(CliError::EmptyTitle)?;
    }
    if let Some(description) = options.description {
        record.description = description.trim().to_string();
    }
    if let Some(body) = options.body {
        record.note = normalize_content(&body);
    }
    if let Some(priority) = options.priority {
        record.priority = priority.into();
    }
    if let Some(due) = options.due {
        record.due_at = Some(parse_due(&due)?);
    } else if options.clear_due {
        record.due_at = None;
    }

    Ok(!record.same_content(&before))
}

pub async fn run_edit(
    id: &str,
    options: EditOptions,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let context = open_context(db_path, profile)?;
    let mut record = resolve_record(&normalized_id, &context.store).await?;

    let changed = if options.has_field_changes() {
        apply_edits(&mut record, options)?
    } else {
        let initial = record.note.clone().unwrap_or_default();
        let edited = capture_editor_input_with_initial(&initial)?;
        let changed = edited != record.note;
        record.note = edited;
        changed
    };

    if !changed {
        println!("{}", record.id);
        return Ok(());
    }

    record.touch();
    let updated = context.store.update(&record, true).await?;
    println!("{}", updated.id);
    Ok(())
}
