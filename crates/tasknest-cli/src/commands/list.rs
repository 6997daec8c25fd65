use std::path::Path;

use tasknest_core::RecordFilter;

use crate::cli::{KindArg, PriorityArg, SyncStatusArg};
use crate::commands::common::{
    format_record_lines, open_context, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

pub struct ListOptions {
    pub limit: usize,
    pub kind: Option<KindArg>,
    pub open: bool,
    pub done: bool,
    pub priority: Option<PriorityArg>,
    pub status: Option<SyncStatusArg>,
    pub text: Option<String>,
    pub json: bool,
}

pub fn build_filter(options: &ListOptions) -> RecordFilter {
    let mut filter = RecordFilter::default().limit(options.limit);
    if let Some(kind) = options.kind {
        filter = filter.kind(kind.into());
    }
    if options.open {
        filter = filter.completed(false);
    } else if options.done {
        filter = filter.completed(true);
    }
    if let Some(priority) = options.priority {
        filter = filter.priority(priority.into());
    }
    if let Some(status) = options.status {
        filter = filter.sync_status(status.into());
    }
    if let Some(text) = options.text.as_deref().map(str::trim).filter(|text| !text.is_empty()) {
        filter = filter.text(text);
    }
    filter
}

pub async fn run_list(
    options: ListOptions,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let records = context.store.get_by_criteria(&build_filter(&options)).await?;

    if options.json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("No records.");
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
