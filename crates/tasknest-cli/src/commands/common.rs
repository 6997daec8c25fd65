use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tasknest_core::models::SyncConflict;
use tasknest_core::util::iso8601_to_millis;
use tasknest_core::{
    AuthProvider, ConnectivityMonitor, HttpRemoteClient, ReachabilityProbe, Record, RecordId,
    RecordKind, RecordStore, SessionAuth, SyncConfig, SyncEngine, TcpProbe,
};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;
use crate::session_store::KeyringSessionStore;

/// Everything a command needs: the resolved profile, its session and the store.
pub struct AppContext {
    pub profile_name: String,
    pub profile: CliProfile,
    pub auth: Arc<SessionAuth>,
    pub store: RecordStore,
}

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub note: Option<String>,
    pub priority: String,
    pub completed: bool,
    pub due_at: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub sync_status: String,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub record_id: String,
    pub local_updated_at: i64,
    pub remote_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub winner: String,
    pub strategy: String,
}

pub fn open_context(db_path: &Path, profile: Option<&str>) -> Result<AppContext, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let auth = Arc::new(SessionAuth::with_persistence(Arc::new(
        KeyringSessionStore::new(&profile_name),
    ))?);
    let store = open_store(db_path, auth.clone())?;

    Ok(AppContext {
        profile_name,
        profile,
        auth,
        store,
    })
}

pub fn open_store(db_path: &Path, auth: Arc<dyn AuthProvider>) -> Result<RecordStore, CliError> {
    Ok(RecordStore::open_path(db_path.to_path_buf(), auth)?)
}

/// Sync engine for the context's profile, with connectivity taken from one probe.
pub async fn build_engine(context: &AppContext) -> Result<SyncEngine, CliError> {
    let remote_url = context
        .profile
        .remote_url()
        .ok_or(CliError::SyncNotConfigured)?;
    let token = context
        .auth
        .session()
        .and_then(|session| session.access_token)
        .or_else(|| context.profile.remote_token());
    let remote = HttpRemoteClient::new(remote_url, token)?;

    let online = match context.profile.probe_addr() {
        Some(addr) => TcpProbe::new(addr).is_reachable().await.unwrap_or(true),
        None => true,
    };

    Ok(SyncEngine::new(
        context.store.clone(),
        Arc::new(remote),
        context.auth.clone(),
        ConnectivityMonitor::new(online),
    )
    .with_config(SyncConfig::default()))
}

pub async fn resolve_record(query: &str, store: &RecordStore) -> Result<Record, CliError> {
    if let Ok(record_id) = query.parse::<RecordId>() {
        if let Some(record) = store.get_by_id(&record_id).await? {
            return Ok(record);
        }
    }

    let matching_ids = store.list_ids_by_prefix(query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::RecordNotFound(query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<RecordId>()
                .map_err(|_| CliError::RecordNotFound(query.to_string()))?;
            store
                .get_by_id(&resolved_id)
                .await?
                .ok_or_else(|| CliError::RecordNotFound(query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

const fn kind_marker(record: &Record) -> &'static str {
    match record.kind {
        RecordKind::Task if record.completed => "[x]",
        RecordKind::Task => "[ ]",
        RecordKind::Note => " ~ ",
    }
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let short_id = short_id(record.id.as_str());
            let preview = record.title_preview(40);
            let relative_time = format_relative_time(record.updated_at, now_ms);
            let mut line = format!(
                "{short_id:<13}  {}  {preview:<40}  {:<6}  {relative_time:<10}",
                kind_marker(record),
                record.priority.to_string(),
            );
            if let Some(due_at) = record.due_at {
                line.push_str(&format!("  due {}", format_due(due_at)));
            }
            if record.sync_status != tasknest_core::SyncStatus::Synced {
                line.push_str(&format!("  ({})", record.sync_status));
            }
            line.trim_end().to_string()
        })
        .collect()
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        id: record.id.to_string(),
        kind: record.kind.to_string(),
        title: record.title.clone(),
        description: record.description.clone(),
        note: record.note.clone(),
        priority: record.priority.to_string(),
        completed: record.completed,
        due_at: record.due_at.map(format_due),
        created_at: record.created_at,
        updated_at: record.updated_at,
        relative_time: format_relative_time(record.updated_at, now_ms),
        sync_status: record.sync_status.to_string(),
    }
}

pub fn format_record_details(record: &Record) -> Vec<String> {
    let mut lines = vec![
        format!("id:          {}", record.id),
        format!("kind:        {}", record.kind),
        format!("title:       {}", record.title),
    ];
    if !record.description.is_empty() {
        lines.push(format!("description: {}", record.description));
    }
    if record.kind == RecordKind::Task {
        lines.push(format!("completed:   {}", record.completed));
    }
    lines.push(format!("priority:    {}", record.priority));
    if let Some(due_at) = record.due_at {
        lines.push(format!("due:         {}", format_due(due_at)));
    }
    lines.push(format!("created:     {}", format_sync_timestamp(record.created_at)));
    lines.push(format!("updated:     {}", format_sync_timestamp(record.updated_at)));
    lines.push(format!("sync:        {}", record.sync_status));
    if let Some(last_sync_at) = record.last_sync_at {
        lines.push(format!("last synced: {}", format_sync_timestamp(last_sync_at)));
    }
    if let Some(note) = record.note.as_deref().filter(|note| !note.is_empty()) {
        lines.push(String::new());
        lines.push(note.to_string());
    }
    lines
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        record_id: conflict.record_id.to_string(),
        local_updated_at: conflict.local_updated_at,
        remote_updated_at: conflict.remote_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        winner: conflict.winner.as_str().to_string(),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<7}  winner={:<6}  record={}  local={} remote={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.winner.as_str(),
                conflict.record_id,
                conflict.local_updated_at,
                conflict.remote_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn format_due(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp into Unix ms.
pub fn parse_due(value: &str) -> Result<i64, CliError> {
    let trimmed = value.trim();
    if let Some(millis) = iso8601_to_millis(trimmed) {
        return Ok(millis);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc().timestamp_millis())
        .ok_or_else(|| CliError::InvalidDue(trimmed.to_string()))
}

pub fn resolve_title(title_parts: &[String]) -> Result<String, CliError> {
    if let Some(title) = normalize_content(&title_parts.join(" ")) {
        return Ok(title);
    }

    if let Some(title) = read_piped_stdin()? {
        return Ok(title);
    }

    Err(CliError::EmptyTitle)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("tasknest-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TASKNEST_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("tasknest")
        .join("tasknest.db")
}
