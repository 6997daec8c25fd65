use std::sync::Arc;

use pretty_assertions::assert_eq;
use tasknest_core::models::{ConflictWinner, SyncConflict, STRATEGY_LWW};
use tasknest_core::{Priority, Record, RecordId, RecordStore, SessionAuth, SyncResult};

use crate::cli::{CompletionShell, KindArg, PriorityArg};
use crate::commands::auth_cmd::build_session;
use crate::commands::common::{
    default_editor, format_record_lines, format_relative_time, format_sync_conflict_lines,
    format_sync_timestamp, normalize_content, normalize_record_identifier, open_store, parse_due,
    resolve_record,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{merge_profile, ProfileInit};
use crate::commands::edit::{apply_edits, EditOptions};
use crate::commands::list::{build_filter, ListOptions};
use crate::commands::status::last_sync_of;
use crate::commands::sync::report_sync_result;
use crate::config_profiles::CliProfile;
use crate::error::CliError;

fn temp_store(dir: &tempfile::TempDir) -> RecordStore {
    let auth = Arc::new(SessionAuth::signed_in("owner-cli").unwrap());
    open_store(&dir.path().join("tasknest.db"), auth).unwrap()
}

fn record_with_id(id: &str, title: &str) -> Record {
    let mut record = Record::task(title);
    record.id = id.parse::<RecordId>().unwrap();
    record
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn normalize_record_identifier_rejects_blank() {
    assert!(matches!(
        normalize_record_identifier("   "),
        Err(CliError::EmptyRecordId)
    ));
    assert_eq!(normalize_record_identifier(" abc ").unwrap(), "abc");
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn parse_due_accepts_date_and_rfc3339() {
    assert_eq!(parse_due("1970-01-02").unwrap(), 86_400_000);
    assert_eq!(parse_due("1970-01-01T00:00:01Z").unwrap(), 1_000);
    assert!(matches!(parse_due("next week"), Err(CliError::InvalidDue(_))));
}

#[test]
fn record_lines_mark_pending_records() {
    let mut done = Record::task("Ship release");
    done.completed = true;
    done.sync_status = tasknest_core::SyncStatus::Synced;
    let pending = Record::note("Ideas", "body");

    let lines = format_record_lines(&[done, pending]);
    assert!(lines[0].contains("[x]"));
    assert!(!lines[0].contains("needs-sync"));
    assert!(lines[1].contains("Ideas"));
    assert!(lines[1].contains("(needs-sync)"));
}

#[test]
fn format_sync_conflict_lines_include_key_fields() {
    let conflicts = vec![SyncConflict {
        id: 1,
        record_id: "11111111-1111-7111-8111-111111111111".parse().unwrap(),
        local_updated_at: 200,
        remote_updated_at: 100,
        resolved_at: 300,
        winner: ConflictWinner::Local,
        strategy: STRATEGY_LWW.to_string(),
    }];

    let rendered = format_sync_conflict_lines(&conflicts);
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("lww"));
    assert!(rendered[0].contains("winner=local"));
    assert!(rendered[0].contains("record=11111111-1111-7111-8111-111111111111"));
    assert!(rendered[0].contains("local=200"));
    assert!(rendered[0].contains("remote=100"));
}

#[test]
fn list_filter_combines_flags() {
    let filter = build_filter(&ListOptions {
        limit: 5,
        kind: Some(KindArg::Task),
        open: true,
        done: false,
        priority: Some(PriorityArg::High),
        status: None,
        text: Some("  ".to_string()),
        json: false,
    });

    assert_eq!(filter.limit, Some(5));
    assert_eq!(filter.kind, Some(tasknest_core::RecordKind::Task));
    assert_eq!(filter.completed, Some(false));
    assert_eq!(filter.priority, Some(Priority::High));
    assert_eq!(filter.text, None);
}

#[test]
fn apply_edits_reports_no_change_for_identical_values() {
    let mut record = Record::task("Same");
    let changed = apply_edits(
        &mut record,
        EditOptions {
            title: Some(" Same ".to_string()),
            ..EditOptions::default()
        },
    )
    .unwrap();
    assert!(!changed);

    let changed = apply_edits(
        &mut record,
        EditOptions {
            priority: Some(PriorityArg::Low),
            due: Some("2030-01-01".to_string()),
            ..EditOptions::default()
        },
    )
    .unwrap();
    assert!(changed);
    assert_eq!(record.priority, Priority::Low);
    assert!(record.due_at.is_some());
}

#[test]
fn apply_edits_rejects_blank_title() {
    let mut record = Record::task("Keep");
    let result = apply_edits(
        &mut record,
        EditOptions {
            title: Some("   ".to_string()),
            ..EditOptions::default()
        },
    );
    assert!(matches!(result, Err(CliError::EmptyTitle)));
}

#[test]
fn merge_profile_keeps_existing_values() {
    let existing = CliProfile {
        remote_url: Some("https://old.example.com".to_string()),
        remote_token: Some("old-token".to_string()),
        probe_addr: None,
    };

    let merged = merge_profile(
        &existing,
        ProfileInit {
            remote_url: None,
            remote_token: None,
            probe_addr: Some("sync.example.com:443".to_string()),
        },
    )
    .unwrap();

    assert_eq!(merged.remote_url.as_deref(), Some("https://old.example.com"));
    assert_eq!(merged.remote_token.as_deref(), Some("old-token"));
    assert_eq!(merged.probe_addr.as_deref(), Some("sync.example.com:443"));
}

#[test]
fn merge_profile_validates_inputs() {
    let existing = CliProfile::default();
    assert!(merge_profile(
        &existing,
        ProfileInit {
            remote_url: Some("ftp://example.com".to_string()),
            remote_token: None,
            probe_addr: None,
        },
    )
    .is_err());
    assert!(merge_profile(
        &existing,
        ProfileInit {
            remote_url: None,
            remote_token: None,
            probe_addr: Some("no-port".to_string()),
        },
    )
    .is_err());
}

#[test]
fn build_session_trims_owner_and_drops_blank_token() {
    let session = build_session(" owner-9 ", Some("me@example.com".into()), Some(" ".into()));
    assert_eq!(session.owner_id, "owner-9");
    assert_eq!(session.email.as_deref(), Some("me@example.com"));
    assert_eq!(session.access_token, None);
}

#[test]
fn sync_report_turns_failures_into_errors() {
    assert!(report_sync_result(SyncResult::Success {
        uploaded: 1,
        downloaded: 0,
        conflicts: 0
    })
    .is_ok());
    assert!(matches!(
        report_sync_result(SyncResult::NoAuth),
        Err(CliError::SyncFailed(_))
    ));
    assert!(matches!(
        report_sync_result(SyncResult::Failed {
            error: "boom".into(),
            transient: true
        }),
        Err(CliError::SyncFailed(message)) if message.contains("temporary")
    ));
}

#[test]
fn last_sync_is_latest_confirmation() {
    let mut first = Record::task("a");
    first.last_sync_at = Some(10);
    let mut second = Record::task("b");
    second.last_sync_at = Some(30);
    let never = Record::task("c");

    assert_eq!(last_sync_of(&[first, second, never]), Some(30));
    assert_eq!(last_sync_of(&[]), None);
}

#[test]
fn completions_name_the_binary() {
    let rendered = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(rendered.contains("tasknest"));
}

#[tokio::test(flavor = "current_thread")]
async fn resolve_record_by_exact_and_prefix_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = temp_store(&dir);
    let record = store
        .insert(&record_with_id("abc-123", "Buy milk"), true)
        .await
        .unwrap();

    let exact = resolve_record("abc-123", &store).await.unwrap();
    assert_eq!(exact.id, record.id);

    let by_prefix = resolve_record("abc", &store).await.unwrap();
    assert_eq!(by_prefix.title, "Buy milk");

    assert!(matches!(
        resolve_record("zzz", &store).await,
        Err(CliError::RecordNotFound(_))
    ));
}

#[tokio::test(flavor = "current_thread")]
async fn resolve_record_reports_ambiguous_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let store = temp_store(&dir);
    store
        .insert(&record_with_id("dup-1", "First"), true)
        .await
        .unwrap();
    store
        .insert(&record_with_id("dup-2", "Second"), true)
        .await
        .unwrap();

    match resolve_record("dup", &store).await {
        Err(CliError::AmbiguousRecordId(message)) => {
            assert!(message.contains("dup-1"));
            assert!(message.contains("dup-2"));
        }
        other => panic!("expected ambiguity error, got {other:?}"),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn local_edits_are_queued_for_sync() {
    let dir = tempfile::tempdir().unwrap();
    let store = temp_store(&dir);
    let mut record = store.insert(&Record::task("Draft"), true).await.unwrap();

    record.title = "Final".to_string();
    record.touch();
    store.update(&record, true).await.unwrap();
    store.delete(&record.id, true).await.unwrap();

    let queued = store.sync_queue().peek_pending(10).await.unwrap();
    let operations = queued
        .iter()
        .map(|entry| entry.operation.to_string())
        .collect::<Vec<_>>();
    assert_eq!(operations, vec!["insert", "update", "delete"]);
}
