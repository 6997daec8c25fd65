//! Remote field mapping.
//!
//! camelCase field names, enums as ordinals, timestamps as ISO-8601 strings.

use serde::{Deserialize, Serialize};

use super::RemoteError;
use crate::models::{Priority, Record, RecordKind, SyncStatus};
use crate::util::{iso8601_to_millis, millis_to_iso8601};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_at: Option<String>,
    pub priority: u8,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: String,
    pub last_updated_at: String,
}

impl TryFrom<&Record> for WireRecord {
    type Error = RemoteError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            due_at: record
                .due_at
                .map(|due| render_timestamp(due, "dueAt"))
                .transpose()?,
            priority: record.priority.ordinal(),
            kind: record.kind.ordinal(),
            is_completed: record.completed,
            note: record.note.clone(),
            created_at: render_timestamp(record.created_at, "createdAt")?,
            last_updated_at: render_timestamp(record.updated_at, "lastUpdatedAt")?,
        })
    }
}

impl TryFrom<WireRecord> for Record {
    type Error = RemoteError;

    fn try_from(value: WireRecord) -> Result<Self, Self::Error> {
        let id = value
            .id
            .parse()
            .map_err(|_| RemoteError::InvalidPayload("record id must not be empty".to_string()))?;
        let kind = RecordKind::from_ordinal(value.kind).ok_or_else(|| {
            RemoteError::InvalidPayload(format!("unknown record type {}", value.kind))
        })?;
        let priority = Priority::from_ordinal(value.priority).ok_or_else(|| {
            RemoteError::InvalidPayload(format!("unknown priority {}", value.priority))
        })?;
        let created_at = parse_timestamp(&value.created_at, "createdAt")?;
        let updated_at = parse_timestamp(&value.last_updated_at, "lastUpdatedAt")?;
        if updated_at < created_at {
            return Err(RemoteError::InvalidPayload(format!(
                "record {} has lastUpdatedAt before createdAt",
                value.id
            )));
        }
        let due_at = value
            .due_at
            .as_deref()
            .map(|due| parse_timestamp(due, "dueAt"))
            .transpose()?;

        Ok(Self {
            id,
            kind,
            title: value.title,
            description: value.description,
            due_at,
            priority,
            completed: value.is_completed,
            note: value.note,
            created_at,
            updated_at,
            sync_status: SyncStatus::Synced,
            last_sync_at: None,
        })
    }
}

fn render_timestamp(millis: i64, field: &str) -> Result<String, RemoteError> {
    millis_to_iso8601(millis).ok_or_else(|| {
        RemoteError::InvalidPayload(format!("field '{field}' is out of range: {millis}"))
    })
}

fn parse_timestamp(value: &str, field: &str) -> Result<i64, RemoteError> {
    iso8601_to_millis(value).ok_or_else(|| {
        RemoteError::InvalidPayload(format!("field '{field}' is not an ISO-8601 timestamp"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_uses_camel_case_ordinals_and_iso_timestamps() {
        let mut record = Record::task("Ship it");
        record.id = "t1".parse().unwrap();
        record.priority = Priority::High;
        record.created_at = 1_700_000_000_000;
        record.updated_at = 1_700_000_000_500;

        let json = serde_json::to_value(WireRecord::try_from(&record).unwrap()).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["type"], 0);
        assert_eq!(json["priority"], 2);
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["createdAt"], "2023-11-14T22:13:20.000Z");
        assert_eq!(json["lastUpdatedAt"], "2023-11-14T22:13:20.500Z");
    }

    #[test]
    fn wire_to_record_marks_synced() {
        let wire: WireRecord = serde_json::from_str(
            r#"{
                "id": "n1",
                "title": "Idea",
                "priority": 0,
                "type": 1,
                "note": "body",
                "createdAt": "2024-01-01T00:00:00Z",
                "lastUpdatedAt": "2024-01-02T00:00:00Z"
            }"#,
        )
        .unwrap();

        let record = Record::try_from(wire).unwrap();
        assert_eq!(record.kind, RecordKind::Note);
        assert_eq!(record.priority, Priority::Low);
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.updated_at - record.created_at, 86_400_000);
    }

    #[test]
    fn wire_rejects_unknown_ordinals_and_inverted_timestamps() {
        let mut wire = WireRecord::try_from(&Record::task("x")).unwrap();
        wire.kind = 7;
        assert!(Record::try_from(wire).is_err());

        let mut wire = WireRecord::try_from(&Record::task("x")).unwrap();
        wire.created_at = "2024-01-02T00:00:00Z".to_string();
        wire.last_updated_at = "2024-01-01T00:00:00Z".to_string();
        assert!(matches!(
            Record::try_from(wire),
            Err(RemoteError::InvalidPayload(_))
        ));
    }

    #[test]
    fn wire_rejects_out_of_range_timestamps() {
        let mut record = Record::task("Far future");
        record.updated_at = i64::MAX;
        assert!(matches!(
            WireRecord::try_from(&record),
            Err(RemoteError::InvalidPayload(message)) if message.contains("lastUpdatedAt")
        ));

        let mut record = Record::task("Bad due date");
        record.due_at = Some(i64::MIN);
        assert!(matches!(
            WireRecord::try_from(&record),
            Err(RemoteError::InvalidPayload(message)) if message.contains("dueAt")
        ));
    }
}
