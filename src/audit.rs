use std::error::Error;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

const AUDIT_ROOT: &str = ".surco/audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    /// An operator explicitly moved one activity to a new date.
    ActivityDeferred,
    /// An activity was moved as a side effect of reflowing its cycle.
    ActivityReflowed,
}

impl AuditEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventKind::ActivityDeferred => "activity.deferred",
            AuditEventKind::ActivityReflowed => "activity.reflowed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub occurred_at: String,
    pub activity_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

impl AuditEvent {
    pub fn new(activity_id: impl Into<String>, kind: AuditEventKind, data: Value) -> Self {
        Self::with_identity(
            new_event_id(),
            now_utc_rfc3339(),
            activity_id,
            kind.as_str().to_string(),
            data,
        )
    }

    pub fn with_identity(
        event_id: impl Into<String>,
        occurred_at: impl Into<String>,
        activity_id: impl Into<String>,
        event_type: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            occurred_at: occurred_at.into(),
            activity_id: activity_id.into(),
            event_type: event_type.into(),
            data,
        }
    }
}

/// Writes one append-only JSON file per audit event under
/// `.surco/audit/YYYY/MM/DD/`.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    data_root: PathBuf,
}

impl AuditWriter {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn write(&self, event: &AuditEvent) -> Result<PathBuf, AuditWriteError> {
        let rel_path =
            relative_path_for_event(&event.occurred_at, &event.event_id, &event.event_type)?;
        let abs_path = self.data_root.join(&rel_path);
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&abs_path)?;
        serde_json::to_writer_pretty(&mut file, event)?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        Ok(rel_path)
    }
}

pub fn relative_path_for_event(
    occurred_at: &str,
    event_id: &str,
    event_type: &str,
) -> Result<PathBuf, AuditWriteError> {
    validate_filename_component("event_id", event_id)?;
    validate_filename_component("event_type", event_type)?;

    let timestamp = OffsetDateTime::parse(occurred_at, &Rfc3339).map_err(|source| {
        AuditWriteError::InvalidTimestamp {
            value: occurred_at.to_string(),
            source,
        }
    })?;

    Ok(Path::new(AUDIT_ROOT)
        .join(format!("{:04}", timestamp.year()))
        .join(format!("{:02}", u8::from(timestamp.month())))
        .join(format!("{:02}", timestamp.day()))
        .join(format!("{event_id}-{event_type}.json")))
}

pub fn new_event_id() -> String {
    Uuid::now_v7().to_string()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

fn validate_filename_component(field: &'static str, value: &str) -> Result<(), AuditWriteError> {
    let is_valid = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));

    if is_valid {
        Ok(())
    } else {
        Err(AuditWriteError::InvalidFileComponent {
            field,
            value: value.to_string(),
        })
    }
}

#[derive(Debug)]
pub enum AuditWriteError {
    InvalidTimestamp {
        value: String,
        source: time::error::Parse,
    },
    InvalidFileComponent {
        field: &'static str,
        value: String,
    },
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl fmt::Display for AuditWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditWriteError::InvalidTimestamp { value, source } => {
                write!(f, "invalid RFC3339 timestamp '{}': {}", value, source)
            }
            AuditWriteError::InvalidFileComponent { field, value } => {
                write!(
                    f,
                    "invalid {} '{}': use only ASCII letters, numbers, '.', '-', '_'",
                    field, value
                )
            }
            AuditWriteError::Io(err) => write!(f, "I/O error while writing audit event: {}", err),
            AuditWriteError::Serialize(err) => {
                write!(f, "failed to serialize audit event as JSON: {}", err)
            }
        }
    }
}

impl Error for AuditWriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuditWriteError::InvalidTimestamp { source, .. } => Some(source),
            AuditWriteError::Io(err) => Some(err),
            AuditWriteError::Serialize(err) => Some(err),
            AuditWriteError::InvalidFileComponent { .. } => None,
        }
    }
}

impl From<std::io::Error> for AuditWriteError {
    fn from(value: std::io::Error) -> Self {
        AuditWriteError::Io(value)
    }
}

impl From<serde_json::Error> for AuditWriteError {
    fn from(value: serde_json::Error) -> Self {
        AuditWriteError::Serialize(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{relative_path_for_event, AuditEvent, AuditEventKind, AuditWriter};
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_nanos();
        std::env::temp_dir().join(format!("surco-audit-{}", nanos))
    }

    #[test]
    fn builds_deterministic_event_path() {
        let path = relative_path_for_event(
            "2026-02-22T17:00:00Z",
            "018f4f7f-7dc7-7f4e-954b-64f8a2273ec8",
            AuditEventKind::ActivityDeferred.as_str(),
        )
        .expect("path should build");
        assert_eq!(
            path.to_string_lossy(),
            ".surco/audit/2026/02/22/018f4f7f-7dc7-7f4e-954b-64f8a2273ec8-activity.deferred.json"
        );
    }

    #[test]
    fn writes_append_only_event_file() {
        let root = unique_tmp_dir();
        let writer = AuditWriter::new(&root);
        let event = AuditEvent::with_identity(
            "018f4f7f-7dc7-7f4e-954b-64f8a2273ec8",
            "2026-02-22T17:00:00Z",
            "finca-a1b2",
            AuditEventKind::ActivityDeferred.as_str(),
            json!({
                "old_date": "2026-02-20T06:00:00Z",
                "new_date": "2026-02-24T06:00:00Z",
                "reason": "lluvia fuerte",
            }),
        );

        let relative = writer.write(&event).expect("first write should succeed");
        let absolute = root.join(&relative);
        let saved: serde_json::Value = serde_json::from_slice(
            &std::fs::read(&absolute).expect("audit JSON file should be readable"),
        )
        .expect("audit JSON should parse");

        assert_eq!(saved["type"], "activity.deferred");
        assert_eq!(saved["activity_id"], "finca-a1b2");
        assert_eq!(saved["data"]["reason"], "lluvia fuerte");

        let second_write = writer.write(&event);
        assert!(second_write.is_err());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn rejects_invalid_file_component() {
        let result =
            relative_path_for_event("2026-02-22T17:00:00Z", "bad/id", "activity.deferred");
        assert!(result.is_err());
    }
}
