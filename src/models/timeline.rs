//! Timeline domain models.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing status of a timeline.
///
/// Strings the backend sends outside the known set are kept verbatim in
/// `Other` and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimelineStatus {
    /// Accepted, waiting for a worker.
    Pending,
    /// Client is still sending the file.
    Uploading,
    /// Backend is aligning media and generating the report.
    Processing,
    /// Report is ready.
    Completed,
    /// Processing failed.
    Failed,
    /// Unrecognized backend status.
    Other(String),
}

impl TimelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(raw) => raw,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "uploading" => Self::Uploading,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether polling stops at this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether work on the timeline is still in flight from the user's view.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Pending | Self::Uploading | Self::Processing)
    }
}

impl From<String> for TimelineStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<TimelineStatus> for String {
    fn from(value: TimelineStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a timeline entry.
///
/// An entry starts life under a client placeholder and is re-keyed once the
/// backend acknowledges the upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    /// Upload in flight; only the client knows this id.
    Pending { local_id: String },
    /// Backend-assigned timeline id.
    Registered { server_id: String },
}

impl EntryId {
    /// Generate a fresh placeholder (`pending-<millis>-<4 hex>`).
    pub fn placeholder() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        EntryId::Pending {
            local_id: format!("pending-{}-{}", Utc::now().timestamp_millis(), &suffix[..4]),
        }
    }

    pub fn registered(server_id: impl Into<String>) -> Self {
        EntryId::Registered {
            server_id: server_id.into(),
        }
    }

    /// The id currently used to address the entry.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending { local_id } => local_id,
            Self::Registered { server_id } => server_id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded asset's processing lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub id: EntryId,
    pub filename: String,
    pub status: TimelineStatus,
    /// Creation time in Unix milliseconds.
    pub started_at: i64,
}

impl TimelineEntry {
    /// Optimistic entry shown while the upload request is in flight.
    pub fn placeholder(filename: impl Into<String>) -> Self {
        Self {
            id: EntryId::placeholder(),
            filename: filename.into(),
            status: TimelineStatus::Uploading,
            started_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn timeline_id(&self) -> &str {
        self.id.as_str()
    }

    /// Same entry re-keyed under the server id; filename and start time carry over.
    pub fn registered(&self, server_id: &str, status: TimelineStatus) -> Self {
        Self {
            id: EntryId::registered(server_id),
            filename: self.filename.clone(),
            status,
            started_at: self.started_at,
        }
    }
}

/// Timeline as listed by `GET /glass/timelines`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub timeline_id: String,
    pub filename: String,
    pub status: TimelineStatus,
    #[serde(deserialize_with = "millis_from_number")]
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_report: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
}

/// Accept integer or fractional millisecond timestamps.
fn millis_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i64)
}

impl From<TimelineRecord> for TimelineEntry {
    fn from(record: TimelineRecord) -> Self {
        Self {
            id: EntryId::registered(record.timeline_id),
            filename: record.filename,
            status: record.status,
            started_at: record.started_at,
        }
    }
}

/// Payload of `GET /glass/status/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: TimelineStatus,
}
