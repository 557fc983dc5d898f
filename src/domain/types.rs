use crate::domain::timestamp::{serialize_instant, serialize_optional_instant};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Active,
    Completed,
    Aborted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Run {
    pub id: String,
    pub session_id: String,
    pub agent_key: String,
    pub label: Option<String>,
    pub status: RunStatus,
    pub model: Option<String>,
    pub model_provider: Option<String>,
    pub channel: Option<String>,
    pub spawned_by: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(serialize_with = "serialize_optional_instant")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(serialize_with = "serialize_optional_instant")]
    pub updated_at: Option<OffsetDateTime>,
    pub origin_label: Option<String>,
    pub session_file: Option<String>,
}

impl Run {
    /// A run with nothing but identity; every other field is at its default.
    pub fn bare(id: &str, agent_key: &str, status: RunStatus) -> Self {
        Self {
            id: id.to_string(),
            session_id: id.to_string(),
            agent_key: agent_key.to_string(),
            label: None,
            status,
            model: None,
            model_provider: None,
            channel: None,
            spawned_by: None,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            created_at: None,
            updated_at: None,
            origin_label: None,
            session_file: None,
        }
    }
}

/// Coarse kind of a log record.
///
/// Types outside the known set land in `Unknown`, which keeps the raw string for the timeline
/// and serializes as `custom`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    Session,
    Message,
    ThinkingLevelChange,
    Custom,
    Unknown(String),
}

impl EventKind {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "session" => Self::Session,
            "message" => Self::Message,
            "thinking_level_change" => Self::ThinkingLevelChange,
            "custom" => Self::Custom,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Message => "message",
            Self::ThinkingLevelChange => "thinking_level_change",
            Self::Custom | Self::Unknown(_) => "custom",
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(serialize_with = "serialize_instant")]
    pub timestamp: OffsetDateTime,
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedMessage {
    pub id: Option<String>,
    pub role: Option<String>,
    pub content: String,
    #[serde(serialize_with = "serialize_instant")]
    pub timestamp: OffsetDateTime,
    pub model: Option<String>,
    pub usage: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
    #[serde(serialize_with = "serialize_instant")]
    pub timestamp: OffsetDateTime,
    pub duration_ms: Option<u64>,
    pub result: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TimelineEntry {
    #[serde(serialize_with = "serialize_instant")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunDetails {
    pub run: Run,
    pub events: Vec<ClassifiedEvent>,
    pub tool_calls: Vec<DerivedToolCall>,
    pub messages: Vec<DerivedMessage>,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChannelRunSummary {
    pub id: String,
    pub label: Option<String>,
    pub model: Option<String>,
    pub tokens: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AnalyticsOverview {
    pub total_sessions: usize,
    pub active_sessions: usize,
    /// `total_sessions - active_sessions`; aborted runs are counted here too.
    pub completed_sessions: usize,
    pub aborted_sessions: usize,
    pub total_tokens: u64,
    pub total_events: usize,
    pub by_channel: BTreeMap<String, Vec<ChannelRunSummary>>,
    pub models_used: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Activity {
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(serialize_with = "serialize_instant")]
    pub timestamp: OffsetDateTime,
    pub summary: String,
}
