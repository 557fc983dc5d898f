use crate::domain::timestamp::{Clock, normalize_timestamp};
use crate::domain::{
    ClassifiedEvent, DerivedMessage, DerivedToolCall, EventKind, TimelineEntry,
};
use serde_json::Value;
use time::OffsetDateTime;

const PREVIEW_CHARS: usize = 100;

/// Everything derived from a single log record.
#[derive(Clone, Debug, PartialEq)]
pub struct EventProjection {
    pub event: ClassifiedEvent,
    pub timeline: TimelineEntry,
    pub derived: Option<DerivedView>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DerivedView {
    Message(DerivedMessage),
    ToolCall(DerivedToolCall),
}

pub fn classify_event(record: &Value) -> EventKind {
    EventKind::from_raw(str_field(record, "type").unwrap_or(""))
}

/// Raw `type` as shown on the timeline.
pub fn raw_event_type(record: &Value) -> &str {
    str_field(record, "type").unwrap_or("unknown")
}

pub fn project_event(record: &Value, clock: &dyn Clock) -> EventProjection {
    let kind = classify_event(record);
    let timestamp = normalize_timestamp(record.get("timestamp"), clock);

    let timeline = TimelineEntry {
        timestamp,
        kind: raw_event_type(record).to_string(),
        id: str_field(record, "id").map(str::to_string),
        summary: summarize_event(record),
    };

    let derived = match &kind {
        EventKind::Message => Some(DerivedView::Message(derive_message(record, timestamp))),
        EventKind::Custom => Some(DerivedView::ToolCall(derive_tool_call(record, timestamp))),
        _ => None,
    };

    let event = ClassifiedEvent {
        kind,
        id: str_field(record, "id").unwrap_or("").to_string(),
        parent_id: str_field(record, "parentId").map(str::to_string),
        timestamp,
        data: record.clone(),
    };

    EventProjection {
        event,
        timeline,
        derived,
    }
}

pub fn summarize_event(record: &Value) -> String {
    match classify_event(record) {
        EventKind::Session => {
            format!("Session started in {}", str_field(record, "cwd").unwrap_or("unknown"))
        }
        EventKind::Message => {
            let message = record.get("message").unwrap_or(&Value::Null);
            let role = str_field(message, "role").unwrap_or("unknown");
            let content = flatten_content(message.get("content"));
            format!("[{}] {}", role.to_uppercase(), preview(&content))
        }
        EventKind::Custom => {
            format!("Custom event: {}", str_field(record, "customType").unwrap_or(""))
        }
        EventKind::ThinkingLevelChange => format!(
            "Thinking level changed to: {}",
            str_field(record, "thinkingLevel").unwrap_or("unknown")
        ),
        EventKind::Unknown(raw) => raw,
    }
}

/// Joins the `text` parts of a content array with newlines. Strings pass through; other
/// non-array values are rendered as JSON.
pub fn flatten_content(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .map(|item| item.get("text").and_then(Value::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

fn derive_message(record: &Value, timestamp: OffsetDateTime) -> DerivedMessage {
    let message = record.get("message").unwrap_or(&Value::Null);
    DerivedMessage {
        id: str_field(record, "id").map(str::to_string),
        role: str_field(message, "role").map(str::to_string),
        content: flatten_content(message.get("content")),
        timestamp,
        model: str_field(message, "model").map(str::to_string),
        usage: message
            .get("usage")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}

fn derive_tool_call(record: &Value, timestamp: OffsetDateTime) -> DerivedToolCall {
    let tool_name = str_field(record, "customType")
        .filter(|name| !name.is_empty())
        .unwrap_or("custom");
    DerivedToolCall {
        id: str_field(record, "id").unwrap_or("").to_string(),
        tool_name: tool_name.to_string(),
        arguments: record
            .get("data")
            .filter(|data| !data.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        timestamp,
        duration_ms: None,
        result: None,
        success: true,
        error: None,
    }
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}
