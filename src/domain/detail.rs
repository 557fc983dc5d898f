use crate::domain::event::{DerivedView, project_event};
use crate::domain::run::project_run;
use crate::domain::timestamp::Clock;
use crate::domain::{RunDetails, SessionIndex};
use serde_json::Value;

/// Single pass over the session's records, in log order. Every record yields an event and a
/// timeline entry; messages and custom events also yield their derived view.
pub fn build_run_details(
    session_id: &str,
    index: &SessionIndex,
    records: &[Value],
    clock: &dyn Clock,
) -> RunDetails {
    let run = project_run(session_id, index, records, clock);

    let mut events = Vec::with_capacity(records.len());
    let mut timeline = Vec::with_capacity(records.len());
    let mut messages = Vec::new();
    let mut tool_calls = Vec::new();

    for record in records {
        let projection = project_event(record, clock);
        events.push(projection.event);
        timeline.push(projection.timeline);
        match projection.derived {
            Some(DerivedView::Message(message)) => messages.push(message),
            Some(DerivedView::ToolCall(call)) => tool_calls.push(call),
            None => {}
        }
    }

    RunDetails {
        run,
        events,
        tool_calls,
        messages,
        timeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp::FixedClock;
    use crate::domain::{EventKind, RunStatus};
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn derives_all_views_in_log_order() {
        let clock = FixedClock(datetime!(2030-01-01 00:00 UTC));
        let records = vec![
            json!({ "type": "session", "id": "e0", "cwd": "/repo", "timestamp": "2026-02-18T10:00:00Z" }),
            json!({ "type": "message", "id": "e1", "parentId": "e0", "timestamp": "2026-02-18T10:00:01Z",
                    "message": { "role": "user", "content": [{ "type": "text", "text": "go" }] } }),
            json!({ "type": "custom", "id": "e2", "customType": "bash", "data": { "cmd": "ls" },
                    "timestamp": "2026-02-18T10:00:02Z" }),
            json!({ "type": "thinking_level_change", "id": "e3", "thinkingLevel": "low",
                    "timestamp": "2026-02-18T10:00:03Z" }),
            json!({ "type": "message", "id": "e4", "timestamp": "2026-02-18T10:00:04Z",
                    "message": { "role": "assistant", "content": "ok" } }),
            json!({ "type": "custom", "id": "e5", "timestamp": "2026-02-18T10:00:05Z" }),
        ];

        let details = build_run_details("s9", &SessionIndex::new(), &records, &clock);

        assert_eq!(details.run.status, RunStatus::Completed);
        assert_eq!(details.run.agent_key, "/repo");

        let event_ids: Vec<&str> = details.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(event_ids, ["e0", "e1", "e2", "e3", "e4", "e5"]);
        assert_eq!(details.events[3].kind, EventKind::ThinkingLevelChange);

        let timeline_types: Vec<&str> = details.timeline.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            timeline_types,
            ["session", "message", "custom", "thinking_level_change", "message", "custom"]
        );
        assert_eq!(details.timeline[3].summary, "Thinking level changed to: low");

        let message_ids: Vec<Option<&str>> =
            details.messages.iter().map(|m| m.id.as_deref()).collect();
        assert_eq!(message_ids, [Some("e1"), Some("e4")]);
        assert_eq!(details.messages[1].content, "ok");

        let tools: Vec<&str> = details.tool_calls.iter().map(|t| t.tool_name.as_str()).collect();
        assert_eq!(tools, ["bash", "custom"]);
        assert_eq!(details.tool_calls[0].arguments, json!({ "cmd": "ls" }));
    }

    #[test]
    fn empty_log_yields_empty_views() {
        let clock = FixedClock(datetime!(2030-01-01 00:00 UTC));
        let details = build_run_details("none", &SessionIndex::new(), &[], &clock);
        assert_eq!(details.run.agent_key, "unknown");
        assert!(details.events.is_empty());
        assert!(details.timeline.is_empty());
        assert!(details.messages.is_empty());
        assert!(details.tool_calls.is_empty());
    }
}
