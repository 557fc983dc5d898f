use crate::domain::event::str_field;
use crate::domain::timestamp::{Clock, epoch_millis_to_instant, normalize_timestamp};
use crate::domain::{IndexEntry, Run, RunStatus, SessionIndex};
use serde_json::Value;

const UNKNOWN_AGENT: &str = "unknown";

/// Builds a run from an index entry. `id` becomes both `id` and `session_id`.
pub fn run_from_index_entry(id: &str, agent_key: &str, entry: &IndexEntry) -> Run {
    let status = if entry.aborted_last_run.unwrap_or(false) {
        RunStatus::Aborted
    } else {
        RunStatus::Active
    };

    Run {
        id: id.to_string(),
        session_id: id.to_string(),
        agent_key: agent_key.to_string(),
        label: Some(label_for(agent_key, entry.label.as_deref())),
        status,
        model: entry.model.clone(),
        model_provider: entry.model_provider.clone(),
        channel: entry.channel.clone(),
        spawned_by: entry.spawned_by.clone(),
        input_tokens: entry.input_tokens.unwrap_or(0),
        output_tokens: entry.output_tokens.unwrap_or(0),
        total_tokens: entry.total_tokens.unwrap_or(0),
        created_at: epoch_millis_to_instant(entry.created_at.as_ref()),
        updated_at: epoch_millis_to_instant(entry.updated_at.as_ref()),
        origin_label: entry.origin.as_ref().and_then(|origin| origin.label.clone()),
        session_file: entry.session_file.clone(),
    }
}

/// Explicit label, or the last `:`-separated segment of the agent key.
fn label_for(agent_key: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => agent_key.rsplit(':').next().unwrap_or(agent_key).to_string(),
    }
}

/// One run per index entry. Log files are not consulted, so orphan logs are not listed.
pub fn list_runs(index: &SessionIndex) -> Vec<Run> {
    index
        .iter()
        .map(|(agent_key, entry)| {
            let id = entry.session_id.as_deref().unwrap_or(agent_key);
            run_from_index_entry(id, agent_key, entry)
        })
        .collect()
}

/// Resolves the run for `session_id`.
///
/// Precedence: a matching index entry, then a run reconstructed from the log records, then a
/// bare placeholder. A run is always returned.
pub fn project_run(
    session_id: &str,
    index: &SessionIndex,
    records: &[Value],
    clock: &dyn Clock,
) -> Run {
    if let Some((agent_key, entry)) = index
        .iter()
        .find(|(agent_key, entry)| entry.matches_session(agent_key, session_id))
    {
        return run_from_index_entry(session_id, agent_key, entry);
    }

    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Run::bare(session_id, UNKNOWN_AGENT, RunStatus::Completed);
    };

    let agent_key = str_field(first, "cwd").unwrap_or(UNKNOWN_AGENT);
    let mut run = Run::bare(session_id, agent_key, RunStatus::Completed);
    run.created_at = Some(normalize_timestamp(first.get("timestamp"), clock));
    run.updated_at = Some(normalize_timestamp(last.get("timestamp"), clock));
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_session_index;
    use crate::domain::timestamp::FixedClock;
    use serde_json::json;
    use time::macros::datetime;

    fn clock() -> FixedClock {
        FixedClock(datetime!(2030-01-01 00:00 UTC))
    }

    fn sample_index() -> SessionIndex {
        parse_session_index(
            r#"{
                "agent:main:discord:42": {
                    "sessionId": "s1",
                    "model": "claude-x",
                    "channel": "discord",
                    "totalTokens": 30,
                    "createdAt": 1771451157762,
                    "updatedAt": 0
                },
                "agent:main:cron": {
                    "sessionId": "s2",
                    "label": "Nightly",
                    "abortedLastRun": true
                },
                "plain-key": {}
            }"#,
        )
        .expect("index")
    }

    #[test]
    fn lists_one_run_per_index_entry() {
        let runs = list_runs(&sample_index());
        assert_eq!(runs.len(), 3);

        let by_id = |id: &str| runs.iter().find(|run| run.id == id).expect("run");

        let s1 = by_id("s1");
        assert_eq!(s1.session_id, "s1");
        assert_eq!(s1.label.as_deref(), Some("42"));
        assert_eq!(s1.status, RunStatus::Active);
        assert_eq!(s1.total_tokens, 30);
        assert_eq!(s1.created_at, Some(datetime!(2026-02-18 21:45:57.762 UTC)));
        assert_eq!(s1.updated_at, None);

        let s2 = by_id("s2");
        assert_eq!(s2.label.as_deref(), Some("Nightly"));
        assert_eq!(s2.status, RunStatus::Aborted);

        let plain = by_id("plain-key");
        assert_eq!(plain.agent_key, "plain-key");
        assert_eq!(plain.label.as_deref(), Some("plain-key"));
        assert_eq!(plain.input_tokens, 0);
    }

    #[test]
    fn index_match_by_session_id_or_key() {
        let index = sample_index();
        let by_session = project_run("s2", &index, &[], &clock());
        assert_eq!(by_session.agent_key, "agent:main:cron");
        assert_eq!(by_session.status, RunStatus::Aborted);

        let by_key = project_run("plain-key", &index, &[], &clock());
        assert_eq!(by_key.id, "plain-key");
        assert_eq!(by_key.status, RunStatus::Active);
    }

    #[test]
    fn index_wins_over_log_records() {
        let records = vec![json!({ "type": "session", "cwd": "/elsewhere" })];
        let run = project_run("s1", &sample_index(), &records, &clock());
        assert_eq!(run.agent_key, "agent:main:discord:42");
        assert_eq!(run.status, RunStatus::Active);
    }

    #[test]
    fn reconstructs_run_from_log_only_session() {
        let records = vec![
            json!({ "type": "session", "cwd": "/work/repo", "timestamp": "2026-02-18T10:00:00Z" }),
            json!({ "type": "message", "timestamp": "2026-02-18T10:05:00Z" }),
            json!({ "type": "custom", "timestamp": "2026-02-18T10:09:30.5Z" }),
        ];
        let run = project_run("orphan", &SessionIndex::new(), &records, &clock());
        assert_eq!(run.id, "orphan");
        assert_eq!(run.agent_key, "/work/repo");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.created_at, Some(datetime!(2026-02-18 10:00 UTC)));
        assert_eq!(run.updated_at, Some(datetime!(2026-02-18 10:09:30.5 UTC)));
        assert_eq!(run.label, None);
    }

    #[test]
    fn synthesizes_placeholder_when_nothing_is_known() {
        let run = project_run("ghost", &SessionIndex::new(), &[], &clock());
        assert_eq!(run.id, "ghost");
        assert_eq!(run.agent_key, "unknown");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.created_at, None);
    }
}
