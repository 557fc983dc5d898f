use crate::domain::event::{raw_event_type, summarize_event};
use crate::domain::timestamp::{Clock, normalize_timestamp};
use crate::domain::{Activity, AnalyticsOverview, ChannelRunSummary, Run, RunStatus};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 20;
const RECENT_RECORDS_PER_SESSION: usize = 5;
const UNKNOWN_CHANNEL: &str = "unknown";

/// Session id → records, as read from the sessions directory.
pub type SessionLogs = BTreeMap<String, Vec<Value>>;

pub fn compute_overview(runs: &[Run], logs: &SessionLogs) -> AnalyticsOverview {
    let total_sessions = runs.len();
    let active_sessions = runs
        .iter()
        .filter(|run| run.status == RunStatus::Active)
        .count();
    let aborted_sessions = runs
        .iter()
        .filter(|run| run.status == RunStatus::Aborted)
        .count();
    let total_tokens = runs
        .iter()
        .fold(0u64, |sum, run| sum.saturating_add(run.total_tokens));
    let total_events = logs.values().map(Vec::len).sum();

    let mut by_channel: BTreeMap<String, Vec<ChannelRunSummary>> = BTreeMap::new();
    for run in runs {
        let channel = run.channel.as_deref().unwrap_or(UNKNOWN_CHANNEL);
        by_channel
            .entry(channel.to_string())
            .or_default()
            .push(ChannelRunSummary {
                id: run.id.clone(),
                label: run.label.clone(),
                model: run.model.clone(),
                tokens: run.total_tokens,
            });
    }

    let models_used: BTreeSet<&str> = runs
        .iter()
        .filter_map(|run| run.model.as_deref())
        .filter(|model| !model.is_empty())
        .collect();

    AnalyticsOverview {
        total_sessions,
        active_sessions,
        completed_sessions: total_sessions - active_sessions,
        aborted_sessions,
        total_tokens,
        total_events,
        by_channel,
        models_used: models_used.into_iter().map(str::to_string).collect(),
    }
}

/// The newest `limit` entries among the last few records of every session, newest first.
pub fn recent_activity(logs: &SessionLogs, limit: usize, clock: &dyn Clock) -> Vec<Activity> {
    let mut activities: Vec<Activity> = logs
        .iter()
        .flat_map(|(session_id, records)| {
            let tail_start = records.len().saturating_sub(RECENT_RECORDS_PER_SESSION);
            records[tail_start..].iter().map(move |record| Activity {
                session_id: session_id.clone(),
                kind: raw_event_type(record).to_string(),
                timestamp: normalize_timestamp(record.get("timestamp"), clock),
                summary: summarize_event(record),
            })
        })
        .collect();

    // Stable sort keeps session order for equal timestamps.
    activities.sort_by_key(|activity| Reverse(activity.timestamp));
    activities.truncate(limit);
    activities
}
