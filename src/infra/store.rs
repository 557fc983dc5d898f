use crate::domain::timestamp::{Clock, SystemClock};
use crate::domain::{
    Activity, AnalyticsOverview, Run, RunDetails, build_run_details, compute_overview, list_runs,
    recent_activity,
};
use crate::infra::{
    LineParsePolicy, LoadSessionIndexError, LoadSessionLogError, load_all_session_logs,
    load_session_index, load_session_log,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Index(#[from] LoadSessionIndexError),

    #[error(transparent)]
    Log(#[from] LoadSessionLogError),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventsPage {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub events: Vec<Value>,
}

/// Read-only view over one sessions directory.
///
/// Holds no cached data: every call reads the index and logs as they are on disk right now.
#[derive(Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    line_policy: LineParsePolicy,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions_dir", &self.sessions_dir)
            .field("line_policy", &self.line_policy)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(sessions_dir: PathBuf, line_policy: LineParsePolicy) -> Self {
        Self::with_clock(sessions_dir, line_policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        sessions_dir: PathBuf,
        line_policy: LineParsePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions_dir,
            line_policy,
            clock,
        }
    }

    pub fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let index = load_session_index(&self.sessions_dir)?;
        Ok(list_runs(&index))
    }

    pub fn run_details(&self, session_id: &str) -> Result<RunDetails, StoreError> {
        let index = load_session_index(&self.sessions_dir)?;
        let log = load_session_log(&self.sessions_dir, session_id, self.line_policy)?;
        Ok(build_run_details(
            session_id,
            &index,
            &log.records,
            self.clock.as_ref(),
        ))
    }

    /// Raw records `[offset, offset + limit)`; `total` is always the full count.
    pub fn session_events(
        &self,
        session_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<EventsPage, StoreError> {
        let log = load_session_log(&self.sessions_dir, session_id, self.line_policy)?;
        let total = log.records.len();
        let events = log.records.into_iter().skip(offset).take(limit).collect();
        Ok(EventsPage {
            total,
            limit,
            offset,
            events,
        })
    }

    pub fn overview(&self) -> Result<AnalyticsOverview, StoreError> {
        let runs = self.list_runs()?;
        let logs = load_all_session_logs(&self.sessions_dir, self.line_policy)?;
        Ok(compute_overview(&runs, &logs))
    }

    pub fn recent_activity(&self, limit: usize) -> Result<Vec<Activity>, StoreError> {
        let logs = load_all_session_logs(&self.sessions_dir, self.line_policy)?;
        Ok(recent_activity(&logs, limit, self.clock.as_ref()))
    }
}
