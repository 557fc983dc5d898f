use crate::domain::SessionLogs;
use crate::infra::SESSION_INDEX_FILE_NAME;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const SESSION_LOG_EXTENSION: &str = "jsonl";

/// How malformed JSONL lines are handled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineParsePolicy {
    /// The first malformed line fails the whole read.
    #[default]
    Strict,
    /// Malformed lines are skipped and counted.
    Lenient,
}

#[derive(Debug, Error)]
pub enum LoadSessionLogError {
    #[error("failed to read session log {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid json in {path} at line {line}: {source}")]
    InvalidJson {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to list sessions directory {path}: {source}")]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionLog {
    pub records: Vec<Value>,
    pub skipped_lines: usize,
}

/// Finds the log for `session_id`: `{id}.jsonl`, then a file named exactly `{id}`.
///
/// Ids that could escape the sessions directory resolve to nothing.
pub fn resolve_session_log_path(sessions_dir: &Path, session_id: &str) -> Option<PathBuf> {
    if !is_plain_file_name(session_id) {
        return None;
    }

    let with_extension = sessions_dir.join(format!("{session_id}.{SESSION_LOG_EXTENSION}"));
    if with_extension.is_file() {
        return Some(with_extension);
    }
    let bare = sessions_dir.join(session_id);
    if bare.is_file() {
        return Some(bare);
    }
    None
}

fn is_plain_file_name(value: &str) -> bool {
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Loads one session's records. No log file means no records.
pub fn load_session_log(
    sessions_dir: &Path,
    session_id: &str,
    policy: LineParsePolicy,
) -> Result<SessionLog, LoadSessionLogError> {
    match resolve_session_log_path(sessions_dir, session_id) {
        Some(path) => read_session_log_file(&path, policy),
        None => Ok(SessionLog::default()),
    }
}

pub fn read_session_log_file(
    path: &Path,
    policy: LineParsePolicy,
) -> Result<SessionLog, LoadSessionLogError> {
    let read_error = |source| LoadSessionLogError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let reader = BufReader::new(file);

    let mut log = SessionLog::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(read_error)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => log.records.push(value),
            Err(_) if policy == LineParsePolicy::Lenient => log.skipped_lines += 1,
            Err(source) => {
                return Err(LoadSessionLogError::InvalidJson {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                });
            }
        }
    }

    if log.skipped_lines > 0 {
        tracing::warn!(
            path = %path.display(),
            skipped = log.skipped_lines,
            "skipped malformed session log lines"
        );
    }
    Ok(log)
}

/// Loads every `*.jsonl` file directly inside the sessions directory, keyed by file stem.
/// Sessions without records are left out; a missing directory yields nothing.
pub fn load_all_session_logs(
    sessions_dir: &Path,
    policy: LineParsePolicy,
) -> Result<SessionLogs, LoadSessionLogError> {
    let mut logs = SessionLogs::new();
    if !sessions_dir.is_dir() {
        return Ok(logs);
    }

    let walker = WalkDir::new(sessions_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| LoadSessionLogError::List {
            path: sessions_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_LOG_EXTENSION) {
            continue;
        }
        if path.file_name().and_then(|name| name.to_str()) == Some(SESSION_INDEX_FILE_NAME) {
            continue;
        }
        let Some(session_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let log = read_session_log_file(path, policy)?;
        if !log.records.is_empty() {
            logs.insert(session_id.to_string(), log.records);
        }
    }

    Ok(logs)
}
