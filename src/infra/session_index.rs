use crate::domain::{SessionIndex, parse_session_index};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SESSION_INDEX_FILE_NAME: &str = "sessions.json";

#[derive(Debug, Error)]
pub enum LoadSessionIndexError {
    #[error("failed to read session index {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse session index {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn session_index_path(sessions_dir: &Path) -> PathBuf {
    sessions_dir.join(SESSION_INDEX_FILE_NAME)
}

/// Loads `sessions.json`. A missing file is an empty index.
pub fn load_session_index(sessions_dir: &Path) -> Result<SessionIndex, LoadSessionIndexError> {
    let path = session_index_path(sessions_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(SessionIndex::default());
        }
        Err(source) => return Err(LoadSessionIndexError::Read { path, source }),
    };

    parse_session_index(&raw).map_err(|source| LoadSessionIndexError::Parse { path, source })
}
