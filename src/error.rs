use std::path::PathBuf;

use thiserror::Error;

/// Fatal at startup or registry lookup; never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid browser: {0}")]
    InvalidBrowser(String),
    #[error("duplicate browser id: {0}")]
    DuplicateBrowser(String),
    #[error("profile root is not set: {var}")]
    MissingRoot { var: &'static str },
    #[error("invalid profile pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("history database not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("no profile matching {pattern:?} in {}", .dir.display())]
    ProfileNotFound { dir: PathBuf, pattern: String },
    #[error("history database is locked: {}: {source}", .path.display())]
    SourceLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("permission denied reading {}: {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("limit must be a positive integer")]
    InvalidLimit,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// True when the caller should show "no history right now" instead of failing.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            ExtractError::SourceNotFound(_)
                | ExtractError::ProfileNotFound { .. }
                | ExtractError::SourceLocked { .. }
                | ExtractError::PermissionDenied { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("failed to remove temporary copy {} after {attempts} attempts: {source}", .path.display())]
    FailedCleanup {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure reported alongside an extraction result.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Cleanup(#[from] CleanupError),
}

impl HistoryError {
    pub fn is_no_data(&self) -> bool {
        match self {
            HistoryError::Extract(err) => err.is_no_data(),
            HistoryError::Cleanup(_) => false,
        }
    }
}
