//! Error types for pdl.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::range::ByteRange;

pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("unexpected HTTP status {status} from {url}{}", range_suffix(.range))]
    UnexpectedStatus {
        url: String,
        status: u16,
        range: Option<ByteRange>,
    },

    /// The server answered a ranged GET with a full-success status but a body
    /// that does not match the requested span.
    #[error("server did not honor range {range}: expected {expected} bytes, got {actual}")]
    RangeNotHonored {
        range: ByteRange,
        expected: u64,
        actual: u64,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientSetup(String),

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

fn range_suffix(range: &Option<ByteRange>) -> String {
    match range {
        Some(r) => format!(" (Range: {})", r),
        None => String::new(),
    }
}

impl DownloadError {
    pub(crate) fn network(url: &str, err: impl std::fmt::Display) -> Self {
        DownloadError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for DownloadError {
    fn from(e: tokio::task::JoinError) -> Self {
        DownloadError::TaskFailed(e.to_string())
    }
}
