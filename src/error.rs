// Error types for the upload agent

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Everything that can end a single upload attempt, walk or ledger access.
///
/// None of these stop the agent on their own: the pipeline logs them and
/// moves on to the next file (or the next tick).
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger error on {path}: {source}")]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error walking through the directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Error parsing JSON body data: {0}")]
    Body(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl UploadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn ledger(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::Ledger {
            path: path.into(),
            source,
        }
    }
}
