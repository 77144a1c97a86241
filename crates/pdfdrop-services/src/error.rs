//! Workflow error types
//!
//! Only upload failures reach the user. Poll failures are logged and the
//! session keeps waiting.

use pdfdrop_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Selected file has no name")]
    EmptyFilename,

    #[error("Upload of {filename} failed: {source}")]
    Store {
        filename: String,
        #[source]
        source: StorageError,
    },
}

impl UploadError {
    pub fn reason(&self) -> &'static str {
        match self {
            UploadError::EmptyFilename => "invalid-file",
            UploadError::Store { source, .. } => source.reason(),
        }
    }
}

/// A single failed step while waiting for a conversion. Never terminal.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Existence check for {key} failed: {source}")]
    Check {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Signing {key} failed: {source}")]
    Sign {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl PollError {
    pub fn reason(&self) -> &'static str {
        match self {
            PollError::Check { source, .. } | PollError::Sign { source, .. } => source.reason(),
        }
    }
}
