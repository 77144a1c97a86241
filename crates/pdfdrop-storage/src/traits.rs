//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use pdfdrop_core::ObjectInfo;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Unauthorized(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Short label used in structured logs and user notifications.
    pub fn reason(&self) -> &'static str {
        match self {
            StorageError::UploadFailed(_) => "upload",
            StorageError::NotFound(_) => "not-found",
            StorageError::Unauthorized(_) => "auth",
            StorageError::InvalidKey(_) => "invalid-key",
            StorageError::BackendError(_) => "network",
            StorageError::IoError(_) => "io",
            StorageError::ConfigError(_) => "config",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Share of `total` covered by `sent`, in whole percent.
pub fn progress_percent(sent: u64, total: u64) -> u8 {
    if total == 0 || sent >= total {
        return 100;
    }
    (u128::from(sent) * 100 / u128::from(total)) as u8
}

/// Storage abstraction trait
///
/// A storage value is bound to one bucket at construction and shared by
/// reference (`Arc<dyn Storage>`) with every workflow, so tests can swap in an
/// in-memory implementation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create or overwrite the object at `storage_key`.
    async fn upload(&self, storage_key: &str, data: Bytes, content_type: &str)
        -> StorageResult<()>;

    /// Like [`upload`](Self::upload), calling `progress` with a percentage as
    /// data is acknowledged. 100 is reported once the object is complete.
    ///
    /// Backends without part-level acknowledgement only report 100.
    async fn upload_with_progress(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> StorageResult<()> {
        self.upload(storage_key, data, content_type).await?;
        progress(100);
        Ok(())
    }

    /// Metadata-only existence probe.
    ///
    /// Absence is `Ok(false)`. Transport or permission failures are returned as
    /// errors so callers can tell them apart from "not there yet".
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Generate a presigned GET URL valid for `expires_in`.
    ///
    /// Does not check that the object exists.
    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Head the object. Absence is `StorageError::NotFound`.
    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectInfo>;

    /// Bucket (or base directory) this client is bound to.
    fn bucket(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_stable() {
        assert_eq!(StorageError::NotFound("k".into()).reason(), "not-found");
        assert_eq!(StorageError::Unauthorized("k".into()).reason(), "auth");
        assert_eq!(StorageError::BackendError("timeout".into()).reason(), "network");
        assert!(StorageError::NotFound("k".into()).is_not_found());
        assert!(!StorageError::UploadFailed("k".into()).is_not_found());
    }

    #[test]
    fn progress_percent_bounds() {
        assert_eq!(progress_percent(0, 200), 0);
        assert_eq!(progress_percent(50, 200), 25);
        assert_eq!(progress_percent(199, 200), 99);
        assert_eq!(progress_percent(200, 200), 100);
        assert_eq!(progress_percent(0, 0), 100);
        assert_eq!(progress_percent(u64::MAX - 1, u64::MAX), 99);
    }
}
