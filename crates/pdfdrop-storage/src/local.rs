use crate::traits::{progress_percent, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use pdfdrop_core::ObjectInfo;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Progress is reported after each chunk of this size is written.
const WRITE_CHUNK_SIZE: usize = 1024 * 1024;

/// Local filesystem storage implementation
///
/// The base directory plays the role of the bucket. Useful for development
/// against a converter that watches a shared directory.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: Option<String>,
    bucket: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for objects (e.g., "/var/lib/pdfdrop")
    /// * `base_url` - Base URL the directory is served from; `file://` links
    ///   are produced when absent
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: Option<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;
        let bucket = base_path.display().to_string();

        Ok(LocalStorage {
            base_path,
            base_url,
            bucket,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Keys must be relative and may not contain `..` segments. Dots inside a
    /// segment (`converted/a..pdf`) are fine.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let relative = Path::new(storage_key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(self.base_path.join(relative))
    }

    /// Generate public URL for an object
    fn generate_url(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        match &self.base_url {
            Some(base_url) => format!("{}/{}", base_url.trim_end_matches('/'), encoded),
            None => format!("file://{}/{}", self.base_path.display(), encoded),
        }
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        self.upload_with_progress(storage_key, data, content_type, &|_: u8| {})
            .await
    }

    async fn upload_with_progress(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut written = 0usize;
        for chunk in data.chunks(WRITE_CHUNK_SIZE) {
            file.write_all(chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            written += chunk.len();
            progress(progress_percent(written as u64, size as u64).min(99));
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;
        progress(100);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn signed_url(&self, storage_key: &str, _expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(storage_key)?;
        Ok(self.generate_url(storage_key))
    }

    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        let path = self.key_to_path(storage_key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        let last_modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(ObjectInfo {
            key: storage_key.to_string(),
            size: meta.len(),
            last_modified,
            e_tag: None,
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_upload_stat() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), Some("http://localhost:3000/files".into()))
            .await
            .unwrap();

        storage
            .upload("uploads/test.txt", Bytes::from_static(b"test data"), "text/plain")
            .await
            .unwrap();

        let info = storage.stat("uploads/test.txt").await.unwrap();
        assert_eq!(info.key, "uploads/test.txt");
        assert_eq!(info.size, 9);

        let on_disk = std::fs::read(dir.path().join("uploads/test.txt")).unwrap();
        assert_eq!(on_disk, b"test data");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        let result = storage.stat("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .upload("../escape.txt", Bytes::from_static(b"x"), "text/plain")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        assert!(!storage.exists("converted/a..pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_exists() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        assert!(!storage.exists("converted/report.pdf").await.unwrap());

        storage
            .upload("converted/report.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        assert!(storage.exists("converted/report.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_stat_missing() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        let result = storage.stat("converted/missing.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_signed_url_uses_base_url_and_encodes_key() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), Some("http://localhost:3000/files/".into()))
            .await
            .unwrap();

        let url = storage
            .signed_url("converted/my report.pdf", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/files/converted/my%20report.pdf");
    }

    #[tokio::test]
    async fn test_signed_url_falls_back_to_file_scheme() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        let url = storage
            .signed_url("converted/report.pdf", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/converted/report.pdf"));
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[tokio::test]
    async fn test_upload_reports_progress_per_chunk() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();
        let data = Bytes::from(vec![7u8; 3 * WRITE_CHUNK_SIZE]);
        let seen = std::sync::Mutex::new(Vec::new());

        storage
            .upload_with_progress("uploads/big.bin", data, "application/octet-stream", &|p: u8| {
                seen.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![33, 66, 99, 100]);
        assert_eq!(storage.stat("uploads/big.bin").await.unwrap().size, 3 * WRITE_CHUNK_SIZE as u64);
    }

    #[tokio::test]
    async fn test_empty_upload_reports_completion() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();
        let seen = std::sync::Mutex::new(Vec::new());

        storage
            .upload_with_progress("uploads/empty.txt", Bytes::new(), "text/plain", &|p: u8| {
                seen.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}
