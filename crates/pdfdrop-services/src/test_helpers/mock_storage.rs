//! Mock Storage implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use pdfdrop_core::ObjectInfo;
use pdfdrop_storage::{progress_percent, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted answer to one `exists` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsAnswer {
    Found,
    Missing,
    /// Transport failure.
    Fail,
    /// Permission failure.
    Denied,
}

/// Mock storage implementation that stores objects in memory
///
/// `exists` consumes scripted answers first and falls back to the stored
/// objects once the script is exhausted.
pub struct MockStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    exists_script: Mutex<VecDeque<ExistsAnswer>>,
    exists_delay: Mutex<Option<Duration>>,
    part_size: Mutex<Option<usize>>,
    exists_calls: Mutex<Vec<String>>,
    signed_url_calls: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, String)>>,
    fail_uploads: AtomicBool,
    fail_signing: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            exists_script: Mutex::new(VecDeque::new()),
            exists_delay: Mutex::new(None),
            part_size: Mutex::new(None),
            exists_calls: Mutex::new(Vec::new()),
            signed_url_calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
            fail_signing: AtomicBool::new(false),
        }
    }

    /// Queue answers for the next `exists` calls.
    pub fn script_exists(&self, answers: impl IntoIterator<Item = ExistsAnswer>) {
        self.exists_script.lock().unwrap().extend(answers);
    }

    /// Make every `exists` call take `delay` of (tokio) time before answering.
    pub fn set_exists_delay(&self, delay: Duration) {
        *self.exists_delay.lock().unwrap() = Some(delay);
    }

    /// Acknowledge uploads in parts of `size` bytes, one (tokio) second apart.
    pub fn set_part_size(&self, size: Option<usize>) {
        *self.part_size.lock().unwrap() = size.filter(|s| *s > 0);
    }

    /// With parts enabled, the first part still succeeds.
    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn fail_signing(&self, fail: bool) {
        self.fail_signing.store(fail, Ordering::SeqCst);
    }

    /// Set an object directly, as the converter would.
    pub fn put_object(&self, key: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.into(), "application/pdf".to_string()));
    }

    /// Get object data (for test assertions)
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
    }

    /// Keys passed to `exists`, in call order.
    pub fn exists_calls(&self) -> Vec<String> {
        self.exists_calls.lock().unwrap().clone()
    }

    /// Keys passed to `signed_url`, in call order.
    pub fn signed_url_calls(&self) -> Vec<String> {
        self.signed_url_calls.lock().unwrap().clone()
    }

    /// `(key, content_type)` of every successful upload.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("connection reset".to_string()));
        }

        self.objects.lock().unwrap().insert(
            storage_key.to_string(),
            (data, content_type.to_string()),
        );
        self.uploads
            .lock()
            .unwrap()
            .push((storage_key.to_string(), content_type.to_string()));
        Ok(())
    }

    async fn upload_with_progress(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> StorageResult<()> {
        let part_size = *self.part_size.lock().unwrap();
        if let Some(part_size) = part_size {
            let total = data.len();
            let mut sent = 0;
            while sent < total {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if sent > 0 && self.fail_uploads.load(Ordering::SeqCst) {
                    return Err(StorageError::UploadFailed("part rejected".to_string()));
                }
                sent = (sent + part_size).min(total);
                progress(progress_percent(sent as u64, total as u64).min(99));
            }
        }

        self.upload(storage_key, data, content_type).await?;
        progress(100);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.exists_calls
            .lock()
            .unwrap()
            .push(storage_key.to_string());

        let delay = *self.exists_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.exists_script.lock().unwrap().pop_front();
        match scripted {
            Some(ExistsAnswer::Found) => Ok(true),
            Some(ExistsAnswer::Missing) => Ok(false),
            Some(ExistsAnswer::Fail) => Err(StorageError::BackendError("timed out".to_string())),
            Some(ExistsAnswer::Denied) => Err(StorageError::Unauthorized("403".to_string())),
            None => Ok(self.objects.lock().unwrap().contains_key(storage_key)),
        }
    }

    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        self.signed_url_calls
            .lock()
            .unwrap()
            .push(storage_key.to_string());

        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("credentials expired".to_string()));
        }

        Ok(format!(
            "https://example.com/presigned/{}?expires={}",
            storage_key,
            expires_in.as_secs()
        ))
    }

    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, _)| ObjectInfo {
                key: storage_key.to_string(),
                size: data.len() as u64,
                last_modified: chrono::Utc::now(),
                e_tag: None,
            })
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    fn bucket(&self) -> &str {
        "mock-bucket"
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
