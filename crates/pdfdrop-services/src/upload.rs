use std::sync::Arc;

use pdfdrop_core::{SelectedFile, UploadedFilename};
use pdfdrop_storage::{upload_key, Storage};
use tokio::sync::watch;

use crate::error::UploadError;

/// Stores a user-selected file under `uploads/{name}`.
#[derive(Clone)]
pub struct UploadWorkflow {
    storage: Arc<dyn Storage>,
}

impl UploadWorkflow {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Upload `file` and return its original name.
    ///
    /// The returned value is the filename the user picked, not the storage key.
    /// Failures are terminal for this attempt; nothing is retried or cleaned up.
    pub async fn upload(&self, file: &SelectedFile) -> Result<UploadedFilename, UploadError> {
        self.upload_with_progress(file, None).await
    }

    /// Same as [`upload`](Self::upload), publishing a 0-100 percentage to `progress`.
    ///
    /// Intermediate values follow the parts the backend acknowledges. On
    /// failure progress falls back to 0.
    pub async fn upload_with_progress(
        &self,
        file: &SelectedFile,
        progress: Option<&watch::Sender<u8>>,
    ) -> Result<UploadedFilename, UploadError> {
        let filename = UploadedFilename::new(file.name()).ok_or(UploadError::EmptyFilename)?;
        let key = upload_key(filename.as_str());

        let report = |percent: u8| {
            if let Some(progress) = progress {
                progress.send_replace(percent);
            }
        };
        report(0);

        tracing::debug!(
            bucket = %self.storage.bucket(),
            key = %key,
            content_type = %file.content_type(),
            size_bytes = file.size(),
            "Uploading selected file"
        );

        self.storage
            .upload_with_progress(&key, file.content().clone(), file.content_type(), &report)
            .await
            .map_err(|source| {
                report(0);
                tracing::warn!(
                    error = %source,
                    reason = source.reason(),
                    key = %key,
                    "Upload failed"
                );
                UploadError::Store {
                    filename: filename.to_string(),
                    source,
                }
            })?;

        Ok(filename)
    }
}
