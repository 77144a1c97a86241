use crate::traits::{progress_percent, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMultipartOptions, PutOptions,
    PutPayload, Result as ObjectResult,
};
use pdfdrop_core::{ObjectInfo, StorageConfig};
use std::time::Duration;

/// Payloads above this size go through a multipart upload.
const MULTIPART_THRESHOLD: usize = 5 * 1024 * 1024; // 5MB
/// Part size for multipart uploads (S3 minimum except for the last part).
const PART_SIZE: usize = 5 * 1024 * 1024;

fn content_type_attributes(content_type: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());
    attributes
}

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// Settings not present in `config` (session tokens, profile-less
    /// credentials, ...) are picked up from the standard AWS environment
    /// variables. Explicit credentials in `config` take precedence.
    ///
    /// A custom endpoint targets S3-compatible providers
    /// (e.g., "http://localhost:9000" for MinIO); plain HTTP is allowed only
    /// when the endpoint itself is `http://`.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket()
            .map(String::from)
            .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
        let region = config.region().to_string();

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let (Some(key_id), Some(secret)) = (config.access_key_id(), config.secret_access_key()) {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        if let Some(endpoint) = config.endpoint() {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn map_error(&self, storage_key: &str, e: ObjectStoreError) -> StorageError {
        match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            ObjectStoreError::PermissionDenied { .. } | ObjectStoreError::Unauthenticated { .. } => {
                StorageError::Unauthorized(e.to_string())
            }
            other => StorageError::BackendError(other.to_string()),
        }
    }

    fn upload_error(&self, storage_key: &str, e: ObjectStoreError) -> StorageError {
        match self.map_error(storage_key, e) {
            StorageError::BackendError(msg) => StorageError::UploadFailed(msg),
            other => other,
        }
    }

    /// Upload `data` in [`PART_SIZE`] parts, one at a time, reporting progress
    /// after each acknowledged part. The upload is aborted on failure.
    async fn upload_multipart(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> StorageResult<()> {
        let total = data.len();
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let opts = PutMultipartOptions {
            attributes: content_type_attributes(content_type),
            ..Default::default()
        };
        let mut upload = self
            .store
            .put_multipart_opts(&location, opts)
            .await
            .map_err(|e| self.upload_error(storage_key, e))?;

        let mut sent = 0usize;
        let mut part_number = 0usize;

        while sent < total {
            let end = (sent + PART_SIZE).min(total);
            part_number += 1;

            if let Err(e) = upload.put_part(PutPayload::from(data.slice(sent..end))).await {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    part_number = part_number,
                    "Failed to upload part"
                );
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(error = %abort_err, key = %storage_key, "Failed to abort multipart upload");
                }
                return Err(self.upload_error(storage_key, e));
            }

            sent = end;
            // 100 is reserved for the completed object.
            progress(progress_percent(sent as u64, total as u64).min(99));
        }

        if let Err(e) = upload.complete().await {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                "Failed to complete multipart upload"
            );
            if let Err(abort_err) = upload.abort().await {
                tracing::warn!(error = %abort_err, key = %storage_key, "Failed to abort multipart upload");
            }
            return Err(self.upload_error(storage_key, e));
        }
        progress(100);

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes = total as u64,
            parts = part_number,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload successful"
        );

        Ok(())
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let opts = PutOptions {
            attributes: content_type_attributes(content_type),
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            self.upload_error(storage_key, e)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn upload_with_progress(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> StorageResult<()> {
        if data.len() > MULTIPART_THRESHOLD {
            return self
                .upload_multipart(storage_key, data, content_type, progress)
                .await;
        }

        self.upload(storage_key, data, content_type).await?;
        progress(100);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(self.map_error(storage_key, e)),
        }
    }

    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Path::from(storage_key.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| self.map_error(storage_key, e))?
            .to_string();

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            expires_in_seconds = expires_in.as_secs(),
            "Generated presigned GET URL"
        );

        Ok(url)
    }

    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        let location = Path::from(storage_key.to_string());
        let meta = self
            .store
            .head(&location)
            .await
            .map_err(|e| self.map_error(storage_key, e))?;

        Ok(ObjectInfo {
            key: storage_key.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
            e_tag: meta.e_tag,
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig {
            bucket: Some("pdfdrop-test".to_string()),
            region: Some("eu-west-1".to_string()),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn builds_from_explicit_config() {
        let storage = S3Storage::new(&config()).unwrap();
        assert_eq!(storage.bucket(), "pdfdrop-test");
        assert_eq!(storage.region(), "eu-west-1");
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }

    #[test]
    fn missing_bucket_is_config_error() {
        let mut config = config();
        config.bucket = None;
        assert!(matches!(
            S3Storage::new(&config),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn signed_url_is_offline_and_scoped_to_key() {
        let storage = S3Storage::new(&config()).unwrap();
        let url = storage
            .signed_url("converted/report.pdf", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/"));
        assert!(url.contains("converted/report.pdf?"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }
}
