//! Configuration module
//!
//! Configuration is read once from the environment (and an optional `.env`
//! file) into explicit values that are handed to the storage factory and the
//! workflows. Nothing here is process-global.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REGION, DEFAULT_SIGNED_URL_TTL_SECS};
use crate::storage_types::StorageBackend;

/// Object storage configuration
#[derive(Clone, Default)]
pub struct StorageConfig {
    pub backend: Option<StorageBackend>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        self.backend.unwrap_or(StorageBackend::S3)
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }
}

// Credentials stay out of logs.
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("local_storage_path", &self.local_storage_path)
            .field("local_storage_base_url", &self.local_storage_base_url)
            .finish()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub poll_interval_secs: u64,
    pub signed_url_ttl_secs: u64,
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = non_empty("STORAGE_BACKEND")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?;

        let storage = StorageConfig {
            backend,
            bucket: non_empty("S3_BUCKET"),
            region: non_empty("S3_REGION").or_else(|| non_empty("AWS_REGION")),
            endpoint: non_empty("S3_ENDPOINT"),
            access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            local_storage_base_url: non_empty("LOCAL_STORAGE_BASE_URL"),
        };

        let poll_interval_secs = match non_empty("POLL_INTERVAL_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("POLL_INTERVAL_SECS must be a valid number"))?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        let signed_url_ttl_secs = match non_empty("SIGNED_URL_TTL_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SIGNED_URL_TTL_SECS must be a valid number"))?,
            None => DEFAULT_SIGNED_URL_TTL_SECS,
        };

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        Ok(Config {
            storage,
            poll_interval_secs,
            signed_url_ttl_secs,
            environment,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("POLL_INTERVAL_SECS must be greater than zero"));
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than zero"));
        }

        match self.storage.backend() {
            StorageBackend::S3 => {
                if self.storage.bucket().is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.storage.access_key_id().is_some()
                    != self.storage.secret_access_key().is_some()
                {
                    return Err(anyhow::anyhow!(
                        "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path().is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local backend"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}
