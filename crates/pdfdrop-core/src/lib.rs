//! pdfdrop Core Library
//!
//! This crate provides the domain models, configuration and constants shared by
//! the storage backends, the conversion workflows and the command-line front end.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, StorageConfig};
pub use models::{ObjectInfo, SelectedFile, SignedUrl, UploadedFilename};
pub use storage_types::StorageBackend;
