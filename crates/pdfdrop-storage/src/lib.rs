//! pdfdrop Storage Library
//!
//! This crate provides the object store client used by the conversion
//! workflows: the `Storage` trait and its S3 and local filesystem backends.
//!
//! # Key layout
//!
//! Every backend is bound to a single bucket (or base directory) holding two
//! prefixes:
//!
//! - **Input**: `uploads/{filename}`
//! - **Output**: `converted/{basename}.pdf`
//!
//! Key generation is centralized in the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{derive_output_key, upload_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pdfdrop_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{progress_percent, Storage, StorageError, StorageResult};
