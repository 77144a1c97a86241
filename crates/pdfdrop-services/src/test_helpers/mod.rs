//! Test helpers for workflow tests
//!
//! An in-memory Storage with scripted existence answers and call recording,
//! so the poll cadence can be checked under paused tokio time.

pub mod mock_storage;

pub use mock_storage::*;
