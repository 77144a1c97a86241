//! pdfdrop Services Library
//!
//! The upload-then-poll-then-link workflow:
//!
//! 1. [`UploadWorkflow`] stores the selected file under `uploads/{name}`.
//! 2. [`ConversionPoller`] derives `converted/{basename}.pdf` and probes it on a
//!    fixed cadence from a cancellable background task.
//! 3. Once the object exists a single presigned GET URL is minted.
//!
//! [`ConversionSession`] ties the steps together as an explicit state machine
//! that a front end can drive and render.

pub mod error;
pub mod poll;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod upload;

pub use error::{PollError, UploadError};
pub use poll::{ConversionPoller, PollHandle, PollState, MIN_POLL_INTERVAL};
pub use session::{ConversionSession, SessionState};
pub use upload::UploadWorkflow;
