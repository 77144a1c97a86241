//! Bucket layout and workflow defaults.

/// Prefix under which user files are uploaded: `uploads/{filename}`.
pub const UPLOAD_PREFIX: &str = "uploads";

/// Prefix under which the converter writes its output: `converted/{basename}.pdf`.
pub const OUTPUT_PREFIX: &str = "converted";

/// Extension of every converted object.
pub const OUTPUT_EXTENSION: &str = "pdf";

/// Seconds between two existence checks while waiting for a conversion.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Lifetime of a download link.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Content type used when the declared type of a file cannot be guessed.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
