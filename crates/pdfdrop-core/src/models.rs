//! Domain models
//!
//! The values that flow through one conversion: the file the user picked, the
//! name it was uploaded under, the metadata of a stored object and the download
//! link minted for the converted output.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::constants::DEFAULT_CONTENT_TYPE;

/// A file chosen by the user, held in memory until it is uploaded.
#[derive(Clone)]
pub struct SelectedFile {
    name: String,
    content_type: String,
    content: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk.
    ///
    /// The name is the final path component and the content type is guessed
    /// from its extension, falling back to `application/octet-stream`.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} does not name a file", path.display()),
                )
            })?;

        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let content = tokio::fs::read(path).await?;

        Ok(Self::new(name, content_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.content.len())
            .finish()
    }
}

/// Original name of a file that was uploaded successfully.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UploadedFilename(String);

impl UploadedFilename {
    /// Returns `None` for an empty name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UploadedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UploadedFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Time-limited download link for a converted object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    url: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SignedUrl {
    /// Wrap a freshly minted URL valid for `ttl` from now.
    pub fn new(url: impl Into<String>, ttl: Duration) -> Self {
        Self::issued_at(url, Utc::now(), ttl)
    }

    pub fn issued_at(url: impl Into<String>, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            url: url.into(),
            issued_at,
            expires_at,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn issued(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expired links are not refreshed; the user has to start over from upload.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Metadata of a stored object, as returned by a head request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub e_tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn uploaded_filename_rejects_empty() {
        assert!(UploadedFilename::new("").is_none());
        let name = UploadedFilename::new("report.docx").unwrap();
        assert_eq!(name.as_str(), "report.docx");
        assert_eq!(name.to_string(), "report.docx");
    }

    #[test]
    fn selected_file_debug_omits_content() {
        let file = SelectedFile::new("a.txt", "text/plain", b"secret body".to_vec());
        let debug = format!("{:?}", file);
        assert!(debug.contains("a.txt"));
        assert!(debug.contains("size_bytes: 11"));
        assert!(!debug.contains("secret body"));
    }

    #[tokio::test]
    async fn selected_file_from_path_guesses_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"docx bytes").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "report.docx");
        assert_eq!(
            file.content_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(file.content().as_ref(), b"docx bytes");
        assert_eq!(file.size(), 10);
    }

    #[tokio::test]
    async fn selected_file_unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzzunknown");
        std::fs::write(&path, b"x").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.content_type(), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn selected_file_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SelectedFile::from_path(&dir.path().join("missing.txt")).await;
        assert!(result.is_err());
    }

    #[test]
    fn signed_url_expiry() {
        let issued = Utc::now();
        let url = SignedUrl::issued_at("https://example.com/x", issued, Duration::from_secs(3600));
        assert_eq!(url.expires_at() - url.issued(), TimeDelta::seconds(3600));
        assert!(!url.is_expired_at(issued + TimeDelta::seconds(3599)));
        assert!(url.is_expired_at(issued + TimeDelta::seconds(3600)));
        assert_eq!(url.as_str(), "https://example.com/x");
    }
}
