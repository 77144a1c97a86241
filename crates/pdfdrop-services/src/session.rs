//! Conversion session
//!
//! Explicit state machine behind one front-end instance:
//!
//! ```text
//! Idle -> Uploading -> Polling -> Found
//!   ^         |           |         |
//!   +---------+-----------+---------+  (upload failure, teardown, new upload)
//! ```
//!
//! At most one poll session is alive at a time. Starting a new upload cancels
//! the previous poll before anything else happens.

use std::sync::Arc;

use pdfdrop_core::{Config, SelectedFile, SignedUrl, UploadedFilename};
use pdfdrop_storage::Storage;
use tokio::sync::watch;

use crate::error::UploadError;
use crate::poll::{ConversionPoller, PollHandle, PollState};
use crate::upload::UploadWorkflow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Uploading {
        filename: String,
    },
    Polling {
        filename: UploadedFilename,
        output_key: String,
    },
    Found {
        filename: UploadedFilename,
        output_key: String,
        url: SignedUrl,
    },
}

pub struct ConversionSession {
    uploader: UploadWorkflow,
    poller: ConversionPoller,
    uploading: Option<String>,
    poll: Option<PollHandle>,
    progress: watch::Sender<u8>,
}

impl ConversionSession {
    pub fn new(uploader: UploadWorkflow, poller: ConversionPoller) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            uploader,
            poller,
            uploading: None,
            poll: None,
            progress,
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self::new(
            UploadWorkflow::new(storage.clone()),
            ConversionPoller::from_config(storage, config),
        )
    }

    /// Upload `file`, then start waiting for its converted form.
    ///
    /// Any previous poll is cancelled and the previous filename forgotten before
    /// the upload starts. On failure the session stays idle.
    pub async fn upload_file(
        &mut self,
        file: &SelectedFile,
    ) -> Result<UploadedFilename, UploadError> {
        self.teardown();
        self.uploading = Some(file.name().to_string());

        let result = self
            .uploader
            .upload_with_progress(file, Some(&self.progress))
            .await;
        self.uploading = None;

        let filename = result?;
        self.start_polling(filename.clone());
        Ok(filename)
    }

    /// Wait for a file that was uploaded earlier.
    pub fn start_polling(&mut self, filename: UploadedFilename) {
        self.teardown();
        self.poll = Some(self.poller.start(&filename));
    }

    /// Wait until the download link is available.
    ///
    /// Returns `None` when nothing is being polled or the session was torn down.
    pub async fn wait_for_link(&mut self) -> Option<SignedUrl> {
        match self.poll.as_mut() {
            Some(handle) => handle.wait_for_url().await,
            None => None,
        }
    }

    /// Cancel any live poll and return to `Idle`.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.cancel();
        }
        self.progress.send_replace(0);
    }

    pub fn state(&self) -> SessionState {
        if let Some(filename) = &self.uploading {
            return SessionState::Uploading {
                filename: filename.clone(),
            };
        }

        match &self.poll {
            Some(handle) => match handle.state() {
                PollState::Polling => SessionState::Polling {
                    filename: handle.filename().clone(),
                    output_key: handle.output_key().to_string(),
                },
                PollState::Found(url) => SessionState::Found {
                    filename: handle.filename().clone(),
                    output_key: handle.output_key().to_string(),
                    url,
                },
                PollState::Cancelled => SessionState::Idle,
            },
            None => SessionState::Idle,
        }
    }

    pub fn uploaded_filename(&self) -> Option<&UploadedFilename> {
        self.poll.as_ref().map(|h| h.filename())
    }

    pub fn signed_url(&self) -> Option<SignedUrl> {
        self.poll.as_ref().and_then(|h| h.signed_url())
    }

    /// Upload progress in percent.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ExistsAnswer, MockStorage};
    use std::time::Duration;
    use tokio::time;

    fn session(storage: &Arc<MockStorage>) -> ConversionSession {
        let storage: Arc<dyn Storage> = storage.clone();
        ConversionSession::from_config(storage, &Config::default())
    }

    fn docx(name: &str) -> SelectedFile {
        SelectedFile::new(
            name,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            b"PK\x03\x04".to_vec(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn full_workflow_reaches_found() {
        let storage = Arc::new(MockStorage::new());
        storage.script_exists([ExistsAnswer::Missing, ExistsAnswer::Missing, ExistsAnswer::Found]);
        let mut session = session(&storage);
        assert_eq!(session.state(), SessionState::Idle);

        let name = session.upload_file(&docx("report.docx")).await.unwrap();
        assert_eq!(name.as_str(), "report.docx");
        assert_eq!(session.progress(), 100);
        assert!(matches!(
            session.state(),
            SessionState::Polling { ref output_key, .. } if output_key == "converted/report.pdf"
        ));

        let url = session.wait_for_link().await.unwrap();

        assert_eq!(session.signed_url(), Some(url.clone()));
        assert!(matches!(session.state(), SessionState::Found { .. }));
        assert_eq!(storage.exists_calls().len(), 3);
        assert_eq!(storage.signed_url_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_never_polls() {
        let storage = Arc::new(MockStorage::new());
        storage.fail_uploads();
        let mut session = session(&storage);

        let err = session.upload_file(&docx("report.docx")).await.unwrap_err();
        assert_eq!(err.reason(), "upload");

        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.uploaded_filename().is_none());
        assert!(storage.exists_calls().is_empty());
        assert!(session.wait_for_link().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn new_upload_cancels_previous_poll() {
        let storage = Arc::new(MockStorage::new());
        let mut session = session(&storage);

        session.upload_file(&docx("first.docx")).await.unwrap();
        time::sleep(Duration::from_secs(25)).await;

        session.upload_file(&docx("second.docx")).await.unwrap();
        time::sleep(Duration::from_secs(25)).await;

        let calls = storage.exists_calls();
        assert_eq!(
            calls,
            vec![
                "converted/first.pdf".to_string(),
                "converted/first.pdf".to_string(),
                "converted/second.pdf".to_string(),
                "converted/second.pdf".to_string(),
            ]
        );
        assert_eq!(
            session.uploaded_filename().map(|f| f.as_str()),
            Some("second.docx")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_second_upload_still_cancels_first_poll() {
        let storage = Arc::new(MockStorage::new());
        let mut session = session(&storage);

        session.upload_file(&docx("first.docx")).await.unwrap();
        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(storage.exists_calls().len(), 1);

        storage.fail_uploads();
        assert!(session.upload_file(&docx("second.docx")).await.is_err());
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(storage.exists_calls().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_polling() {
        let storage = Arc::new(MockStorage::new());
        let mut session = session(&storage);

        session.upload_file(&docx("report.docx")).await.unwrap();
        time::sleep(Duration::from_secs(15)).await;
        session.teardown();

        time::sleep(Duration::from_secs(100)).await;

        assert_eq!(storage.exists_calls().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.progress(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_stops_polling() {
        let storage = Arc::new(MockStorage::new());
        let mut session = session(&storage);

        session.upload_file(&docx("report.docx")).await.unwrap();
        drop(session);

        time::sleep(Duration::from_secs(100)).await;
        assert!(storage.exists_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_polling_for_existing_upload() {
        let storage = Arc::new(MockStorage::new());
        storage.put_object("converted/notes.pdf", b"%PDF".to_vec());
        let mut session = session(&storage);

        session.start_polling(UploadedFilename::new("notes.txt").unwrap());
        let url = session.wait_for_link().await.unwrap();

        assert!(url.as_str().contains("converted/notes.pdf"));
        assert!(storage.uploads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_config_still_polls() {
        let storage = Arc::new(MockStorage::new());
        storage.put_object("converted/report.pdf", b"%PDF".to_vec());
        let mut config = Config::default();
        config.poll_interval_secs = 0;
        let storage_dyn: Arc<dyn Storage> = storage.clone();
        let mut session = ConversionSession::from_config(storage_dyn, &config);

        session.start_polling(UploadedFilename::new("report.docx").unwrap());
        let url = session.wait_for_link().await;

        assert!(url.is_some());
        assert_eq!(storage.exists_calls().len(), 1);
        assert!(matches!(session.state(), SessionState::Found { .. }));
    }
}
