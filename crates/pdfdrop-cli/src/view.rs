//! Text rendering of the conversion workflow.
//!
//! Everything here is a pure function of [`ViewModel`]; the binary decides when
//! to print a frame.

use pdfdrop_core::SelectedFile;
use pdfdrop_services::{ConversionSession, SessionState};

pub const WAITING_MESSAGE: &str = "Waiting for PDF conversion, this takes at most 30 seconds";

const PROGRESS_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    UploadSucceeded,
    UploadFailed(String),
}

impl Notification {
    pub fn message(&self) -> String {
        match self {
            Notification::UploadSucceeded => {
                "Upload successful! Waiting for conversion...".to_string()
            }
            Notification::UploadFailed(reason) => format!("Upload failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewModel {
    pub selected_file: Option<String>,
    pub uploading: bool,
    pub progress: u8,
    pub uploaded_filename: Option<String>,
    pub signed_url: Option<String>,
    pub notification: Option<Notification>,
}

impl ViewModel {
    /// Snapshot the session for rendering. Notifications are left unset.
    pub fn from_session(selected: Option<&SelectedFile>, session: &ConversionSession) -> Self {
        let mut view = ViewModel {
            selected_file: selected.map(|f| f.name().to_string()),
            progress: session.progress(),
            ..Default::default()
        };

        match session.state() {
            SessionState::Idle => {}
            SessionState::Uploading { .. } => view.uploading = true,
            SessionState::Polling { filename, .. } => {
                view.uploaded_filename = Some(filename.into_inner());
            }
            SessionState::Found { filename, url, .. } => {
                view.uploaded_filename = Some(filename.into_inner());
                view.signed_url = Some(url.as_str().to_string());
            }
        }

        view
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    /// The upload trigger needs a selected file and no upload in flight.
    pub fn upload_enabled(&self) -> bool {
        self.selected_file.is_some() && !self.uploading
    }
}

/// `[#####...............]  25%`; values above 100 are clamped.
pub fn render_progress_bar(progress: u8, width: usize) -> String {
    let progress = progress.min(100) as usize;
    let filled = progress * width / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        progress
    )
}

pub fn render(view: &ViewModel) -> String {
    let mut lines = Vec::new();

    match &view.selected_file {
        Some(name) => lines.push(format!("File:     {}", name)),
        None => lines.push("File:     <none selected>".to_string()),
    }

    if view.upload_enabled() {
        lines.push("Upload:   [ready]".to_string());
    } else if view.uploading {
        lines.push("Upload:   [uploading]".to_string());
    } else {
        lines.push("Upload:   [disabled, select a file first]".to_string());
    }

    if view.uploading || view.progress > 0 {
        lines.push(format!(
            "Progress: {}",
            render_progress_bar(view.progress, PROGRESS_BAR_WIDTH)
        ));
    }

    if let Some(notification) = &view.notification {
        lines.push(notification.message());
    }

    if view.uploaded_filename.is_some() {
        match &view.signed_url {
            Some(url) => lines.push(format!("Download converted PDF: {}", url)),
            None => lines.push(WAITING_MESSAGE.to_string()),
        }
    }

    lines.join("\n")
}
