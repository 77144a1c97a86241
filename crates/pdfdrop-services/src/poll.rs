//! Conversion polling
//!
//! A poll session probes `converted/{basename}.pdf` on a fixed cadence from a
//! background task until the object shows up, then mints one presigned URL.
//!
//! The task is owned by a [`PollHandle`]. Cancelling the handle (or dropping
//! it) stops the schedule: no check starts afterwards, and a check that is in
//! flight at that moment is dropped without its answer being looked at. Checks
//! never overlap because each one is awaited before the next tick.
//!
//! There is no deadline. A conversion that never completes is polled until the
//! handle goes away.

use std::sync::Arc;
use std::time::Duration;

use pdfdrop_core::constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SIGNED_URL_TTL_SECS};
use pdfdrop_core::{Config, SignedUrl, UploadedFilename};
use pdfdrop_storage::{derive_output_key, Storage};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::PollError;

/// Shortest accepted poll period; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Observable state of one poll session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Found(SignedUrl),
    Cancelled,
}

/// Starts poll sessions against one storage.
#[derive(Clone)]
pub struct ConversionPoller {
    storage: Arc<dyn Storage>,
    interval: Duration,
    url_ttl: Duration,
}

impl ConversionPoller {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            url_ttl: Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self::new(storage)
            .with_interval(config.poll_interval())
            .with_url_ttl(config.signed_url_ttl())
    }

    /// Periods below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short, using {}s",
                MIN_POLL_INTERVAL.as_secs()
            );
        }
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_url_ttl(mut self, url_ttl: Duration) -> Self {
        self.url_ttl = url_ttl;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling for the converted form of `filename`.
    ///
    /// The output key is derived once, here. The first check runs one interval
    /// from now. Must be called from within a tokio runtime.
    pub fn start(&self, filename: &UploadedFilename) -> PollHandle {
        let output_key = derive_output_key(filename.as_str());
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::Polling);

        let span = tracing::info_span!(
            "conversion_poll",
            bucket = %self.storage.bucket(),
            key = %output_key,
        );

        let task = tokio::spawn(
            poll_loop(
                self.storage.clone(),
                output_key.clone(),
                self.interval,
                self.url_ttl,
                cancel.clone(),
                state_tx,
            )
            .instrument(span),
        );

        tracing::info!(
            filename = %filename,
            key = %output_key,
            interval_secs = self.interval.as_secs(),
            "Waiting for converted file"
        );

        PollHandle {
            filename: filename.clone(),
            output_key,
            cancel,
            state: state_rx,
            task,
        }
    }
}

async fn poll_loop(
    storage: Arc<dyn Storage>,
    key: String,
    period: Duration,
    url_ttl: Duration,
    cancel: CancellationToken,
    state_tx: watch::Sender<PollState>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempt: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(attempt, "Discarding in-flight check after cancellation");
                break;
            }
            outcome = storage.exists(&key) => outcome,
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(attempt, "Converted file not ready yet");
                continue;
            }
            Err(source) => {
                let err = PollError::Check {
                    key: key.clone(),
                    source,
                };
                tracing::warn!(attempt, error = %err, reason = err.reason(), "Existence check failed, will retry");
                continue;
            }
        }

        // Found: nothing else is scheduled unless signing fails.
        let signed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            signed = storage.signed_url(&key, url_ttl) => signed,
        };

        match signed {
            Ok(url) => {
                tracing::info!(attempt, expires_in_seconds = url_ttl.as_secs(), "Converted file ready");
                state_tx.send_replace(PollState::Found(SignedUrl::new(url, url_ttl)));
                return;
            }
            Err(source) => {
                let err = PollError::Sign {
                    key: key.clone(),
                    source,
                };
                tracing::warn!(attempt, error = %err, reason = err.reason(), "Could not sign download link, will retry");
            }
        }
    }

    state_tx.send_if_modified(|state| {
        if *state == PollState::Polling {
            *state = PollState::Cancelled;
            true
        } else {
            false
        }
    });
    tracing::debug!(attempts = attempt, "Poll session stopped");
}

/// Live registration of a poll session.
///
/// Dropping the handle cancels the session.
pub struct PollHandle {
    filename: UploadedFilename,
    output_key: String,
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn filename(&self) -> &UploadedFilename {
        &self.filename
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Current state. A task that exited without publishing an outcome
    /// counts as cancelled.
    pub fn state(&self) -> PollState {
        let state = self.state.borrow().clone();
        if state == PollState::Polling && self.task.is_finished() {
            return PollState::Cancelled;
        }
        state
    }

    pub fn signed_url(&self) -> Option<SignedUrl> {
        match &*self.state.borrow() {
            PollState::Found(url) => Some(url.clone()),
            _ => None,
        }
    }

    /// Stop the session. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(key = %self.output_key, "Cancelling poll session");
            self.cancel.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the download link is available.
    ///
    /// Returns `None` once the session is cancelled.
    pub async fn wait_for_url(&mut self) -> Option<SignedUrl> {
        let cancel = self.cancel.clone();
        let state = &mut self.state;

        tokio::select! {
            biased;
            found = state.wait_for(|s| *s != PollState::Polling) => match found {
                Ok(state) => match &*state {
                    PollState::Found(url) => Some(url.clone()),
                    _ => None,
                },
                Err(_) => None,
            },
            _ = cancel.cancelled() => None,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
