//! Whole-file uploaders
//!
//! [`RetryingFileUploader`] wraps one strategy call in a bounded, iterative
//! retry loop: transient failures (remote operations, local I/O) are
//! retried up to the budget; the fatal truncation condition is never
//! retried. [`FileUploadingService`] wires destination, probe and listener
//! into a per-file uploader for the synchronizer.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use objsync_core::domain::{RemoteKey, UploadError};
use objsync_core::ports::{Destination, NullProgressListener, ProgressListener, StillWritingProbe};

use crate::lock_probe::LockFileProbe;
use crate::part_uploader::DEFAULT_PART_CONCURRENCY;
use crate::strategy::{MultipartUploadStrategy, UploadStrategy};

/// Total attempts per whole-file upload, including the first.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// General interface to upload one local file to the remote store.
#[async_trait::async_trait]
pub trait FileUploader: Send + Sync {
    /// Upload `file` to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::RetriesExhausted`] once the retry budget is
    /// spent, or a fatal error immediately.
    async fn upload(&self, file: &Path, key: &RemoteKey) -> Result<(), UploadError>;
}

/// Bounded-retry wrapper around an [`UploadStrategy`].
pub struct RetryingFileUploader {
    strategy: Arc<dyn UploadStrategy>,
    attempts: u32,
}

impl RetryingFileUploader {
    /// Wrap `strategy` with the default retry budget.
    #[must_use]
    pub fn new(strategy: Arc<dyn UploadStrategy>) -> Self {
        Self {
            strategy,
            attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    /// Override the total attempt budget (minimum 1).
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

#[async_trait::async_trait]
impl FileUploader for RetryingFileUploader {
    async fn upload(&self, file: &Path, key: &RemoteKey) -> Result<(), UploadError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(file = %file.display(), key = %key, attempt, "uploading file");
            let result = self.strategy.upload(file, key).await;
            info!(file = %file.display(), key = %key, attempt, "finished upload attempt");

            match result {
                Ok(()) => return Ok(()),
                Err(err) if err.is_fatal() => {
                    error!(key = %key, error = %err, "upload failed fatally; not retrying");
                    return Err(err);
                }
                Err(err) => {
                    if attempt >= self.attempts {
                        error!(
                            key = %key,
                            attempts = attempt,
                            error = %err,
                            "upload failed; retry budget exhausted"
                        );
                        return Err(UploadError::RetriesExhausted {
                            key: key.clone(),
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    warn!(key = %key, attempt, error = %err, "upload failed; trying next time");
                }
            }
        }
    }
}

/// Per-file upload entry point used by the folder synchronizer.
///
/// Builds a fresh strategy + retrying uploader for every file, so each
/// file's session state is owned by exactly one attempt chain.
pub struct FileUploadingService {
    destination: Arc<dyn Destination>,
    probe: Arc<dyn StillWritingProbe>,
    listener: Arc<dyn ProgressListener>,
    part_concurrency: usize,
    retry_attempts: u32,
}

impl FileUploadingService {
    /// Create a service with the lock-file probe and no progress listener.
    #[must_use]
    pub fn new(destination: Arc<dyn Destination>) -> Self {
        Self {
            destination,
            probe: Arc::new(LockFileProbe::new()),
            listener: Arc::new(NullProgressListener),
            part_concurrency: DEFAULT_PART_CONCURRENCY,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    /// The destination this service uploads to.
    #[must_use]
    pub fn destination(&self) -> Arc<dyn Destination> {
        Arc::clone(&self.destination)
    }

    /// Replace the progress listener.
    pub fn set_listener(&mut self, listener: Arc<dyn ProgressListener>) {
        self.listener = listener;
    }

    /// Replace the still-writing probe.
    pub fn set_probe(&mut self, probe: Arc<dyn StillWritingProbe>) {
        self.probe = probe;
    }

    /// Override the number of concurrent part uploads per file.
    pub fn set_part_concurrency(&mut self, part_concurrency: usize) {
        self.part_concurrency = part_concurrency;
    }

    /// Override the whole-file retry budget.
    pub fn set_retry_attempts(&mut self, retry_attempts: u32) {
        self.retry_attempts = retry_attempts;
    }

    /// Upload one file, retrying per the configured budget.
    ///
    /// # Errors
    ///
    /// Surfaces the per-file terminal error; the caller decides whether to
    /// continue with other files.
    pub async fn upload(&self, file: &Path, key: &RemoteKey) -> Result<(), UploadError> {
        let strategy = MultipartUploadStrategy::new(
            Arc::clone(&self.destination),
            Arc::clone(&self.probe),
            Arc::clone(&self.listener),
        )
        .with_part_concurrency(self.part_concurrency);

        let uploader =
            RetryingFileUploader::new(Arc::new(strategy)).with_attempts(self.retry_attempts);
        uploader.upload(file, key).await
    }
}
