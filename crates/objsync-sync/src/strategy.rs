//! Multi-part upload strategy
//!
//! Orchestrates one file's upload attempt: rebuild the session snapshot
//! from remote state, plan the byte ranges still missing, stream them
//! through the concurrent part uploader, and commit once the source file
//! is known to be complete.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use objsync_core::domain::{
    PartUploadRequest, PlannedPart, RemoteKey, UploadError, UploadSession,
};
use objsync_core::ports::{Destination, ProgressListener, StillWritingProbe};

use crate::part_uploader::{ConcurrentPartUploader, DEFAULT_PART_CONCURRENCY};

/// One whole-file upload attempt against the Destination.
#[async_trait::async_trait]
pub trait UploadStrategy: Send + Sync {
    /// Upload `file` to `key`, resuming any prior progress.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] when a remote operation or local read
    /// fails, or fatally when the local file shrank below the remotely
    /// confirmed size.
    async fn upload(&self, file: &Path, key: &RemoteKey) -> Result<(), UploadError>;
}

/// Resumable multi-part implementation of [`UploadStrategy`].
pub struct MultipartUploadStrategy {
    destination: Arc<dyn Destination>,
    probe: Arc<dyn StillWritingProbe>,
    listener: Arc<dyn ProgressListener>,
    part_concurrency: usize,
}

impl MultipartUploadStrategy {
    /// Create a strategy with the default part concurrency.
    #[must_use]
    pub fn new(
        destination: Arc<dyn Destination>,
        probe: Arc<dyn StillWritingProbe>,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            destination,
            probe,
            listener,
            part_concurrency: DEFAULT_PART_CONCURRENCY,
        }
    }

    /// Override the number of concurrent part uploads.
    #[must_use]
    pub fn with_part_concurrency(mut self, part_concurrency: usize) -> Self {
        self.part_concurrency = part_concurrency;
        self
    }

    /// Build the session snapshot for this attempt: resume from the remote
    /// listing when one exists, otherwise open a fresh session.
    async fn build_session(
        &self,
        file: &Path,
        key: &RemoteKey,
    ) -> Result<UploadSession, UploadError> {
        let listing = self.destination.existing_part_listing(key).await?;
        let writing_finished = !self.probe.is_still_writing(file);

        let session = match listing {
            Some(listing) => {
                debug!(
                    key = %key,
                    upload_id = %listing.upload_id,
                    listed_parts = listing.parts.len(),
                    initiated = ?listing.initiated,
                    "resuming upload session from remote listing"
                );
                UploadSession::resume(key.clone(), &listing, writing_finished)
            }
            None => {
                let upload_id = self.destination.init_upload(key).await?;
                debug!(key = %key, upload_id = %upload_id, "opened new upload session");
                UploadSession::fresh(key.clone(), upload_id, writing_finished)
            }
        };
        Ok(session)
    }

    /// Read the planned ranges and submit them to the part uploader:
    /// retry stream first, then the fresh stream.
    async fn submit_planned_parts(
        &self,
        file: &Path,
        session: &UploadSession,
        planned: &[PlannedPart],
        uploader: &mut ConcurrentPartUploader,
    ) -> Result<(), UploadError> {
        let mut handle = File::open(file).await?;
        for part in planned {
            let body = read_range(&mut handle, part.offset, part.size).await?;
            let request: PartUploadRequest = session.part_request(part, body);
            uploader.submit(request);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UploadStrategy for MultipartUploadStrategy {
    async fn upload(&self, file: &Path, key: &RemoteKey) -> Result<(), UploadError> {
        let session = self.build_session(file, key).await?;

        let file_len = tokio::fs::metadata(file).await?.len();
        session.validate_local_length(file_len)?;

        self.listener
            .upload_started(file, session.upload_id(), session.confirmed_bytes());

        let plan = session.plan(file_len);
        info!(
            key = %key,
            file_len,
            confirmed_bytes = session.confirmed_bytes(),
            retry_parts = plan.retry.len(),
            fresh_parts = plan.fresh.len(),
            writing_finished = session.writing_finished(),
            "upload pass planned"
        );

        let mut uploader = ConcurrentPartUploader::new(
            Arc::clone(&self.destination),
            self.part_concurrency,
            Arc::clone(&self.listener),
        );
        self.submit_planned_parts(file, &session, &plan.retry, &mut uploader)
            .await?;
        self.submit_planned_parts(file, &session, &plan.fresh, &mut uploader)
            .await?;

        // Full barrier: no part upload may race the commit below.
        let collected = uploader.join_all().await;

        if session.commit_ready() {
            let etags = session.ordered_etags(&collected);
            debug!(key = %key, parts = etags.len(), "committing object");
            self.destination
                .commit(key, &etags, session.upload_id())
                .await?;
            info!(key = %key, parts = etags.len(), "object committed");
        } else {
            debug!(
                key = %key,
                "source still being written; commit deferred to a later pass"
            );
        }

        self.listener.upload_finished(file);
        Ok(())
    }
}

/// Read exactly `size` bytes at `offset`.
async fn read_range(file: &mut File, offset: u64, size: u64) -> std::io::Result<Bytes> {
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buffer = vec![0u8; size as usize];
    file.read_exact(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}
