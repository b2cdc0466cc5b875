//! Folder synchronizer
//!
//! Top-level driver of one sync pass: candidates come from the
//! [`Source`], the Destination filters them down to what actually needs
//! upload, and each uploadable file is handed to the uploading service
//! sequentially. A failure of the filter call downgrades the pass to
//! "nothing uploadable" - the driver is invoked repeatedly, so a
//! transient remote outage self-heals on the next invocation.

use std::sync::Arc;

use tracing::{error, info, warn};

use objsync_core::domain::RemoteKey;
use objsync_core::ports::{Destination, ProgressListener};

use crate::source::Source;
use crate::uploader::FileUploadingService;

/// Counters for one completed sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Candidate files the source enumerated
    pub candidates: usize,
    /// Files uploaded (committed or deferred mid-session) without error
    pub uploaded: usize,
    /// Files that ended in a terminal or fatal error
    pub failed: usize,
}

/// Drives one source into one destination.
pub struct FolderSynchronizer {
    source: Source,
    service: FileUploadingService,
}

impl FolderSynchronizer {
    /// Create a synchronizer.
    #[must_use]
    pub fn new(source: Source, service: FileUploadingService) -> Self {
        Self { source, service }
    }

    /// Replace the progress listener on the underlying service.
    pub fn set_listener(&mut self, listener: Arc<dyn ProgressListener>) {
        self.service.set_listener(listener);
    }

    /// Run one sync pass. Files are processed sequentially; per-file
    /// failures are counted, logged and never abort the remaining files.
    pub async fn synchronize(&self) -> SyncReport {
        let candidates = self.source.candidate_files();
        let mut report = SyncReport {
            candidates: candidates.len(),
            ..SyncReport::default()
        };

        let uploadable = match self
            .service
            .destination()
            .filter_uploadable_files(&candidates)
            .await
        {
            Ok(uploadable) => uploadable,
            Err(err) => {
                warn!(error = %err, "uploadable filter failed; skipping this pass");
                Vec::new()
            }
        };
        if uploadable.is_empty() {
            info!(candidates = report.candidates, "nothing to upload");
            return report;
        }

        info!(
            candidates = report.candidates,
            uploadable = uploadable.len(),
            "starting sync pass"
        );
        for relative in &uploadable {
            let key = match RemoteKey::new(relative.clone()) {
                Ok(key) => key,
                Err(err) => {
                    warn!(path = %relative, error = %err, "skipping unmappable candidate");
                    report.failed += 1;
                    continue;
                }
            };
            let file = self.source.root().join(relative);
            match self.service.upload(&file, &key).await {
                Ok(()) => report.uploaded += 1,
                Err(err) => {
                    error!(file = %file.display(), error = %err, "file upload failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            uploaded = report.uploaded,
            failed = report.failed,
            "sync pass finished"
        );
        report
    }
}

/// Public entry point: synchronize a [`Source`] into a Destination.
pub struct RemoteSync {
    synchronizer: FolderSynchronizer,
}

impl RemoteSync {
    /// Wire a source and destination with default probe and listener.
    #[must_use]
    pub fn new(source: Source, destination: Arc<dyn Destination>) -> Self {
        let service = FileUploadingService::new(destination);
        Self {
            synchronizer: FolderSynchronizer::new(source, service),
        }
    }

    /// Wire a source with a fully configured uploading service.
    #[must_use]
    pub fn with_service(source: Source, service: FileUploadingService) -> Self {
        Self {
            synchronizer: FolderSynchronizer::new(source, service),
        }
    }

    /// Attach a progress listener.
    pub fn set_listener(&mut self, listener: Arc<dyn ProgressListener>) {
        self.synchronizer.set_listener(listener);
    }

    /// Run one sync pass.
    pub async fn run(&self) -> SyncReport {
        self.synchronizer.synchronize().await
    }
}
