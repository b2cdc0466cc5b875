//! Bounded-concurrency part uploader
//!
//! Executes part uploads for one file concurrently on the tokio runtime,
//! gated by a semaphore. Submissions are fire-and-forget; the caller awaits
//! [`ConcurrentPartUploader::join_all`] as a full barrier before any commit
//! so no part upload can race the commit call.
//!
//! There is no ordering guarantee between parts and no mid-flight
//! cancellation: a submitted upload runs to completion or failure. A failed
//! part is logged and dropped - its etag stays out of the committed set,
//! which defers the part to the next resume pass.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use objsync_core::domain::{PartEtag, PartUploadRequest};
use objsync_core::ports::{Destination, ProgressListener};

/// Default number of concurrent part uploads per file.
pub const DEFAULT_PART_CONCURRENCY: usize = 4;

/// Worker pool for one file's part-upload phase.
///
/// The pool is torn down by [`join_all`](Self::join_all), which consumes it;
/// no further submissions are possible once the barrier is awaited.
pub struct ConcurrentPartUploader {
    destination: Arc<dyn Destination>,
    listener: Arc<dyn ProgressListener>,
    semaphore: Arc<Semaphore>,
    handles: Vec<JoinHandle<Option<PartEtag>>>,
}

impl ConcurrentPartUploader {
    /// Create a pool executing at most `concurrency` uploads at once.
    ///
    /// Successful parts are reported to `listener` as progress; the
    /// listener never affects the outcome.
    #[must_use]
    pub fn new(
        destination: Arc<dyn Destination>,
        concurrency: usize,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            destination,
            listener,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            handles: Vec::new(),
        }
    }

    /// Submit one part upload. Returns immediately; the upload runs as a
    /// tokio task once a semaphore permit frees up.
    pub fn submit(&mut self, request: PartUploadRequest) {
        let destination = Arc::clone(&self.destination);
        let listener = Arc::clone(&self.listener);
        let semaphore = Arc::clone(&self.semaphore);

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the pool is alive.
                Err(_) => return None,
            };

            let part_number = request.part_number;
            let upload_id = request.upload_id.clone();
            let size = request.size;

            match destination.upload_part(request).await {
                Ok(etag) => {
                    debug!(part_number, size, "part upload acknowledged");
                    listener.upload_progress(&upload_id, size);
                    Some(etag)
                }
                Err(err) => {
                    warn!(
                        part_number,
                        error = %err,
                        "part upload failed; part deferred to next pass"
                    );
                    None
                }
            }
        });
        self.handles.push(handle);
    }

    /// Number of submitted part uploads.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.handles.len()
    }

    /// Await every submitted upload (full barrier) and collect the etags of
    /// the successful ones. Consumes the pool.
    pub async fn join_all(self) -> Vec<PartEtag> {
        let mut collected = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(Some(etag)) => collected.push(etag),
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "part upload task failed to complete");
                }
            }
        }
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;

    use objsync_core::domain::{
        DestinationError, PartListing, RemoteKey, UploadId,
    };
    use objsync_core::ports::NullProgressListener;

    /// Destination stub that tracks in-flight concurrency and fails the
    /// part numbers it is told to fail.
    struct StubDestination {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        failing_parts: Vec<u32>,
    }

    impl StubDestination {
        fn new(failing_parts: Vec<u32>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                failing_parts,
            }
        }
    }

    #[async_trait::async_trait]
    impl Destination for StubDestination {
        async fn filter_uploadable_files(
            &self,
            _candidates: &[String],
        ) -> Result<Vec<String>, DestinationError> {
            unimplemented!("not used by the part uploader")
        }

        async fn existing_part_listing(
            &self,
            _key: &RemoteKey,
        ) -> Result<Option<PartListing>, DestinationError> {
            unimplemented!("not used by the part uploader")
        }

        async fn init_upload(&self, _key: &RemoteKey) -> Result<UploadId, DestinationError> {
            unimplemented!("not used by the part uploader")
        }

        async fn upload_part(
            &self,
            request: PartUploadRequest,
        ) -> Result<PartEtag, DestinationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_parts.contains(&request.part_number) {
                return Err(DestinationError::new(
                    "uploadPart",
                    anyhow::anyhow!("injected failure for part {}", request.part_number),
                ));
            }
            Ok(PartEtag::new(
                request.part_number,
                format!("etag-{}", request.part_number),
            ))
        }

        async fn commit(
            &self,
            _key: &RemoteKey,
            _etags: &[PartEtag],
            _upload_id: &UploadId,
        ) -> Result<(), DestinationError> {
            unimplemented!("not used by the part uploader")
        }
    }

    fn request(part_number: u32) -> PartUploadRequest {
        PartUploadRequest::new(
            RemoteKey::new("file.bin").unwrap(),
            UploadId::new("mpu-1").unwrap(),
            part_number,
            Bytes::from_static(b"payload"),
            false,
        )
    }

    #[tokio::test]
    async fn collects_etags_from_all_successful_parts() {
        let destination = Arc::new(StubDestination::new(vec![]));
        let mut uploader = ConcurrentPartUploader::new(
            Arc::clone(&destination) as Arc<dyn Destination>,
            4,
            Arc::new(NullProgressListener),
        );
        for n in 1..=6 {
            uploader.submit(request(n));
        }
        assert_eq!(uploader.submitted(), 6);

        let mut etags = uploader.join_all().await;
        etags.sort_by_key(|e| e.part_number);
        let numbers: Vec<u32> = etags.iter().map(|e| e.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn respects_the_concurrency_bound() {
        let destination = Arc::new(StubDestination::new(vec![]));
        let mut uploader = ConcurrentPartUploader::new(
            Arc::clone(&destination) as Arc<dyn Destination>,
            2,
            Arc::new(NullProgressListener),
        );
        for n in 1..=8 {
            uploader.submit(request(n));
        }
        uploader.join_all().await;
        assert!(destination.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn failed_parts_are_dropped_not_propagated() {
        let destination = Arc::new(StubDestination::new(vec![2, 4]));
        let mut uploader = ConcurrentPartUploader::new(
            Arc::clone(&destination) as Arc<dyn Destination>,
            4,
            Arc::new(NullProgressListener),
        );
        for n in 1..=5 {
            uploader.submit(request(n));
        }
        let mut etags = uploader.join_all().await;
        etags.sort_by_key(|e| e.part_number);
        let numbers: Vec<u32> = etags.iter().map(|e| e.part_number).collect();
        assert_eq!(numbers, vec![1, 3, 5]);
    }
}
