//! Destination port (driven/secondary port)
//!
//! Interface to the remote object store. The primary implementation targets
//! S3-compatible stores, but the trait is store-agnostic: everything the
//! engine needs is existence filtering, multi-part session bookkeeping,
//! part transfer and the final commit.
//!
//! ## Design Notes
//!
//! - Every operation can fail with a [`DestinationError`] naming the
//!   operation; callers classify those failures as transient.
//! - The store must accept each part atomically: a part either appears in
//!   a later listing with its etag, or not at all.
//! - `commit` is irreversible and must receive etags ordered by ascending
//!   part number, contiguous from 1.

use crate::domain::errors::DestinationError;
use crate::domain::newtypes::{RemoteKey, UploadId};
use crate::domain::part::{PartEtag, PartListing, PartUploadRequest};

/// Port trait for remote object store operations.
#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    /// Which of the candidate relative paths actually need upload.
    ///
    /// The store decides based on remote existence/staleness; candidates it
    /// omits are already up to date.
    ///
    /// # Errors
    ///
    /// Returns a [`DestinationError`] when the remote check fails; the
    /// synchronizer downgrades this to "nothing uploadable this pass".
    async fn filter_uploadable_files(
        &self,
        candidates: &[String],
    ) -> Result<Vec<String>, DestinationError>;

    /// Prior progress for a remote object, or `None` when no multi-part
    /// session exists for it.
    async fn existing_part_listing(
        &self,
        key: &RemoteKey,
    ) -> Result<Option<PartListing>, DestinationError>;

    /// Start a new multi-part session for `key`.
    async fn init_upload(&self, key: &RemoteKey) -> Result<UploadId, DestinationError>;

    /// Transfer one part. The request is consumed; on success the store's
    /// etag for the part comes back.
    async fn upload_part(
        &self,
        request: PartUploadRequest,
    ) -> Result<PartEtag, DestinationError>;

    /// Finalize the object from its collected parts. Irreversible.
    ///
    /// `etags` must be ordered by ascending part number.
    async fn commit(
        &self,
        key: &RemoteKey,
        etags: &[PartEtag],
        upload_id: &UploadId,
    ) -> Result<(), DestinationError>;
}
