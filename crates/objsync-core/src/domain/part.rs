//! Part model for multi-part transfers
//!
//! A *part* is a contiguous byte range of a file uploaded as one unit,
//! identified by a 1-based part number. The store enforces a minimum size
//! on every part except the final one.

use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use super::newtypes::{RemoteKey, UploadId};

/// Minimum size of every non-final part: 5 MiB.
///
/// This is a hard protocol constraint of the store; an undersized part is
/// only accepted when flagged as the last part of the object.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Result of a successfully uploaded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEtag {
    /// 1-based part number within the upload session
    pub part_number: u32,
    /// Entity tag the store acknowledged for this part
    pub etag: String,
}

impl PartEtag {
    /// Create a new `PartEtag`.
    #[must_use]
    pub fn new(part_number: u32, etag: impl Into<String>) -> Self {
        Self {
            part_number,
            etag: etag.into(),
        }
    }
}

/// One part the remote store reports as already received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPart {
    /// 1-based part number
    pub part_number: u32,
    /// Size of the stored part in bytes
    pub size: u64,
    /// Entity tag acknowledged for the part
    pub etag: String,
}

/// Prior progress of a multi-part upload, as reported by the store.
///
/// This listing is the sole source of truth for resuming: no local record
/// of progress survives a process restart.
#[derive(Debug, Clone)]
pub struct PartListing {
    /// Session handle the listed parts belong to
    pub upload_id: UploadId,
    /// When the store created the session, if reported
    pub initiated: Option<DateTime<Utc>>,
    /// Parts the store has durably accepted, in store order
    pub parts: Vec<ListedPart>,
}

impl PartListing {
    /// Highest part number present in the listing, or 0 when empty.
    #[must_use]
    pub fn highest_part_number(&self) -> u32 {
        self.parts.iter().map(|p| p.part_number).max().unwrap_or(0)
    }

    /// Total size in bytes of all listed parts.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.parts.iter().map(|p| p.size).sum()
    }
}

/// An immutable request to upload one part.
///
/// Built by [`UploadSession::part_request`](super::session::UploadSession::part_request)
/// and consumed exactly once by `Destination::upload_part`. The body travels
/// as [`Bytes`] so moving the request into a worker task is cheap.
#[derive(Debug, Clone)]
pub struct PartUploadRequest {
    /// Remote key of the object being assembled
    pub key: RemoteKey,
    /// Session the part belongs to
    pub upload_id: UploadId,
    /// 1-based part number
    pub part_number: u32,
    /// The part payload
    pub body: Bytes,
    /// Base64-encoded MD5 digest of the payload, verified by the store
    pub content_md5: String,
    /// Payload size in bytes
    pub size: u64,
    /// Whether this is the final (possibly undersized) part
    pub last_part: bool,
}

impl PartUploadRequest {
    /// Build a request for `body`, computing its Content-MD5 digest.
    #[must_use]
    pub fn new(
        key: RemoteKey,
        upload_id: UploadId,
        part_number: u32,
        body: Bytes,
        last_part: bool,
    ) -> Self {
        let content_md5 = content_md5(&body);
        let size = body.len() as u64;
        Self {
            key,
            upload_id,
            part_number,
            body,
            content_md5,
            size,
            last_part,
        }
    }
}

/// Base64-encoded MD5 digest of a payload, as the store's Content-MD5
/// header expects it.
#[must_use]
pub fn content_md5(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    base64::engine::general_purpose::STANDARD.encode(digest)
}
