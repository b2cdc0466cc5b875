//! Per-file upload session
//!
//! An [`UploadSession`] is an immutable snapshot of one file's multi-part
//! upload state, computed once at the start of an attempt and threaded
//! through part generation and commit. It reconciles three inputs into a
//! single consistent picture:
//!
//! - the remote store's part listing (what was confirmed before),
//! - the current local file length (what exists to send),
//! - the still-writing signal (whether the producer has finished).
//!
//! Durability lives entirely in the remote listing: the session is
//! discarded after its attempt, so a process restart resumes from the
//! store's report alone.
//!
//! ## Resume rule
//!
//! A part the store lists is treated as durably accepted - the store only
//! reports parts it has fully received and etagged. Gap numbers strictly
//! below the highest listed part are re-sent; the highest listed part
//! itself is confirmed, and new parts continue one past it. Every
//! non-final part is exactly [`MIN_PART_SIZE`] bytes, so contiguous byte
//! coverage through the highest listed part is
//! `confirmed_bytes + gap_count * MIN_PART_SIZE`.

use std::collections::BTreeSet;

use bytes::Bytes;

use super::errors::UploadError;
use super::newtypes::{RemoteKey, UploadId};
use super::part::{PartEtag, PartListing, PartUploadRequest, MIN_PART_SIZE};

/// One byte range scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPart {
    /// 1-based part number
    pub part_number: u32,
    /// Byte offset of the range within the file
    pub offset: u64,
    /// Length of the range in bytes
    pub size: u64,
    /// Whether the range is the final (possibly undersized) part
    pub last_part: bool,
}

/// Everything one pass must transfer: the retry stream first, then the
/// fresh stream.
#[derive(Debug, Clone, Default)]
pub struct PartPlan {
    /// Re-sends of gap parts implied by the remote listing
    pub retry: Vec<PlannedPart>,
    /// New parts covering bytes past the previously covered range
    pub fresh: Vec<PlannedPart>,
}

impl PartPlan {
    /// Total number of parts scheduled for this pass.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.retry.len() + self.fresh.len()
    }
}

/// Immutable snapshot of one file's multi-part upload state.
#[derive(Debug, Clone)]
pub struct UploadSession {
    key: RemoteKey,
    upload_id: UploadId,
    confirmed_bytes: u64,
    pending_retry_parts: BTreeSet<u32>,
    next_new_part: u32,
    seeded_etags: Vec<PartEtag>,
    writing_finished: bool,
}

impl UploadSession {
    /// Start a NEW session: nothing confirmed, parts number from 1.
    #[must_use]
    pub fn fresh(key: RemoteKey, upload_id: UploadId, writing_finished: bool) -> Self {
        Self {
            key,
            upload_id,
            confirmed_bytes: 0,
            pending_retry_parts: BTreeSet::new(),
            next_new_part: 1,
            seeded_etags: Vec::new(),
            writing_finished,
        }
    }

    /// RESUME from the store's report of prior progress.
    ///
    /// Reuses the listing's upload id, counts listed bytes as confirmed,
    /// schedules gap numbers below the highest listed part for re-send and
    /// continues new parts one past the highest listed number. Etags of
    /// listed parts are seeded into the session so a later commit does not
    /// need to re-upload them.
    #[must_use]
    pub fn resume(key: RemoteKey, listing: &PartListing, writing_finished: bool) -> Self {
        let highest = listing.highest_part_number();
        let listed: BTreeSet<u32> = listing.parts.iter().map(|p| p.part_number).collect();
        let pending_retry_parts: BTreeSet<u32> =
            (1..highest).filter(|n| !listed.contains(n)).collect();
        let seeded_etags = listing
            .parts
            .iter()
            .map(|p| PartEtag::new(p.part_number, p.etag.clone()))
            .collect();

        Self {
            key,
            upload_id: listing.upload_id.clone(),
            confirmed_bytes: listing.total_size(),
            pending_retry_parts,
            next_new_part: highest + 1,
            seeded_etags,
            writing_finished,
        }
    }

    /// Remote key of the object being assembled.
    #[must_use]
    pub fn key(&self) -> &RemoteKey {
        &self.key
    }

    /// Session handle issued by the store.
    #[must_use]
    pub fn upload_id(&self) -> &UploadId {
        &self.upload_id
    }

    /// Bytes the remote listing confirms as durably stored.
    #[must_use]
    pub fn confirmed_bytes(&self) -> u64 {
        self.confirmed_bytes
    }

    /// Part numbers that must be re-sent this pass.
    #[must_use]
    pub fn pending_retry_parts(&self) -> &BTreeSet<u32> {
        &self.pending_retry_parts
    }

    /// Whether the producer of the local file has finished writing it.
    #[must_use]
    pub fn writing_finished(&self) -> bool {
        self.writing_finished
    }

    /// A commit may only be issued once the file is known to be complete.
    #[must_use]
    pub fn commit_ready(&self) -> bool {
        self.writing_finished
    }

    /// Contiguous byte coverage through the highest previously listed part.
    ///
    /// The fresh stream starts here. Gap parts are interior, so their size
    /// is always exactly [`MIN_PART_SIZE`].
    #[must_use]
    pub fn covered_bytes(&self) -> u64 {
        self.confirmed_bytes + self.pending_retry_parts.len() as u64 * MIN_PART_SIZE
    }

    /// Fail fatally when the local file shrank below the confirmed size.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::SourceTruncated`] when `file_len` is smaller
    /// than the bytes already confirmed remotely; resuming would splice
    /// stale ranges into the remote object.
    pub fn validate_local_length(&self, file_len: u64) -> Result<(), UploadError> {
        if file_len < self.confirmed_bytes {
            return Err(UploadError::SourceTruncated {
                key: self.key.clone(),
                local_len: file_len,
                confirmed_bytes: self.confirmed_bytes,
            });
        }
        Ok(())
    }

    /// Compute the byte ranges this pass must transfer.
    ///
    /// The retry stream re-reads exactly the ranges of gap parts. The fresh
    /// stream reads sequentially from [`covered_bytes`](Self::covered_bytes),
    /// emitting [`MIN_PART_SIZE`] chunks; a trailing chunk smaller than the
    /// minimum is emitted only when writing is finished (flagged as the
    /// last part) - the store forbids undersized non-final parts, so an
    /// undersized tail of a still-growing file waits for a future pass.
    #[must_use]
    pub fn plan(&self, file_len: u64) -> PartPlan {
        let retry = self
            .pending_retry_parts
            .iter()
            .map(|&part_number| {
                let offset = u64::from(part_number - 1) * MIN_PART_SIZE;
                PlannedPart {
                    part_number,
                    offset,
                    size: MIN_PART_SIZE.min(file_len.saturating_sub(offset)),
                    last_part: false,
                }
            })
            .filter(|p| p.size > 0)
            .collect();

        let mut fresh = Vec::new();
        let mut offset = self.covered_bytes();
        let mut part_number = self.next_new_part;
        while file_len.saturating_sub(offset) >= MIN_PART_SIZE {
            fresh.push(PlannedPart {
                part_number,
                offset,
                size: MIN_PART_SIZE,
                last_part: false,
            });
            offset += MIN_PART_SIZE;
            part_number += 1;
        }
        let remainder = file_len.saturating_sub(offset);
        if remainder > 0 && self.writing_finished {
            fresh.push(PlannedPart {
                part_number,
                offset,
                size: remainder,
                last_part: true,
            });
        }

        PartPlan { retry, fresh }
    }

    /// Bind a planned range's payload into an immutable upload request.
    #[must_use]
    pub fn part_request(&self, planned: &PlannedPart, body: Bytes) -> PartUploadRequest {
        debug_assert_eq!(body.len() as u64, planned.size);
        PartUploadRequest::new(
            self.key.clone(),
            self.upload_id.clone(),
            planned.part_number,
            body,
            planned.last_part,
        )
    }

    /// Merge seeded and newly collected etags into the commit input:
    /// ordered by ascending part number, one entry per part.
    #[must_use]
    pub fn ordered_etags(&self, collected: &[PartEtag]) -> Vec<PartEtag> {
        let mut merged: Vec<PartEtag> = self
            .seeded_etags
            .iter()
            .chain(collected.iter())
            .cloned()
            .collect();
        merged.sort_by_key(|e| e.part_number);
        merged.dedup_by_key(|e| e.part_number);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::part::ListedPart;

    const MIB: u64 = 1024 * 1024;

    fn key() -> RemoteKey {
        RemoteKey::new("video.bin").unwrap()
    }

    fn listing(parts: &[(u32, u64)]) -> PartListing {
        PartListing {
            upload_id: UploadId::new("mpu-1").unwrap(),
            initiated: None,
            parts: parts
                .iter()
                .map(|&(part_number, size)| ListedPart {
                    part_number,
                    size,
                    etag: format!("etag-{part_number}"),
                })
                .collect(),
        }
    }

    // ---- construction ----

    #[test]
    fn fresh_session_starts_at_part_one() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), true);
        assert_eq!(session.confirmed_bytes(), 0);
        assert!(session.pending_retry_parts().is_empty());
        assert_eq!(session.covered_bytes(), 0);
        assert!(session.commit_ready());
    }

    #[test]
    fn resume_without_gaps_continues_past_highest_part() {
        let session = UploadSession::resume(
            key(),
            &listing(&[(1, MIN_PART_SIZE), (2, MIN_PART_SIZE)]),
            false,
        );
        assert_eq!(session.confirmed_bytes(), 2 * MIN_PART_SIZE);
        assert!(session.pending_retry_parts().is_empty());
        assert_eq!(session.covered_bytes(), 2 * MIN_PART_SIZE);

        let plan = session.plan(3 * MIN_PART_SIZE);
        assert!(plan.retry.is_empty());
        assert_eq!(plan.fresh.len(), 1);
        assert_eq!(plan.fresh[0].part_number, 3);
        assert_eq!(plan.fresh[0].offset, 2 * MIN_PART_SIZE);
    }

    #[test]
    fn resume_schedules_gaps_below_highest_part() {
        // Parts 1, 3 and 5 stored; 2 and 4 were lost in flight.
        let session = UploadSession::resume(
            key(),
            &listing(&[(1, MIN_PART_SIZE), (3, MIN_PART_SIZE), (5, MIN_PART_SIZE)]),
            true,
        );
        let pending: Vec<u32> = session.pending_retry_parts().iter().copied().collect();
        assert_eq!(pending, vec![2, 4]);
        assert_eq!(session.confirmed_bytes(), 3 * MIN_PART_SIZE);
        // coverage = confirmed + 2 gap parts
        assert_eq!(session.covered_bytes(), 5 * MIN_PART_SIZE);

        let plan = session.plan(5 * MIN_PART_SIZE);
        assert_eq!(plan.retry.len(), 2);
        assert_eq!(plan.retry[0].part_number, 2);
        assert_eq!(plan.retry[0].offset, MIN_PART_SIZE);
        assert_eq!(plan.retry[0].size, MIN_PART_SIZE);
        assert!(!plan.retry[0].last_part);
        assert_eq!(plan.retry[1].part_number, 4);
        assert_eq!(plan.retry[1].offset, 3 * MIN_PART_SIZE);
        assert!(plan.fresh.is_empty());
    }

    #[test]
    fn resume_treats_highest_listed_part_as_confirmed() {
        // An undersized final part was stored but the commit never landed.
        // The listing covers the whole file, so nothing is re-sent and the
        // next pass goes straight to commit.
        let session = UploadSession::resume(
            key(),
            &listing(&[(1, MIN_PART_SIZE), (2, 3 * MIB)]),
            true,
        );
        assert!(session.pending_retry_parts().is_empty());
        assert_eq!(session.confirmed_bytes(), MIN_PART_SIZE + 3 * MIB);

        let plan = session.plan(MIN_PART_SIZE + 3 * MIB);
        assert_eq!(plan.part_count(), 0);
        assert!(session.commit_ready());
    }

    // ---- truncation ----

    #[test]
    fn truncated_file_is_rejected() {
        let session =
            UploadSession::resume(key(), &listing(&[(1, MIN_PART_SIZE)]), true);
        let err = session.validate_local_length(MIN_PART_SIZE - 1).unwrap_err();
        assert!(matches!(err, UploadError::SourceTruncated { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn equal_length_passes_validation() {
        let session =
            UploadSession::resume(key(), &listing(&[(1, MIN_PART_SIZE)]), true);
        assert!(session.validate_local_length(MIN_PART_SIZE).is_ok());
    }

    // ---- fresh stream planning ----

    #[test]
    fn plan_splits_file_into_minimum_size_parts() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), true);
        let plan = session.plan(2 * MIN_PART_SIZE + MIB);
        assert!(plan.retry.is_empty());
        assert_eq!(plan.fresh.len(), 3);
        assert_eq!(plan.fresh[0].size, MIN_PART_SIZE);
        assert_eq!(plan.fresh[1].size, MIN_PART_SIZE);
        assert_eq!(plan.fresh[2].size, MIB);
        assert!(plan.fresh[2].last_part);
        assert_eq!(plan.fresh[2].offset, 2 * MIN_PART_SIZE);
    }

    #[test]
    fn undersized_tail_is_deferred_while_still_writing() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), false);
        let plan = session.plan(4 * MIN_PART_SIZE + MIB);
        // Four full parts go out, the 1 MiB tail waits for a future pass.
        assert_eq!(plan.fresh.len(), 4);
        assert!(plan.fresh.iter().all(|p| p.size == MIN_PART_SIZE));
        assert!(plan.fresh.iter().all(|p| !p.last_part));
        assert!(!session.commit_ready());
    }

    #[test]
    fn exact_multiple_has_no_undersized_tail() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), true);
        let plan = session.plan(2 * MIN_PART_SIZE);
        assert_eq!(plan.fresh.len(), 2);
        // A full-size final chunk is not flagged; the flag exists to let an
        // undersized chunk through the store's minimum-size check.
        assert!(plan.fresh.iter().all(|p| !p.last_part));
    }

    #[test]
    fn small_finished_file_is_a_single_last_part() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), true);
        let plan = session.plan(3 * MIB);
        assert_eq!(plan.fresh.len(), 1);
        assert_eq!(plan.fresh[0].part_number, 1);
        assert_eq!(plan.fresh[0].size, 3 * MIB);
        assert!(plan.fresh[0].last_part);
    }

    #[test]
    fn empty_file_plans_nothing() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-1").unwrap(), true);
        assert_eq!(session.plan(0).part_count(), 0);
    }

    // ---- etag merging ----

    #[test]
    fn ordered_etags_merges_and_sorts() {
        let session = UploadSession::resume(
            key(),
            &listing(&[(1, MIN_PART_SIZE), (3, MIN_PART_SIZE)]),
            true,
        );
        let collected = vec![PartEtag::new(4, "etag-4"), PartEtag::new(2, "etag-2")];
        let merged = session.ordered_etags(&collected);
        let numbers: Vec<u32> = merged.iter().map(|e| e.part_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn ordered_etags_deduplicates_by_part_number() {
        let session =
            UploadSession::resume(key(), &listing(&[(1, MIN_PART_SIZE)]), true);
        let collected = vec![PartEtag::new(1, "etag-1-resent")];
        let merged = session.ordered_etags(&collected);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].part_number, 1);
    }

    // ---- request binding ----

    #[test]
    fn part_request_binds_session_identity() {
        let session = UploadSession::fresh(key(), UploadId::new("mpu-9").unwrap(), true);
        let plan = session.plan(MIB);
        let request = session.part_request(&plan.fresh[0], Bytes::from(vec![0u8; MIB as usize]));
        assert_eq!(request.key, key());
        assert_eq!(request.upload_id.as_str(), "mpu-9");
        assert_eq!(request.part_number, 1);
        assert!(request.last_part);
    }
}
