//! objsync synchronization engine
//!
//! Drives a one-way sync of a local directory tree into a remote object
//! store through the `objsync-core` ports:
//!
//! 1. [`Source`] enumerates candidate files (root + [`Filters`] + recursion).
//! 2. [`FolderSynchronizer`] asks the Destination which candidates need
//!    upload and hands each to the uploading service, one file at a time.
//! 3. [`MultipartUploadStrategy`] reconstructs the file's upload session
//!    from remote state, plans the byte ranges still missing and streams
//!    them through the [`ConcurrentPartUploader`].
//! 4. [`RetryingFileUploader`] wraps each whole-file attempt in a bounded
//!    retry loop.
//!
//! Concurrency exists only inside a single file's part-upload phase;
//! everything above it is sequential, so repeated invocations are safe and
//! self-healing.

pub mod filters;
pub mod lock_probe;
pub mod part_uploader;
pub mod source;
pub mod stats;
pub mod strategy;
pub mod synchronizer;
pub mod uploader;

pub use filters::{Filter, Filters};
pub use lock_probe::LockFileProbe;
pub use part_uploader::ConcurrentPartUploader;
pub use source::Source;
pub use stats::{FileUploadStat, UploadStatsListener};
pub use strategy::{MultipartUploadStrategy, UploadStrategy};
pub use synchronizer::{FolderSynchronizer, RemoteSync, SyncReport};
pub use uploader::{FileUploader, FileUploadingService, RetryingFileUploader};
