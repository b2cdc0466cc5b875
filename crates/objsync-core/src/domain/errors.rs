//! Error taxonomy for upload operations
//!
//! Three failure classes drive the control flow above the part level:
//!
//! - [`DestinationError`] - a remote operation failed; transient, retried
//!   at the whole-file layer.
//! - [`UploadError::SourceTruncated`] - the local file shrank below the
//!   size already confirmed remotely; fatal for that file, never retried.
//! - [`UploadError::RetriesExhausted`] - terminal, raised once the
//!   whole-file retry budget is spent; carries the root cause.

use thiserror::Error;

use super::newtypes::RemoteKey;

/// Validation failures raised by domain newtype constructors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote object key
    #[error("Invalid remote key: {0}")]
    InvalidRemoteKey(String),

    /// Invalid upload session id
    #[error("Invalid upload id: {0}")]
    InvalidUploadId(String),
}

/// A failed operation on the remote store.
///
/// Adapter-specific causes are wrapped as `anyhow::Error`; the operation
/// name identifies which Destination capability failed.
#[derive(Debug, Error)]
#[error("destination operation `{operation}` failed: {source}")]
pub struct DestinationError {
    operation: &'static str,
    #[source]
    source: anyhow::Error,
}

impl DestinationError {
    /// Wrap an adapter failure, naming the Destination operation.
    pub fn new(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// The Destination capability that failed.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Errors surfaced by a whole-file upload attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A remote operation failed (transient; retried)
    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// Reading the local file failed (transient; retried)
    #[error("i/o failure during upload: {0}")]
    Io(#[from] std::io::Error),

    /// The local file shrank below the bytes already confirmed remotely.
    /// Resuming would corrupt the remote object, so the file is skipped.
    #[error(
        "local file for `{key}` is {local_len} bytes but {confirmed_bytes} bytes \
         were already confirmed remotely; file was truncated or replaced"
    )]
    SourceTruncated {
        /// Remote key of the affected object
        key: RemoteKey,
        /// Current local file length
        local_len: u64,
        /// Bytes the remote listing confirms as durably stored
        confirmed_bytes: u64,
    },

    /// The whole-file retry budget is exhausted.
    #[error("upload of `{key}` failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Remote key of the affected object
        key: RemoteKey,
        /// Total attempts made, including the first
        attempts: u32,
        /// The failure of the last attempt
        #[source]
        source: Box<UploadError>,
    },
}

impl UploadError {
    /// True for failures that must not be retried within this process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UploadError::SourceTruncated { .. } | UploadError::RetriesExhausted { .. }
        )
    }
}
