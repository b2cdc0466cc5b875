//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers that cross the Destination
//! boundary. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RemoteKey
// ============================================================================

/// Relative key of an object in the remote store.
///
/// Keys are relative (no leading `/`), use `/` as the separator and never
/// contain `..` segments, so a local relative path maps onto a key verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteKey(String);

impl RemoteKey {
    /// Create a validated `RemoteKey`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidRemoteKey` if the key is empty, starts
    /// with `/`, ends with `/`, or contains `..` or NUL.
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() {
            return Err(DomainError::InvalidRemoteKey("key is empty".to_string()));
        }
        if key.starts_with('/') {
            return Err(DomainError::InvalidRemoteKey(format!(
                "key must be relative: {key}"
            )));
        }
        if key.ends_with('/') {
            return Err(DomainError::InvalidRemoteKey(format!(
                "key must not end with a separator: {key}"
            )));
        }
        if key.split('/').any(|segment| segment == "..") {
            return Err(DomainError::InvalidRemoteKey(format!(
                "key must not contain parent segments: {key}"
            )));
        }
        if key.contains('\0') {
            return Err(DomainError::InvalidRemoteKey(
                "key contains a NUL byte".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name component (text after the last separator).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl Display for RemoteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// UploadId
// ============================================================================

/// Store-issued handle grouping all parts of one in-progress multi-part
/// object. Opaque; only ever produced by the Destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    /// Create a validated `UploadId`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUploadId` if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidUploadId("id is empty".to_string()));
        }
        Ok(Self(id))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
