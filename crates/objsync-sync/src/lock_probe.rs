//! Lock-file based still-writing probe
//!
//! The producer of a file signals "still writing" by keeping a sibling
//! sentinel named `<file>.lock` next to it. The probe only looks for the
//! sentinel; it never opens or locks the data file itself.

use std::path::{Path, PathBuf};

use objsync_core::ports::StillWritingProbe;

/// Path of the lock sentinel belonging to `file` (`<file>.lock`).
#[must_use]
pub fn lock_path(file: &Path) -> PathBuf {
    let mut name = file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    file.with_file_name(name)
}

/// Probe that treats a file as still being written while its `.lock`
/// sentinel exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockFileProbe;

impl LockFileProbe {
    /// Create a new `LockFileProbe`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StillWritingProbe for LockFileProbe {
    fn is_still_writing(&self, file: &Path) -> bool {
        lock_path(file).exists()
    }
}
