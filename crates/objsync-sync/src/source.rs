//! Local source of candidate files
//!
//! A [`Source`] is a root directory, a set of [`Filters`] and a recursion
//! flag; once built it is immutable. Enumeration returns relative,
//! forward-slash separated paths in sorted order so sync passes are
//! deterministic.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::filters::Filters;

/// Immutable description of what to upload.
#[derive(Debug, Clone)]
pub struct Source {
    root: PathBuf,
    filters: Filters,
    recursive: bool,
}

impl Source {
    /// Start building a source rooted at `root`.
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> SourceBuilder {
        SourceBuilder {
            root: root.into(),
            filters: Filters::default(),
            recursive: false,
        }
    }

    /// The local root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether enumeration descends into subdirectories.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Enumerate candidate files as sorted relative paths.
    ///
    /// Directories and `.lock` sentinels are skipped; unreadable entries
    /// are logged and skipped rather than failing the pass.
    #[must_use]
    pub fn candidate_files(&self) -> Vec<String> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut candidates: Vec<String> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| relative_path(&self.root, entry.path()))
            .filter(|rel| !rel.ends_with(".lock"))
            .filter(|rel| self.filters.matches(rel))
            .collect();
        candidates.sort();
        candidates
    }
}

/// Builder for [`Source`].
#[derive(Debug)]
pub struct SourceBuilder {
    root: PathBuf,
    filters: Filters,
    recursive: bool,
}

impl SourceBuilder {
    /// Set the inclusion filters.
    #[must_use]
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Enable or disable descending into subdirectories.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Finish the source.
    #[must_use]
    pub fn build(self) -> Source {
        Source {
            root: self.root,
            filters: self.filters,
            recursive: self.recursive,
        }
    }
}

/// Relative forward-slash path of `path` under `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
