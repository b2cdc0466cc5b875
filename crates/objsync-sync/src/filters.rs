//! Inclusion filters over relative file paths
//!
//! A [`Filters`] value is a list of inclusion predicates; a path is
//! eligible when at least one predicate matches, or when the list is empty
//! (match-all). Filters never own file data - they only see the relative
//! path string.

use regex::Regex;

/// A single inclusion predicate.
#[derive(Debug, Clone)]
pub struct Filter(FilterKind);

#[derive(Debug, Clone)]
enum FilterKind {
    EndsWith(String),
    Name(String),
    Matches(Regex),
}

impl Filter {
    /// Match paths ending with `suffix` (e.g. `"txt"` or `".bin"`).
    #[must_use]
    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self(FilterKind::EndsWith(suffix.into()))
    }

    /// Match paths whose file name equals `name` exactly.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self(FilterKind::Name(name.into()))
    }

    /// Match paths against a regular expression.
    #[must_use]
    pub fn matches(pattern: Regex) -> Self {
        Self(FilterKind::Matches(pattern))
    }

    fn accepts(&self, relative_path: &str) -> bool {
        match &self.0 {
            FilterKind::EndsWith(suffix) => relative_path.ends_with(suffix.as_str()),
            FilterKind::Name(name) => {
                let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
                file_name == name
            }
            FilterKind::Matches(pattern) => pattern.is_match(relative_path),
        }
    }
}

/// An inclusion filter list.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    include: Vec<Filter>,
}

impl Filters {
    /// Start building a filter list.
    #[must_use]
    pub fn builder() -> FiltersBuilder {
        FiltersBuilder::default()
    }

    /// True when `relative_path` passes the filter list.
    #[must_use]
    pub fn matches(&self, relative_path: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|f| f.accepts(relative_path))
    }
}

/// Builder for [`Filters`].
#[derive(Debug, Default)]
pub struct FiltersBuilder {
    include: Vec<Filter>,
}

impl FiltersBuilder {
    /// Add an inclusion predicate.
    #[must_use]
    pub fn include(mut self, filter: Filter) -> Self {
        self.include.push(filter);
        self
    }

    /// Finish the list.
    #[must_use]
    pub fn build(self) -> Filters {
        Filters {
            include: self.include,
        }
    }
}
