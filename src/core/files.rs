//! Changed-file sets and the modes used to select them.

use crate::core::pattern::PatternMatcher;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Which changes an invocation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// Files staged in the index.
    #[default]
    Staged,
    /// Files with changes not yet staged.
    Unstaged,
    /// Staged and unstaged files together.
    Working,
}

impl FileMode {
    /// Returns the name of the mode.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Unstaged => "unstaged",
            Self::Working => "working",
        }
    }

    /// Returns true if staged changes are part of this mode.
    #[must_use]
    pub const fn includes_staged(&self) -> bool {
        matches!(self, Self::Staged | Self::Working)
    }

    /// Returns true if unstaged changes are part of this mode.
    #[must_use]
    pub const fn includes_unstaged(&self) -> bool {
        matches!(self, Self::Unstaged | Self::Working)
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a changed path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Only staged.
    Staged,
    /// Only unstaged.
    Unstaged,
    /// Staged, with further unstaged edits.
    Both,
}

/// A changed path with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    /// Path relative to the repository root.
    pub path: String,
    /// Where the change came from.
    pub provenance: Provenance,
}

/// An ordered, deduplicated set of changed paths.
///
/// Staged paths come first, in the order version control reported them,
/// followed by unstaged paths not already present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSet {
    files: Vec<ChangedFile>,
    /// Position of each path in `files`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FileSet {
    /// Builds the set for a mode from the staged and unstaged path lists.
    pub fn from_changes<S: AsRef<str>>(staged: &[S], unstaged: &[S], mode: FileMode) -> Self {
        let staged_paths: HashSet<&str> = staged.iter().map(|p| p.as_ref()).collect();
        let unstaged_paths: HashSet<&str> = unstaged.iter().map(|p| p.as_ref()).collect();
        let mut set = Self::default();

        if mode.includes_staged() {
            for path in staged {
                let path = path.as_ref();
                let provenance = if unstaged_paths.contains(path) {
                    Provenance::Both
                } else {
                    Provenance::Staged
                };
                set.push(path, provenance);
            }
        }

        if mode.includes_unstaged() {
            for path in unstaged {
                let path = path.as_ref();
                let provenance = if staged_paths.contains(path) {
                    Provenance::Both
                } else {
                    Provenance::Unstaged
                };
                set.push(path, provenance);
            }
        }

        set
    }

    /// Appends a path unless it is already present.
    fn push(&mut self, path: &str, provenance: Provenance) {
        if self.index.contains_key(path) {
            return;
        }
        self.index.insert(path.to_string(), self.files.len());
        self.files.push(ChangedFile {
            path: path.to_string(),
            provenance,
        });
    }

    /// Iterates over the paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    /// Returns the provenance of a path, if it is in the set.
    #[must_use]
    pub fn provenance(&self, path: &str) -> Option<Provenance> {
        self.index.get(path).map(|&i| self.files[i].provenance)
    }

    /// Returns the paths selected by a matcher, in set order.
    #[must_use]
    pub fn select(&self, matcher: &PatternMatcher) -> Vec<String> {
        matcher.filter(self.paths())
    }

    /// Returns the number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
