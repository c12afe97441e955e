//! In-memory repository state for unit tests.

use crate::core::error::Result;
use crate::core::files::{FileMode, FileSet};
use crate::core::git::RepositoryState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Repository state held in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    root: PathBuf,
    staged: Vec<String>,
    unstaged: Vec<String>,
    added: HashMap<String, String>,
    stage_calls: Mutex<Vec<Vec<String>>>,
}

impl MemoryRepository {
    pub fn new(staged: &[&str], unstaged: &[&str]) -> Self {
        Self {
            root: PathBuf::from("."),
            staged: staged.iter().map(|s| (*s).to_string()).collect(),
            unstaged: unstaged.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Sets the root directory.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Records text added to `path` in its diff.
    pub fn with_added(mut self, path: &str, text: &str) -> Self {
        self.added.insert(path.to_string(), text.to_string());
        self
    }

    pub fn file_set(&self, mode: FileMode) -> FileSet {
        FileSet::from_changes(&self.staged, &self.unstaged, mode)
    }

    /// Every `stage` call, in order.
    pub fn stage_calls(&self) -> Vec<Vec<String>> {
        self.stage_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RepositoryState for MemoryRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn changed_files(&self, mode: FileMode) -> Result<FileSet> {
        Ok(self.file_set(mode))
    }

    fn has_staged_and_unstaged_for(&self, path: &str) -> Result<bool> {
        Ok(self.staged.iter().any(|p| p == path) && self.unstaged.iter().any(|p| p == path))
    }

    fn diff_contains(&self, path: &str, pattern: &str, _mode: FileMode) -> Result<bool> {
        Ok(self
            .added
            .get(path)
            .is_some_and(|text| text.to_lowercase().contains(&pattern.to_lowercase())))
    }

    fn stage(&self, paths: &[String]) -> Result<()> {
        if let Ok(mut calls) = self.stage_calls.lock() {
            calls.push(paths.to_vec());
        }
        Ok(())
    }
}
