//! Checks: the units of validation a checklist runs.
//!
//! - [`builtin`]: checks answered from repository state alone
//! - [`command`]: checks backed by an external command

pub mod builtin;
pub mod command;

use crate::core::error::Result;
use crate::core::executor::CommandRunner;
use crate::core::files::{FileMode, FileSet};
use crate::core::git::RepositoryState;
use crate::core::pattern::PatternMatcher;
use crate::core::report::CheckOutcome;
use async_trait::async_trait;
use std::sync::Arc;

pub use builtin::{DoNotSubmit, NoStagedAndUnstagedChanges, NoWhitespaceInFilePath};
pub use command::{CommandCheck, CommandOptions};

/// Static configuration of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    /// Display name.
    pub name: String,
    /// Include patterns; empty selects every file.
    pub include: Vec<String>,
    /// Exclude patterns; these win over includes.
    pub exclude: Vec<String>,
    /// Whether the check can fix what it finds.
    pub can_fix: bool,
    /// Slow checks only run when explicitly requested.
    pub slow: bool,
}

impl CheckSpec {
    /// Creates a spec that applies to every file.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            can_fix: false,
            slow: false,
        }
    }

    /// Sets the include patterns.
    #[must_use]
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the exclude patterns.
    #[must_use]
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the check as slow.
    #[must_use]
    pub const fn slow(mut self, slow: bool) -> Self {
        self.slow = slow;
        self
    }

    /// Compiles the include and exclude patterns.
    #[must_use]
    pub fn matcher(&self) -> PatternMatcher {
        PatternMatcher::new(&self.include, &self.exclude)
    }
}

/// Shared state for every check in one execution.
///
/// The file set is resolved once and never re-read, so every check sees
/// the same snapshot even after a fix rewrites files on disk.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Version-control state.
    pub repo: Arc<dyn RepositoryState>,
    /// Runner for external commands.
    pub runner: CommandRunner,
    /// The changed files for this invocation.
    pub files: Arc<FileSet>,
    /// Mode the file set was resolved with.
    pub mode: FileMode,
}

/// A unit of validation.
///
/// Errors returned from [`Check::run`] or [`Check::fix`] are captured by the
/// checklist as this check's `error` outcome; they never abort other checks.
#[async_trait]
pub trait Check: Send + Sync + std::fmt::Debug {
    /// Static configuration.
    fn spec(&self) -> &CheckSpec;

    /// The subset of the file set this check applies to.
    fn applicable_files(&self, files: &FileSet) -> Vec<String> {
        files.select(&self.spec().matcher())
    }

    /// Checks `files` and reports passed or failed.
    async fn run(&self, ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome>;

    /// Attempts to fix `files`.
    ///
    /// Returns a `fixed` outcome when the fix was applied, or `fix_failed`.
    /// The checklist re-runs [`Check::run`] afterwards to confirm.
    async fn fix(&self, _ctx: &CheckContext, _files: &[String]) -> Result<CheckOutcome> {
        Ok(CheckOutcome::fix_failed(&self.spec().name).with_detail("check cannot be fixed automatically"))
    }
}
