//! Built-in checks answered from repository state alone.
//!
//! None of these can fix what they find.

use crate::checks::{Check, CheckContext, CheckSpec};
use crate::core::error::Result;
use crate::core::report::CheckOutcome;
use async_trait::async_trait;

/// Names of built-in checks.
pub mod names {
    /// Staged files must not also have unstaged changes.
    pub const NO_STAGED_AND_UNSTAGED_CHANGES: &str = "NoStagedAndUnstagedChanges";
    /// File paths must not contain whitespace.
    pub const NO_WHITESPACE_IN_FILE_PATH: &str = "NoWhitespaceInFilePath";
    /// Diffs must not add the do-not-submit marker.
    pub const DO_NOT_SUBMIT: &str = "DoNotSubmit";
}

/// Marker rejected by [`DoNotSubmit`].
///
/// Split so this source file does not trip the check itself.
pub const DO_NOT_SUBMIT_MARKER: &str = concat!("DO NOT ", "SUBMIT");

/// Fails for every file with both staged and unstaged changes.
///
/// Committing such a file commits a version that was never on disk as a
/// whole, so the tools that checked the working copy checked something else.
#[derive(Debug, Clone)]
pub struct NoStagedAndUnstagedChanges {
    spec: CheckSpec,
}

impl NoStagedAndUnstagedChanges {
    /// Creates the check with a spec.
    #[must_use]
    pub const fn new(spec: CheckSpec) -> Self {
        Self { spec }
    }
}

impl Default for NoStagedAndUnstagedChanges {
    fn default() -> Self {
        Self::new(CheckSpec::new(names::NO_STAGED_AND_UNSTAGED_CHANGES))
    }
}

#[async_trait]
impl Check for NoStagedAndUnstagedChanges {
    fn spec(&self) -> &CheckSpec {
        &self.spec
    }

    async fn run(&self, ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome> {
        let mut both = Vec::new();
        for path in files {
            if ctx.repo.has_staged_and_unstaged_for(path)? {
                both.push(path.clone());
            }
        }
        Ok(outcome_for(&self.spec.name, both, None))
    }
}

/// Fails for every file path containing whitespace.
#[derive(Debug, Clone)]
pub struct NoWhitespaceInFilePath {
    spec: CheckSpec,
}

impl NoWhitespaceInFilePath {
    /// Creates the check with a spec.
    #[must_use]
    pub const fn new(spec: CheckSpec) -> Self {
        Self { spec }
    }
}

impl Default for NoWhitespaceInFilePath {
    fn default() -> Self {
        Self::new(CheckSpec::new(names::NO_WHITESPACE_IN_FILE_PATH))
    }
}

#[async_trait]
impl Check for NoWhitespaceInFilePath {
    fn spec(&self) -> &CheckSpec {
        &self.spec
    }

    async fn run(&self, _ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome> {
        let bad = files
            .iter()
            .filter(|path| path.chars().any(char::is_whitespace))
            .cloned()
            .collect();
        Ok(outcome_for(
            &self.spec.name,
            bad,
            Some("file path contains whitespace"),
        ))
    }
}

/// Fails for every file whose diff adds the do-not-submit marker.
#[derive(Debug, Clone)]
pub struct DoNotSubmit {
    spec: CheckSpec,
}

impl DoNotSubmit {
    /// Creates the check with a spec.
    #[must_use]
    pub const fn new(spec: CheckSpec) -> Self {
        Self { spec }
    }
}

impl Default for DoNotSubmit {
    fn default() -> Self {
        Self::new(CheckSpec::new(names::DO_NOT_SUBMIT))
    }
}

#[async_trait]
impl Check for DoNotSubmit {
    fn spec(&self) -> &CheckSpec {
        &self.spec
    }

    async fn run(&self, ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome> {
        let mut bad = Vec::new();
        for path in files {
            if ctx.repo.diff_contains(path, DO_NOT_SUBMIT_MARKER, ctx.mode)? {
                bad.push(path.clone());
            }
        }
        let message = format!("file contains '{DO_NOT_SUBMIT_MARKER}'");
        Ok(outcome_for(&self.spec.name, bad, Some(message.as_str())))
    }
}

/// Passed when `bad` is empty, otherwise failed listing the sorted paths.
fn outcome_for(name: &str, mut bad: Vec<String>, message: Option<&str>) -> CheckOutcome {
    if bad.is_empty() {
        return CheckOutcome::passed(name);
    }
    bad.sort();
    let outcome = CheckOutcome::failed(name).with_files(bad);
    match message {
        Some(message) => outcome.with_detail(message),
        None => outcome,
    }
}
