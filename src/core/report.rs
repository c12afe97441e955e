//! Check outcomes and the run report.
//!
//! The report lists outcomes in registration order and renders them as
//! text (or JSON) in a stable, diff-able layout:
//!
//! ```text
//! o--[ NoWhitespaceInFilePath ]
//! |  my file.txt
//! o--[ failed! ]
//! ```

use crate::core::error::Error;
use crate::core::files::FileMode;
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

/// Status of one check after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The check found no problems.
    Passed,
    /// The check found problems.
    Failed,
    /// The check failed, a fix was applied, and the re-run passed.
    Fixed,
    /// The fix command itself failed.
    FixFailed,
    /// The check could not be run.
    Error,
    /// No applicable files, or not selected for this run.
    Skipped,
}

impl OutcomeStatus {
    /// Label printed at the bottom of a check's report block.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed!",
            Self::Failed => "failed!",
            Self::Fixed => "fixed!",
            Self::FixFailed => "fix failed!",
            Self::Error => "error!",
            Self::Skipped => "skipped",
        }
    }

    /// Returns true for statuses that count as a problem.
    #[must_use]
    pub const fn is_problem(&self) -> bool {
        matches!(self, Self::Failed | Self::FixFailed | Self::Error)
    }
}

/// Result of one check for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// Display name of the check.
    pub name: String,
    /// Final status.
    pub status: OutcomeStatus,
    /// Human-readable detail, such as command output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Offending file paths.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// True if `precommit fix` could address a failure.
    pub fixable: bool,
}

impl CheckOutcome {
    fn new(name: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            name: name.into(),
            status,
            detail: None,
            files: Vec::new(),
            fixable: false,
        }
    }

    /// A passing outcome.
    pub fn passed(name: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::Passed)
    }

    /// A failing outcome.
    pub fn failed(name: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::Failed)
    }

    /// A successfully applied fix.
    pub fn fixed(name: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::Fixed)
    }

    /// A fix that could not be applied.
    pub fn fix_failed(name: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::FixFailed)
    }

    /// A skipped outcome with a reason.
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::Skipped).with_detail(reason)
    }

    /// An error outcome with a message.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, OutcomeStatus::Error).with_detail(message)
    }

    /// An error outcome for an error raised while running a check.
    pub fn from_error(name: impl Into<String>, error: &Error) -> Self {
        Self::error(name, error.to_string())
    }

    /// Sets the detail text. Empty or whitespace-only text clears it.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let trimmed = detail.trim_end();
        self.detail = if trimmed.trim().is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Sets the offending files.
    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    /// Marks the outcome as fixable.
    #[must_use]
    pub const fn fixable(mut self, fixable: bool) -> Self {
        self.fixable = fixable;
        self
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every check passed or was skipped.
    Success,
    /// At least one check was fixed and none remain failing.
    Fixed,
    /// At least one check failed or errored.
    Failure,
}

impl RunStatus {
    /// Returns true for success and fixed.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Success | Self::Fixed)
    }
}

/// Outcomes of one checklist execution, in registration order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// File mode that was used.
    pub mode: FileMode,
    /// Whether fixes were requested.
    pub fix_mode: bool,
    /// One outcome per registered check.
    pub outcomes: Vec<CheckOutcome>,
    /// Non-fatal problems, such as malformed patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// True if the run was interrupted.
    pub interrupted: bool,
    /// Total duration.
    #[serde(skip)]
    pub duration: Duration,
}

impl Report {
    /// Computes the aggregate status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.outcomes.iter().any(|o| o.status.is_problem()) {
            RunStatus::Failure
        } else if self
            .outcomes
            .iter()
            .any(|o| o.status == OutcomeStatus::Fixed)
        {
            RunStatus::Fixed
        } else {
            RunStatus::Success
        }
    }

    /// Returns the number of checks that were not skipped.
    #[must_use]
    pub fn ran_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != OutcomeStatus::Skipped)
            .count()
    }

    /// Returns the number of skipped checks.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.ran_count()
    }

    /// Returns the number of checks that found a problem, including fixed ones.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_problem() || o.status == OutcomeStatus::Fixed)
            .count()
    }

    /// Returns the number of fixed checks.
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.count(OutcomeStatus::Fixed)
    }

    /// Returns the number of failed checks that a fix could address.
    #[must_use]
    pub fn fixable_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.fixable && o.status == OutcomeStatus::Failed)
            .count()
    }

    /// Returns the number of outcomes with a status.
    #[must_use]
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Renders the report as text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        for outcome in &self.outcomes {
            render_outcome(&mut out, outcome);
        }

        if !self.warnings.is_empty() {
            for warning in &self.warnings {
                let _ = writeln!(out, "{} {warning}", style("warning:").yellow().bold());
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport {
            status: self.status(),
            report: self,
        })
    }

    /// The closing summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!("Ran {}.", plural(self.ran_count(), "check"));
        if self.skipped_count() > 0 {
            let _ = write!(line, " Skipped {}.", self.skipped_count());
        }

        let issues = self.issue_count();
        if issues == 0 {
            line.push_str(" No issues detected.");
        } else {
            let _ = write!(line, " Detected {}.", plural(issues, "issue"));
            if self.fix_mode {
                let _ = write!(line, " Fixed {} of them.", self.fixed_count());
            } else if self.fixable_count() > 0 {
                let _ = write!(
                    line,
                    " Fix {} of them with 'precommit fix'.",
                    self.fixable_count()
                );
            }
        }

        if self.interrupted {
            line.push_str(" Interrupted.");
        }
        line
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: RunStatus,
    #[serde(flatten)]
    report: &'a Report,
}

fn render_outcome(out: &mut String, outcome: &CheckOutcome) {
    let _ = writeln!(out, "o--[ {} ]", style(&outcome.name).bold());

    if let Some(detail) = &outcome.detail {
        for line in detail.lines() {
            let _ = writeln!(out, "|  {line}");
        }
    }
    for file in &outcome.files {
        let _ = writeln!(out, "|  {file}");
    }

    let label = outcome.status.label();
    let label = match outcome.status {
        OutcomeStatus::Passed | OutcomeStatus::Fixed => style(label).green(),
        OutcomeStatus::Failed | OutcomeStatus::FixFailed | OutcomeStatus::Error => {
            style(label).red()
        },
        OutcomeStatus::Skipped => style(label).dim(),
    };
    let _ = writeln!(out, "o--[ {label} ]");
    out.push('\n');
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
