//! Checklist construction and execution.
//!
//! A [`Checklist`] is built once per invocation and only iterated after
//! that. Executing it resolves the changed files once, runs each check on
//! its filtered subset in registration order, fixes and re-verifies failed
//! checks when asked to, and collects one outcome per check into a
//! [`Report`].

use crate::checks::{Check, CheckContext, CheckSpec};
use crate::core::error::{Error, Result};
use crate::core::executor::CommandRunner;
use crate::core::files::{FileMode, FileSet, Provenance};
use crate::core::git::RepositoryState;
use crate::core::interrupt::Interrupt;
use crate::core::report::{CheckOutcome, OutcomeStatus, Report};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};

/// Detail of a slow check skipped without `--all`.
pub const SKIP_SLOW: &str = "slow check; run with --all";
/// Detail of a check with no applicable files.
pub const SKIP_NO_FILES: &str = "no matching files";
/// Detail of checks stopped or skipped by an interrupt.
pub const INTERRUPTED: &str = "interrupted";

/// Registers checks, in the order they should run.
#[derive(Debug, Default)]
pub struct ChecklistBuilder {
    checks: Vec<Arc<dyn Check>>,
}

impl ChecklistBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check after the ones already registered.
    pub fn check(&mut self, check: impl Check + 'static) -> &mut Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Finishes the checklist.
    #[must_use]
    pub fn build(self) -> Checklist {
        Checklist {
            checks: self.checks,
        }
    }
}

/// Options for one execution.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Which changed files to look at.
    pub mode: FileMode,
    /// Fix failed checks that can be fixed.
    pub apply_fixes: bool,
    /// With `apply_fixes`, report what would be fixed without fixing.
    pub dry_run: bool,
    /// Run slow checks too.
    pub all: bool,
    /// Re-stage the staged files of a check after a verified fix.
    pub stage_fixes: bool,
    /// Run the check phase of all checks concurrently.
    pub parallel: bool,
    /// Show a spinner on stderr.
    pub progress: bool,
    /// Stops the run when triggered.
    pub interrupt: Interrupt,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: FileMode::Staged,
            apply_fixes: false,
            dry_run: false,
            all: false,
            stage_fixes: true,
            parallel: false,
            progress: false,
            interrupt: Interrupt::never(),
        }
    }
}

/// An ordered, immutable list of checks.
#[derive(Debug, Clone, Default)]
pub struct Checklist {
    checks: Vec<Arc<dyn Check>>,
}

/// What to do with one check, decided before anything runs.
enum Plan {
    Skip(CheckOutcome),
    Run(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Run,
    Fix,
}

impl Checklist {
    /// Returns an empty builder.
    #[must_use]
    pub fn builder() -> ChecklistBuilder {
        ChecklistBuilder::new()
    }

    /// Builds a checklist by handing a builder to `init`.
    pub fn from_init<F>(init: F) -> Self
    where
        F: FnOnce(&mut ChecklistBuilder),
    {
        let mut builder = ChecklistBuilder::new();
        init(&mut builder);
        builder.build()
    }

    /// Like [`Checklist::from_init`], for an `init` that can fail.
    pub fn try_from_init<F>(init: F) -> Result<Self>
    where
        F: FnOnce(&mut ChecklistBuilder) -> Result<()>,
    {
        let mut builder = ChecklistBuilder::new();
        init(&mut builder)?;
        Ok(builder.build())
    }

    /// Returns the number of checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns true if no checks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Iterates over the check specs in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &CheckSpec> {
        self.checks.iter().map(|c| c.spec())
    }

    /// Executes every check and reports one outcome per check.
    ///
    /// # Errors
    ///
    /// Only a failure to read repository state is returned. Errors raised by
    /// checks become `error` outcomes and the run continues.
    pub async fn execute(
        &self,
        repo: Arc<dyn RepositoryState>,
        runner: CommandRunner,
        options: &RunOptions,
    ) -> Result<Report> {
        let start = Instant::now();
        let files = Arc::new(repo.changed_files(options.mode)?);
        tracing::debug!(
            mode = %options.mode,
            files = files.len(),
            checks = self.checks.len(),
            "Executing checklist"
        );

        let ctx = CheckContext {
            repo,
            runner,
            files,
            mode: options.mode,
        };

        let mut warnings = Vec::new();
        let mut plans = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            plans.push(plan(check.as_ref(), &ctx.files, options, &mut warnings));
        }

        let mut ran = if options.parallel {
            self.run_all(&plans, &ctx, options).await
        } else {
            vec![None; self.checks.len()]
        };

        let mut outcomes = Vec::with_capacity(self.checks.len());
        for (index, (check, plan)) in self.checks.iter().zip(plans).enumerate() {
            let name = &check.spec().name;
            let files = match plan {
                Plan::Skip(outcome) => {
                    outcomes.push(outcome);
                    continue;
                },
                Plan::Run(files) => files,
            };

            let outcome = match ran[index].take() {
                Some(outcome) => outcome,
                None if options.interrupt.is_triggered() => {
                    CheckOutcome::skipped(name, INTERRUPTED)
                },
                None => {
                    let spinner = spinner(options.progress, format!("Running {name}..."));
                    tracing::debug!(check = %name, files = files.len(), "Running check");
                    let outcome =
                        settle(name, spawn_phase(check, &ctx, &files, Phase::Run), &options.interrupt)
                            .await;
                    if let Some(pb) = spinner {
                        pb.finish_and_clear();
                    }
                    outcome
                },
            };

            let outcome = resolve(check, &ctx, &files, outcome, options).await;
            tracing::debug!(check = %name, status = ?outcome.status, "Check finished");
            outcomes.push(outcome);
        }

        let interrupted = options.interrupt.is_triggered();
        if interrupted {
            tracing::warn!("Checklist interrupted");
        }

        Ok(Report {
            mode: options.mode,
            fix_mode: options.apply_fixes && !options.dry_run,
            outcomes,
            warnings,
            interrupted,
            duration: start.elapsed(),
        })
    }

    /// Runs the check phase of every planned check concurrently.
    ///
    /// Outcomes are collected in registration order, not completion order.
    async fn run_all(
        &self,
        plans: &[Plan],
        ctx: &CheckContext,
        options: &RunOptions,
    ) -> Vec<Option<CheckOutcome>> {
        let handles: Vec<Option<JoinHandle<Result<CheckOutcome>>>> = self
            .checks
            .iter()
            .zip(plans)
            .map(|(check, plan)| match plan {
                Plan::Run(files) => Some(spawn_phase(check, ctx, files, Phase::Run)),
                Plan::Skip(_) => None,
            })
            .collect();

        let running = handles.iter().flatten().count();
        let spinner = spinner(options.progress, format!("Running {running} checks..."));

        let mut outcomes = Vec::with_capacity(handles.len());
        for (check, handle) in self.checks.iter().zip(handles) {
            let name = &check.spec().name;
            let outcome = match handle {
                None => None,
                Some(handle) if options.interrupt.is_triggered() => {
                    handle.abort();
                    Some(CheckOutcome::skipped(name, INTERRUPTED))
                },
                Some(handle) => Some(settle(name, handle, &options.interrupt).await),
            };
            outcomes.push(outcome);
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        outcomes
    }
}

fn plan(
    check: &dyn Check,
    files: &FileSet,
    options: &RunOptions,
    warnings: &mut Vec<String>,
) -> Plan {
    let spec = check.spec();
    for warning in spec.matcher().warnings() {
        warnings.push(format!("{}: {warning}", spec.name));
    }

    if spec.slow && !options.all {
        return Plan::Skip(CheckOutcome::skipped(&spec.name, SKIP_SLOW));
    }

    let applicable = check.applicable_files(files);
    if applicable.is_empty() {
        tracing::debug!(check = %spec.name, "No applicable files");
        return Plan::Skip(CheckOutcome::skipped(&spec.name, SKIP_NO_FILES));
    }
    Plan::Run(applicable)
}

/// Fixes and re-verifies a failed check, or marks it fixable.
async fn resolve(
    check: &Arc<dyn Check>,
    ctx: &CheckContext,
    files: &[String],
    outcome: CheckOutcome,
    options: &RunOptions,
) -> CheckOutcome {
    let spec = check.spec();
    if outcome.status != OutcomeStatus::Failed || !spec.can_fix {
        return outcome;
    }
    if !options.apply_fixes || options.dry_run {
        return outcome.fixable(true);
    }
    if options.interrupt.is_triggered() {
        return outcome;
    }

    let spinner = spinner(options.progress, format!("Fixing {}...", spec.name));
    tracing::debug!(check = %spec.name, files = files.len(), "Applying fix");
    let fix = settle(&spec.name, spawn_phase(check, ctx, files, Phase::Fix), &options.interrupt).await;

    let result = if fix.status == OutcomeStatus::Fixed {
        let verify =
            settle(&spec.name, spawn_phase(check, ctx, files, Phase::Run), &options.interrupt).await;
        if verify.status == OutcomeStatus::Passed {
            match stage_fixed(ctx, files, options) {
                Ok(()) => fix,
                Err(e) => CheckOutcome::from_error(&spec.name, &e),
            }
        } else {
            tracing::debug!(check = %spec.name, status = ?verify.status, "Fix did not resolve the check");
            verify
        }
    } else {
        fix
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result
}

/// Re-stages the files of a fixed check that were only staged to begin with.
///
/// Files that also had unstaged edits are left alone, so the user's
/// unstaged work never lands in the index.
fn stage_fixed(ctx: &CheckContext, files: &[String], options: &RunOptions) -> Result<()> {
    if !options.stage_fixes {
        return Ok(());
    }
    let mut staged = Vec::new();
    for path in files {
        match ctx.files.provenance(path) {
            Some(Provenance::Staged) => staged.push(path.clone()),
            Some(Provenance::Both) => {
                tracing::debug!(file = %path, "Not re-staging a file with unstaged edits");
            },
            Some(Provenance::Unstaged) | None => {},
        }
    }
    ctx.repo.stage(&staged)
}

/// Runs one phase of a check on its own task, so a panic stays contained.
fn spawn_phase(
    check: &Arc<dyn Check>,
    ctx: &CheckContext,
    files: &[String],
    phase: Phase,
) -> JoinHandle<Result<CheckOutcome>> {
    let check = Arc::clone(check);
    let ctx = ctx.clone();
    let files = files.to_vec();
    tokio::spawn(async move {
        match phase {
            Phase::Run => check.run(&ctx, &files).await,
            Phase::Fix => check.fix(&ctx, &files).await,
        }
    })
}

/// Waits for a phase, turning errors, panics and interrupts into outcomes.
async fn settle(
    name: &str,
    mut handle: JoinHandle<Result<CheckOutcome>>,
    interrupt: &Interrupt,
) -> CheckOutcome {
    tokio::select! {
        joined = &mut handle => match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::debug!(check = %name, error = %e, "Check raised an error");
                CheckOutcome::from_error(name, &e)
            },
            Err(e) => CheckOutcome::from_error(name, &join_error(name, e)),
        },
        () = interrupt.triggered() => {
            // Aborting drops the check's future, which kills its processes.
            handle.abort();
            CheckOutcome::error(name, INTERRUPTED)
        },
    }
}

fn join_error(name: &str, e: JoinError) -> Error {
    let message = if e.is_panic() {
        let payload = e.into_panic();
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        format!("panicked: {text}")
    } else {
        "task was cancelled".to_string()
    };
    Error::check_execution(name, message)
}

fn spinner(enabled: bool, message: String) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .ok()
            .unwrap_or_else(ProgressStyle::default_spinner),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}
