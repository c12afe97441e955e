//! Checks backed by an external command.
//!
//! The command's exit status decides the outcome. An optional, distinct fix
//! command is invoked with the same file-passing mode.

use crate::checks::{Check, CheckContext, CheckSpec};
use crate::core::error::{Error, Result};
use crate::core::executor::{CommandRun, CommandSpec, PassFiles};
use crate::core::report::CheckOutcome;
use async_trait::async_trait;
use std::time::Duration;

/// Options for building a [`CommandCheck`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Display name.
    pub name: String,
    /// Program and static arguments of the check command.
    pub command: Vec<String>,
    /// Program and static arguments of the fix command, if any.
    pub fix: Option<Vec<String>>,
    /// Append the applicable files to the command.
    pub pass_files: bool,
    /// Invoke once per file. Requires `pass_files`.
    pub separately: bool,
    /// Include patterns.
    pub include: Vec<String>,
    /// Exclude patterns.
    pub exclude: Vec<String>,
    /// Only run when slow checks are requested.
    pub slow: bool,
    /// Kill each process after this long.
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    /// Creates options for a command that receives no files.
    pub fn new<I, S>(name: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the fix command.
    #[must_use]
    pub fn fix<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fix = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Appends files to the command.
    #[must_use]
    pub const fn pass_files(mut self, pass_files: bool) -> Self {
        self.pass_files = pass_files;
        self
    }

    /// Invokes the command once per file.
    #[must_use]
    pub const fn separately(mut self, separately: bool) -> Self {
        self.separately = separately;
        self
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

    /// Sets the per-process timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A check that passes when its command exits with status 0.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    spec: CheckSpec,
    command: CommandSpec,
    fix: Option<CommandSpec>,
}

impl CommandCheck {
    /// Builds the check, validating the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] if `separately` is set without
    /// `pass_files`, or if the check or fix command is empty.
    pub fn new(options: CommandOptions) -> Result<Self> {
        let CommandOptions {
            name,
            command,
            fix,
            pass_files,
            separately,
            include,
            exclude,
            slow,
            timeout,
        } = options;

        if separately && !pass_files {
            return Err(Error::config_invalid(
                format!("{name}.separately"),
                "`separately` requires `pass_files` to be true",
            ));
        }

        let mode = PassFiles::from_options(pass_files, separately);
        let command = CommandSpec::from_argv(&command, mode)
            .ok_or_else(|| Error::config_invalid(format!("{name}.command"), "command is empty"))?
            .timeout(timeout);

        let fix = match fix {
            Some(argv) => Some(
                CommandSpec::from_argv(&argv, mode)
                    .ok_or_else(|| {
                        Error::config_invalid(format!("{name}.fix"), "fix command is empty")
                    })?
                    .timeout(timeout),
            ),
            None => None,
        };

        let mut spec = CheckSpec::new(name).include(include).exclude(exclude).slow(slow);
        spec.can_fix = fix.is_some();

        Ok(Self { spec, command, fix })
    }

    /// The check command.
    #[must_use]
    pub const fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// The fix command, if any.
    #[must_use]
    pub const fn fix_command(&self) -> Option<&CommandSpec> {
        self.fix.as_ref()
    }
}

#[async_trait]
impl Check for CommandCheck {
    fn spec(&self) -> &CheckSpec {
        &self.spec
    }

    async fn run(&self, ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome> {
        let name = &self.spec.name;
        match ctx.runner.run(&self.command, files).await {
            Ok(CommandRun::Skipped) => Ok(CheckOutcome::skipped(name, "no matching files")),
            Ok(CommandRun::Finished(output)) if output.success() => Ok(CheckOutcome::passed(name)),
            Ok(CommandRun::Finished(output)) => Ok(CheckOutcome::failed(name)
                .with_detail(output.output)
                .with_files(output.failed_files)),
            Err(e @ Error::ArgumentOverflow { .. }) => {
                Ok(CheckOutcome::failed(name).with_detail(e.to_string()))
            },
            Err(e) => Err(e),
        }
    }

    /// Runs the fix command against every file, even after one fails.
    async fn fix(&self, ctx: &CheckContext, files: &[String]) -> Result<CheckOutcome> {
        let name = &self.spec.name;
        let Some(fix) = &self.fix else {
            return Ok(CheckOutcome::fix_failed(name).with_detail("no fix command configured"));
        };

        match ctx.runner.run(fix, files).await {
            Ok(CommandRun::Skipped) => {
                Ok(CheckOutcome::fix_failed(name).with_detail("no files to fix"))
            },
            Ok(CommandRun::Finished(output)) if output.success() => Ok(CheckOutcome::fixed(name)),
            Ok(CommandRun::Finished(output)) => {
                let mut detail = String::new();
                if fix.pass_files == PassFiles::PerFile {
                    let fixed = files.len() - output.failed_files.len();
                    detail = format!("fixed {fixed} of {} files\n", files.len());
                }
                detail.push_str(&output.output);
                Ok(CheckOutcome::fix_failed(name)
                    .with_detail(detail)
                    .with_files(output.failed_files))
            },
            Err(e @ Error::ArgumentOverflow { .. }) => {
                Ok(CheckOutcome::fix_failed(name).with_detail(e.to_string()))
            },
            Err(e) => Err(e),
        }
    }
}
