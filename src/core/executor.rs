//! External command execution for command-backed checks.
//!
//! A [`CommandSpec`] is invoked directly (no shell) with its static
//! arguments, optionally followed by file paths. Output is captured, and a
//! child process is killed if its future is dropped, so interrupting or
//! timing out a check never leaves an orphaned process behind.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// `E2BIG` on Linux and macOS.
#[cfg(unix)]
const ARG_LIST_TOO_LONG: i32 = 7;
/// `ERROR_FILENAME_EXCED_RANGE` on Windows.
#[cfg(windows)]
const ARG_LIST_TOO_LONG: i32 = 206;

/// How file paths are handed to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassFiles {
    /// Invoke once with no file arguments.
    #[default]
    None,
    /// Invoke once with every file appended.
    Batch,
    /// Invoke once per file.
    PerFile,
}

impl PassFiles {
    /// Derives the mode from the `pass_files` and `separately` options.
    #[must_use]
    pub const fn from_options(pass_files: bool, separately: bool) -> Self {
        match (pass_files, separately) {
            (false, _) => Self::None,
            (true, false) => Self::Batch,
            (true, true) => Self::PerFile,
        }
    }
}

/// A program, its static arguments, and how files are passed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments placed before any file paths.
    pub args: Vec<String>,
    /// File-passing mode.
    pub pass_files: PassFiles,
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Builds a spec from an argv-style list. Returns `None` for an empty list.
    #[must_use]
    pub fn from_argv(argv: &[String], pass_files: PassFiles) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            pass_files,
            timeout: None,
        })
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Returns the command line without file arguments, for display.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Output from a single process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout.trim_end(), self.stderr)
        }
    }
}

/// Aggregated result of running a command spec against a file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// 0 if every invocation succeeded, otherwise the first non-zero code.
    pub exit_code: i32,
    /// Combined output of all invocations.
    pub output: String,
    /// Files whose invocation failed (per-file mode only).
    pub failed_files: Vec<String>,
    /// Number of processes started.
    pub invocations: usize,
}

impl RunOutput {
    /// Returns true if every invocation succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of [`CommandRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRun {
    /// File-passing mode needed files but none were given; nothing ran.
    Skipped,
    /// At least one process ran.
    Finished(RunOutput),
}

/// Runs command specs in the repository root.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cwd: Option<PathBuf>,
    max_parallel: usize,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self {
            cwd: None,
            max_parallel: available_parallelism(),
        }
    }
}

impl CommandRunner {
    /// Creates a runner that starts processes in `cwd`.
    #[must_use]
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: Some(cwd.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Sets the worker pool size for per-file invocations.
    #[must_use]
    pub fn max_parallel(mut self, workers: usize) -> Self {
        self.max_parallel = workers.max(1);
        self
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Runs `spec` against `files` according to its file-passing mode.
    ///
    /// A non-zero exit is a normal result, not an error. Errors are reserved
    /// for a missing program, an oversized argument list, a timeout, or a
    /// failure to spawn.
    pub async fn run(&self, spec: &CommandSpec, files: &[String]) -> Result<CommandRun> {
        if spec.pass_files != PassFiles::None && files.is_empty() {
            return Ok(CommandRun::Skipped);
        }

        self.ensure_program(&spec.program)?;

        let output = match spec.pass_files {
            PassFiles::None => self.run_once(spec, &[]).await?,
            PassFiles::Batch => self.run_once(spec, files).await?,
            PassFiles::PerFile => self.run_per_file(spec, files).await?,
        };

        Ok(CommandRun::Finished(output))
    }

    /// Fails with `CommandNotFound` if the program cannot be resolved.
    fn ensure_program(&self, program: &str) -> Result<()> {
        let found = if Path::new(program).components().count() > 1 {
            let path = match &self.cwd {
                Some(cwd) => cwd.join(program),
                None => PathBuf::from(program),
            };
            path.exists()
        } else {
            Self::command_exists(program)
        };

        if found {
            Ok(())
        } else {
            Err(Error::CommandNotFound {
                command: program.to_string(),
            })
        }
    }

    async fn run_once(&self, spec: &CommandSpec, files: &[String]) -> Result<RunOutput> {
        let output = invoke(spec.clone(), files.to_vec(), self.cwd.clone()).await?;
        Ok(RunOutput {
            exit_code: output.exit_code,
            output: output.combined_output(),
            failed_files: Vec::new(),
            invocations: 1,
        })
    }

    /// Runs one invocation per file on a bounded worker pool.
    ///
    /// Results are written into per-file slots so the aggregate is ordered
    /// by file, not by completion.
    async fn run_per_file(&self, spec: &CommandSpec, files: &[String]) -> Result<RunOutput> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for (index, file) in files.iter().enumerate() {
            let sem = Arc::clone(&semaphore);
            let spec = spec.clone();
            let file = file.clone();
            let cwd = self.cwd.clone();

            tasks.spawn(async move {
                // Acquire semaphore permit; if semaphore is closed, treat as internal error
                let _permit = sem.acquire_owned().await.map_err(|_| Error::Internal {
                    message: "Semaphore closed unexpectedly".to_string(),
                })?;
                let output = invoke(spec, vec![file], cwd).await?;
                Ok::<_, Error>((index, output))
            });
        }

        let mut slots: Vec<Option<CommandOutput>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, output) = joined.map_err(|e| Error::Internal {
                message: format!("Task join error: {e}"),
            })??;
            slots[index] = Some(output);
        }

        let mut aggregate = RunOutput {
            exit_code: 0,
            output: String::new(),
            failed_files: Vec::new(),
            invocations: files.len(),
        };

        for (file, output) in files.iter().zip(slots) {
            let Some(output) = output else {
                continue;
            };
            if !output.success() {
                if aggregate.exit_code == 0 {
                    aggregate.exit_code = output.exit_code;
                }
                aggregate.failed_files.push(file.clone());
            }
            for line in output.combined_output().lines() {
                aggregate.output.push_str(file);
                aggregate.output.push_str(": ");
                aggregate.output.push_str(line);
                aggregate.output.push('\n');
            }
        }

        Ok(aggregate)
    }
}

/// Spawns one process and waits for it, honouring its timeout.
async fn invoke(
    spec: CommandSpec,
    files: Vec<String>,
    cwd: Option<PathBuf>,
) -> Result<CommandOutput> {
    let start = std::time::Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).args(&files);

    if let Some(ref cwd) = cwd {
        cmd.current_dir(cwd);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(command = %spec.display(), files = files.len(), "Spawning process");

    let child = cmd.spawn().map_err(|e| spawn_error(&spec, files.len(), e))?;

    let output = match spec.timeout {
        Some(limit) => match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                // The child was dropped with the future, which kills it.
                return Err(Error::CommandTimeout {
                    command: spec.display(),
                    timeout: humantime::format_duration(limit).to_string(),
                });
            },
        },
        None => child.wait_with_output().await,
    }
    .map_err(|e| Error::io("wait for command", e))?;

    let output = CommandOutput {
        exit_code: output.status.code().unwrap_or(1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
    };
    tracing::debug!(
        command = %spec.program,
        exit_code = output.exit_code,
        duration = %humantime::format_duration(output.duration),
        "Process finished"
    );
    Ok(output)
}

fn spawn_error(spec: &CommandSpec, files: usize, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        return Error::CommandNotFound {
            command: spec.program.clone(),
        };
    }
    if e.raw_os_error() == Some(ARG_LIST_TOO_LONG) {
        return Error::ArgumentOverflow {
            command: spec.display(),
            files,
        };
    }
    Error::io(format!("spawn '{}'", spec.display()), e)
}

/// Returns the number of available CPU cores for parallel execution.
fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
