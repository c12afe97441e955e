//! Command-line interface for precommit.
//!
//! This module provides the `precommit` CLI with subcommands for:
//! - `check`: Run checks (the default)
//! - `fix`: Run checks and apply available fixes
//! - `init`: Create the configuration and install the git hook
//! - `list`: List configured checks
//! - `completions`: Generate shell completions

mod commands;

use crate::core::error::Result;
use crate::core::files::FileMode;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Simple git pre-commit hook management.
#[derive(Debug, Parser)]
#[command(
    name = "precommit",
    author,
    version,
    about = "Simple git pre-commit hook management",
    long_about = r#"
precommit runs an ordered checklist against the files you changed and
optionally fixes what it finds. Checks are declared in precommit.toml at
the repository root.

Quick start:
  precommit init      # Create precommit.toml and install the git hook
  precommit           # Check staged files
  precommit fix       # Fix what can be fixed, then re-check
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Check options when no subcommand is given.
    #[command(flatten)]
    pub run: RunArgs,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Options shared by `check` and `fix`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct RunArgs {
    /// Run all checks, including slow ones.
    #[arg(long)]
    pub all: bool,

    /// Check staged and unstaged changes.
    #[arg(long, conflicts_with = "unstaged")]
    pub working: bool,

    /// Check only unstaged changes.
    #[arg(long)]
    pub unstaged: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Combines subcommand options with those given before the subcommand.
    ///
    /// A mode flag on the subcommand wins over one given before it.
    #[must_use]
    pub const fn merged(&self, outer: &Self) -> Self {
        let inner_mode = self.working || self.unstaged;
        Self {
            all: self.all || outer.all,
            working: self.working || (!inner_mode && outer.working),
            unstaged: self.unstaged || (!inner_mode && outer.unstaged),
            json: self.json || outer.json,
        }
    }

    /// Returns the file mode selected by the flags.
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        if self.working {
            FileMode::Working
        } else if self.unstaged {
            FileMode::Unstaged
        } else {
            FileMode::Staged
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check for pre-commit failures.
    #[command(visible_alias = "c")]
    Check(RunArgs),

    /// Apply available fixes for the problems that `check` finds.
    Fix {
        /// Check options.
        #[command(flatten)]
        args: RunArgs,

        /// Report what would be fixed without changing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Create precommit.toml and install the git pre-commit hook.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite an existing configuration or hook.
        #[arg(short, long)]
        force: bool,
    },

    /// List configured checks in run order.
    #[command(visible_alias = "l")]
    List,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    setup_color(cli.color);

    // If no subcommand, run the default action (same as `precommit check`)
    match cli.command {
        Some(Commands::Check(args)) => commands::check(&args.merged(&cli.run), false, false),
        Some(Commands::Fix { args, dry_run }) => {
            commands::check(&args.merged(&cli.run), true, dry_run)
        },
        Some(Commands::Init { force }) => commands::init(force),
        Some(Commands::List) => commands::list(),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
        None => commands::check(&cli.run, false, false),
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
