//! CLI command implementations.

use crate::config::{CONFIG_FILE_NAME, Config, DEFAULT_CONFIG};
use crate::core::error::{Error, Result};
use crate::core::executor::CommandRunner;
use crate::core::git::{GitRepo, RepositoryState};
use crate::core::interrupt::Interrupt;
use crate::core::report::{Report, RunStatus};
use crate::core::runner::RunOptions;
use console::style;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use super::RunArgs;

/// Hook script template.
const HOOK_SCRIPT: &str = r#"#!/bin/sh
# precommit hook - installed by `precommit init`

exec precommit --all
"#;

/// Hook marker comment.
const HOOK_MARKER: &str = "# precommit hook";

/// Exit code after an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

/// Run checks, optionally fixing them.
pub fn check(args: &RunArgs, fix: bool, dry_run: bool) -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let config = Config::load(repo.root())?;
    let checklist = config.checklist()?;

    let mut runner = CommandRunner::new(repo.root());
    if let Some(workers) = config.settings.max_parallel {
        runner = runner.max_parallel(workers);
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create runtime: {e}"),
    })?;

    let report = runtime.block_on(async {
        let options = RunOptions {
            mode: args.mode(),
            apply_fixes: fix,
            dry_run,
            all: args.all,
            stage_fixes: true,
            parallel: config.settings.parallel,
            progress: !args.json && std::io::stderr().is_terminal(),
            interrupt: Interrupt::on_ctrl_c(),
        };
        checklist.execute(Arc::new(repo), runner, &options).await
    })?;

    tracing::info!(
        status = ?report.status(),
        duration = %humantime::format_duration(report.duration),
        "Checklist finished"
    );
    print_report(&report, args.json)?;
    Ok(ExitCode::from(exit_status(&report)))
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        let text = report.to_json().map_err(|e| Error::Internal {
            message: format!("Failed to serialize report: {e}"),
        })?;
        println!("{text}");
    } else {
        print!("{}", report.render());
    }
    Ok(())
}

fn exit_status(report: &Report) -> u8 {
    if report.interrupted {
        return EXIT_INTERRUPTED;
    }
    match report.status() {
        RunStatus::Success | RunStatus::Fixed => 0,
        RunStatus::Failure => 1,
    }
}

/// Create the configuration and install the hook.
pub fn init(force: bool) -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let config_path = Config::path_in(repo.root());
    let hook_path = repo.hook_path("pre-commit");
    let hooks_dir = repo.hooks_dir();

    // Refuse before writing anything.
    if config_path.exists() && !force {
        eprintln!(
            "{} {} already exists. Re-run with --force to overwrite it.",
            style("!").yellow(),
            config_path.display()
        );
        return Ok(ExitCode::FAILURE);
    }
    let foreign_hook = hook_path.exists() && !is_our_hook(&hook_path)?;
    if foreign_hook && !force {
        return Err(Error::HookExists { path: hook_path });
    }

    std::fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| Error::io("write config", e))?;
    eprintln!("{} Created {}", style("✓").green(), config_path.display());

    if !hooks_dir.exists() {
        std::fs::create_dir_all(&hooks_dir).map_err(|e| Error::io("create hooks dir", e))?;
    }

    if foreign_hook {
        let backup_path = hooks_dir.join("pre-commit.bak");
        std::fs::rename(&hook_path, &backup_path).map_err(|e| Error::io("backup hook", e))?;
        eprintln!(
            "{} Backed up existing hook to {}",
            style("•").cyan(),
            backup_path.display()
        );
    }

    std::fs::write(&hook_path, HOOK_SCRIPT).map_err(|e| Error::io("write hook", e))?;

    // Make executable on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&hook_path)
            .map_err(|e| Error::io("get hook metadata", e))?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(&hook_path, perms).map_err(|e| Error::io("set hook perms", e))?;
    }

    eprintln!(
        "{} Installed pre-commit hook at {}",
        style("✓").green(),
        hook_path.display()
    );
    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {CONFIG_FILE_NAME}");
    eprintln!("  2. Commit as usual; the hook runs `precommit --all`");

    Ok(ExitCode::SUCCESS)
}

fn is_our_hook(path: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io("read existing hook", e))?;
    Ok(content.contains(HOOK_MARKER))
}

/// List configured checks.
pub fn list() -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let config = Config::load(repo.root())?;
    let checklist = config.checklist()?;

    if checklist.is_empty() {
        eprintln!("{} No checks configured", style("•").cyan());
        return Ok(ExitCode::SUCCESS);
    }

    // Each [[check]] table registers exactly one check.
    for (index, (entry, spec)) in config.checks.iter().zip(checklist.specs()).enumerate() {
        let mut flags = Vec::new();
        if spec.can_fix {
            flags.push("fixable");
        }
        if spec.slow {
            flags.push("slow");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };

        println!("{:>2}. {}{flags}", index + 1, style(&spec.name).cyan());
        if let Some(preset) = entry.preset() {
            println!("      {}", style(preset.description()).dim());
        }
        if !spec.include.is_empty() {
            println!("      include: {}", spec.include.join(" "));
        }
        if !spec.exclude.is_empty() {
            println!("      exclude: {}", spec.exclude.join(" "));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "precommit",
        &mut std::io::stdout(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::files::FileMode;
    use crate::core::report::CheckOutcome;
    use std::time::Duration;

    fn report(outcomes: Vec<CheckOutcome>, interrupted: bool) -> Report {
        Report {
            mode: FileMode::Staged,
            fix_mode: false,
            outcomes,
            warnings: Vec::new(),
            interrupted,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_exit_code_follows_status() {
        assert_eq!(exit_status(&report(vec![CheckOutcome::passed("a")], false)), 0);
        assert_eq!(exit_status(&report(vec![CheckOutcome::fixed("a")], false)), 0);
        assert_eq!(exit_status(&report(vec![CheckOutcome::failed("a")], false)), 1);
        assert_eq!(exit_status(&report(vec![CheckOutcome::passed("a")], true)), 130);
    }

    #[test]
    fn test_hook_script_runs_all_checks() {
        assert!(HOOK_SCRIPT.starts_with("#!/bin/sh\n"));
        assert!(HOOK_SCRIPT.contains(HOOK_MARKER));
        assert!(HOOK_SCRIPT.contains("precommit --all"));
    }
}
