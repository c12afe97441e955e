//! Configuration handling for precommit.
//!
//! The checklist is declared in a single `precommit.toml` at the repository
//! root: an optional `[settings]` table followed by one `[[check]]` table per
//! check, in the order the checks should run.

use crate::checks::{
    CheckSpec, CommandCheck, CommandOptions, DoNotSubmit, NoStagedAndUnstagedChanges,
    NoWhitespaceInFilePath, builtin,
};
use crate::core::error::{Error, Result};
use crate::core::runner::{Checklist, ChecklistBuilder};
use crate::presets::Preset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "precommit.toml";

/// Configuration written by `precommit init`.
pub const DEFAULT_CONFIG: &str = r#"# Pre-commit configuration for git.
#
# This file was created by precommit. Checks run in the order they are
# listed; remove or comment out a [[check]] table to disable it.

[settings]
# Run checks concurrently. Fixes are always applied one check at a time.
parallel = false

[[check]]
type = "no-staged-and-unstaged-changes"

[[check]]
type = "no-whitespace-in-file-path"

[[check]]
type = "do-not-submit"

# Check Python format with black.
# [[check]]
# type = "python-format"

# Lint Python code with flake8.
# [[check]]
# type = "python-lint"

# Check the order of Python imports with isort.
# [[check]]
# type = "python-import-order"

# Check Python static type annotations with mypy.
# [[check]]
# type = "python-types"
# slow = true

# Lint JavaScript code with ESLint.
# [[check]]
# type = "javascript-lint"

# Check Rust format with rustfmt.
# [[check]]
# type = "rust-format"

# Any other tool:
# [[check]]
# type = "command"
# name = "ShellCheck"
# command = ["shellcheck"]
# pass_files = true
# include = ["*.sh"]
"#;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global settings.
    pub settings: Settings,
    /// Checks, in run order.
    #[serde(rename = "check", skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckEntry>,
}

/// Global settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Run the check phase of all checks concurrently.
    pub parallel: bool,
    /// Worker pool size for per-file invocations. Defaults to the CPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

/// One `[[check]]` table, selected by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CheckEntry {
    /// Built-in: no file may have both staged and unstaged changes.
    NoStagedAndUnstagedChanges(FilterEntry),
    /// Built-in: no file path may contain whitespace.
    NoWhitespaceInFilePath(FilterEntry),
    /// Built-in: no diff may add the do-not-submit marker.
    DoNotSubmit(FilterEntry),
    /// An arbitrary external command.
    Command(CommandEntry),
    /// Preset: black.
    PythonFormat(PresetEntry),
    /// Preset: flake8.
    PythonLint(PresetEntry),
    /// Preset: isort.
    PythonImportOrder(PresetEntry),
    /// Preset: mypy.
    PythonTypes(PresetEntry),
    /// Preset: eslint.
    #[serde(rename = "javascript-lint")]
    JavaScriptLint(PresetEntry),
    /// Preset: rustfmt.
    RustFormat(PresetEntry),
}

/// Options shared by every check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterEntry {
    /// Display name; defaults to the check's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Include patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Only run with `--all`.
    pub slow: bool,
}

/// A `type = "command"` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandEntry {
    /// Display name.
    pub name: String,
    /// Program and arguments.
    pub command: Vec<String>,
    /// Fix program and arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Vec<String>>,
    /// Append the applicable files to the command.
    #[serde(default)]
    pub pass_files: bool,
    /// Invoke once per file.
    #[serde(default)]
    pub separately: bool,
    /// Include patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Only run with `--all`.
    #[serde(default)]
    pub slow: bool,
    /// Per-process timeout, such as `"30s"` or `"2m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// A preset table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetEntry {
    /// Display name; defaults to the preset's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Extra arguments for the check and fix commands.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Include patterns added to the preset's own.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Exclude patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Only run with `--all`.
    pub slow: bool,
    /// Per-process timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Config {
    /// Returns the configuration path for a repository root.
    #[must_use]
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Loads the configuration at the repository root.
    ///
    /// No other location is searched.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        if !path.is_file() {
            return Err(Error::ConfigNotFound { path });
        }
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), checks = config.checks.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config_parse_with_source(e.message().to_string(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.settings.max_parallel == Some(0) {
            return Err(Error::config_invalid(
                "settings.max_parallel",
                "must be at least 1",
            ));
        }

        // Building every check runs the same validation as a real run.
        self.checklist().map(|_| ())
    }

    /// Registers every configured check with `builder`, in file order.
    pub fn init(&self, builder: &mut ChecklistBuilder) -> Result<()> {
        for entry in &self.checks {
            entry.register(builder)?;
        }
        Ok(())
    }

    /// Builds the checklist.
    pub fn checklist(&self) -> Result<Checklist> {
        Checklist::try_from_init(|builder| self.init(builder))
    }

    /// Returns the configuration written by `precommit init`.
    #[must_use]
    pub const fn default_toml() -> &'static str {
        DEFAULT_CONFIG
    }
}

impl CheckEntry {
    /// Returns the preset this entry uses, if any.
    #[must_use]
    pub const fn preset(&self) -> Option<Preset> {
        match self {
            Self::PythonFormat(_) => Some(Preset::PythonFormat),
            Self::PythonLint(_) => Some(Preset::PythonLint),
            Self::PythonImportOrder(_) => Some(Preset::PythonImportOrder),
            Self::PythonTypes(_) => Some(Preset::PythonTypes),
            Self::JavaScriptLint(_) => Some(Preset::JavaScriptLint),
            Self::RustFormat(_) => Some(Preset::RustFormat),
            Self::NoStagedAndUnstagedChanges(_)
            | Self::NoWhitespaceInFilePath(_)
            | Self::DoNotSubmit(_)
            | Self::Command(_) => None,
        }
    }

    fn register(&self, builder: &mut ChecklistBuilder) -> Result<()> {
        match self {
            Self::NoStagedAndUnstagedChanges(f) => {
                let spec = f.spec(builtin::names::NO_STAGED_AND_UNSTAGED_CHANGES);
                builder.check(NoStagedAndUnstagedChanges::new(spec));
            },
            Self::NoWhitespaceInFilePath(f) => {
                let spec = f.spec(builtin::names::NO_WHITESPACE_IN_FILE_PATH);
                builder.check(NoWhitespaceInFilePath::new(spec));
            },
            Self::DoNotSubmit(f) => {
                builder.check(DoNotSubmit::new(f.spec(builtin::names::DO_NOT_SUBMIT)));
            },
            Self::Command(c) => {
                let options = CommandOptions {
                    name: c.name.clone(),
                    command: c.command.clone(),
                    fix: c.fix.clone(),
                    pass_files: c.pass_files,
                    separately: c.separately,
                    include: c.include.clone(),
                    exclude: c.exclude.clone(),
                    slow: c.slow,
                    timeout: parse_timeout(&c.name, c.timeout.as_deref())?,
                };
                builder.check(CommandCheck::new(options)?);
            },
            Self::PythonFormat(p)
            | Self::PythonLint(p)
            | Self::PythonImportOrder(p)
            | Self::PythonTypes(p)
            | Self::JavaScriptLint(p)
            | Self::RustFormat(p) => {
                let Some(preset) = self.preset() else {
                    return Err(Error::Internal {
                        message: "preset entry without a preset".to_string(),
                    });
                };
                let mut options = preset.options(&p.args, &p.include);
                if let Some(name) = &p.name {
                    options.name.clone_from(name);
                }
                options.exclude.clone_from(&p.exclude);
                options.slow = p.slow;
                options.timeout = parse_timeout(&options.name, p.timeout.as_deref())?;
                builder.check(CommandCheck::new(options)?);
            },
        }
        Ok(())
    }
}

impl FilterEntry {
    fn spec(&self, default_name: &str) -> CheckSpec {
        CheckSpec::new(self.name.as_deref().unwrap_or(default_name))
            .include(self.include.iter().cloned())
            .exclude(self.exclude.iter().cloned())
            .slow(self.slow)
    }
}

fn parse_timeout(check: &str, timeout: Option<&str>) -> Result<Option<Duration>> {
    timeout
        .map(|s| {
            humantime::parse_duration(s).map_err(|e| Error::ConfigInvalid {
                field: format!("{check}.timeout"),
                message: format!("Invalid duration: {s} ({e})"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn names(config: &Config) -> Vec<String> {
        config
            .checklist()
            .expect("checklist")
            .specs()
            .map(|s| s.name.clone())
            .collect()
    }

    // =========================================================================
    // Parsing tests
    // =========================================================================

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).expect("default config is valid");
        assert!(!config.settings.parallel);
        assert_eq!(
            names(&config),
            vec![
                "NoStagedAndUnstagedChanges",
                "NoWhitespaceInFilePath",
                "DoNotSubmit"
            ]
        );
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[settings]
parallel = true
max_parallel = 8

[[check]]
type = "no-staged-and-unstaged-changes"

[[check]]
type = "do-not-submit"
exclude = ["docs/*"]

[[check]]
type = "command"
name = "ShellCheck"
command = ["shellcheck"]
fix = ["shfmt", "-w"]
pass_files = true
separately = true
include = ["*.sh"]
timeout = "2m"

[[check]]
type = "python-format"
args = ["--line-length=100"]
slow = true
"#,
        )
        .expect("valid config");

        assert!(config.settings.parallel);
        assert_eq!(config.settings.max_parallel, Some(8));
        assert_eq!(config.checks.len(), 4);
        assert_eq!(
            config.checks[1],
            CheckEntry::DoNotSubmit(FilterEntry {
                exclude: vec!["docs/*".to_string()],
                ..FilterEntry::default()
            })
        );
        assert_eq!(config.checks[3].preset(), Some(Preset::PythonFormat));

        let checklist = config.checklist().expect("checklist");
        let specs: Vec<_> = checklist.specs().collect();
        assert_eq!(specs[0].name, "NoStagedAndUnstagedChanges");
        assert_eq!(specs[1].exclude, vec!["docs/*"]);
        assert_eq!(specs[2].name, "ShellCheck");
        assert!(specs[2].can_fix);
        assert_eq!(specs[3].name, "PythonFormat");
        assert_eq!(specs[3].include, vec!["*.py"]);
        assert!(specs[3].slow);
    }

    #[test]
    fn test_command_entry_options() {
        let config = Config {
            checks: vec![CheckEntry::Command(CommandEntry {
                name: "Lint".into(),
                command: vec!["lint".into(), "-q".into()],
                fix: None,
                pass_files: true,
                separately: false,
                include: vec!["*.c".into()],
                exclude: Vec::new(),
                slow: false,
                timeout: Some("30s".into()),
            })],
            ..Config::default()
        };

        let mut builder = ChecklistBuilder::new();
        config.init(&mut builder).expect("init");
        let checklist = builder.build();
        let spec = checklist.specs().next().expect("one check");
        assert_eq!(spec.name, "Lint");
        assert_eq!(spec.include, vec!["*.c"]);
        assert!(!spec.can_fix);
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("x", None).expect("none"), None);
        assert_eq!(
            parse_timeout("x", Some("1m 30s")).expect("valid"),
            Some(Duration::from_secs(90))
        );
        assert!(parse_timeout("x", Some("later")).is_err());
    }

    #[test]
    fn test_preset_name_override() {
        let config = Config::parse(
            r#"
[[check]]
type = "javascript-lint"
name = "Eslint"
include = ["*.jsx"]
"#,
        )
        .expect("valid");
        let checklist = config.checklist().expect("checklist");
        let spec = checklist.specs().next().expect("one check");
        assert_eq!(spec.name, "Eslint");
        assert_eq!(spec.include, vec!["*.js", "*.jsx"]);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = Config::parse("").expect("valid");
        assert!(config.checks.is_empty());
        assert_eq!(config.settings, Settings::default());
    }

    // =========================================================================
    // Error tests
    // =========================================================================

    #[test]
    fn test_unknown_type_is_parse_error() {
        let err = Config::parse("[[check]]\ntype = \"cobol-lint\"\n").expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert_eq!(err.exit_code(), 78);
    }

    #[rstest]
    #[case::misspelled_filter_key("type = \"do-not-submit\"\nexlude = [\"docs/*\"]")]
    #[case::command_key_on_preset("type = \"python-lint\"\npass_files = true")]
    #[case::misspelled_command_key(
        "type = \"command\"\nname = \"x\"\ncommand = [\"x\"]\npassfiles = true"
    )]
    fn test_unknown_check_key_is_parse_error(#[case] body: &str) {
        let err = Config::parse(&format!("[[check]]\n{body}\n")).expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_settings_key_is_parse_error() {
        let err = Config::parse("[settings]\nparalel = true\n").expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = Config::parse("[[check]\n").expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_separately_without_pass_files_is_invalid() {
        let err = Config::parse(
            r#"
[[check]]
type = "command"
name = "Each"
command = ["lint"]
separately = true
"#,
        )
        .expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "Each.separately"));
    }

    #[test]
    fn test_empty_command_is_invalid() {
        let err = Config::parse("[[check]]\ntype = \"command\"\nname = \"X\"\ncommand = []\n")
            .expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "X.command"));
    }

    #[test]
    fn test_bad_timeout_is_invalid() {
        let err = Config::parse(
            "[[check]]\ntype = \"rust-format\"\ntimeout = \"soon\"\n",
        )
        .expect_err("should fail");
        assert!(
            matches!(err, Error::ConfigInvalid { ref field, .. } if field == "RustFormat.timeout")
        );
    }

    #[test]
    fn test_zero_max_parallel_is_invalid() {
        let err = Config::parse("[settings]\nmax_parallel = 0\n").expect_err("should fail");
        assert!(
            matches!(err, Error::ConfigInvalid { ref field, .. } if field == "settings.max_parallel")
        );
    }

    // =========================================================================
    // Loading tests
    // =========================================================================

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().expect("temp dir");
        let err = Config::load(temp.path()).expect_err("should fail");
        assert!(matches!(err, Error::ConfigNotFound { ref path } if path.ends_with(CONFIG_FILE_NAME)));
        assert!(err.to_string().contains("precommit init"));
    }

    #[test]
    fn test_load_from_root() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), DEFAULT_CONFIG).expect("write");
        let config = Config::load(temp.path()).expect("load");
        assert_eq!(config.checks.len(), 3);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::parse(DEFAULT_CONFIG).expect("valid");
        let text = toml::to_string(&config).expect("serialize");
        assert_eq!(Config::parse(&text).expect("reparse"), config);
    }
}
