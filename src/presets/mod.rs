//! Command checks pre-wired for common tools.
//!
//! Every preset passes the applicable files to its tool in one invocation.

use crate::checks::CommandOptions;

/// Preset names, as used in reports.
pub mod names {
    /// Python formatting (black).
    pub const PYTHON_FORMAT: &str = "PythonFormat";
    /// Python linting (flake8).
    pub const PYTHON_LINT: &str = "PythonLint";
    /// Python import order (isort).
    pub const PYTHON_IMPORT_ORDER: &str = "PythonImportOrder";
    /// Python type checking (mypy).
    pub const PYTHON_TYPES: &str = "PythonTypes";
    /// JavaScript linting (eslint).
    pub const JAVASCRIPT_LINT: &str = "JavaScriptLint";
    /// Rust formatting (rustfmt via cargo).
    pub const RUST_FORMAT: &str = "RustFormat";
}

/// A known tool integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// `black --check`, fixed with `black`.
    PythonFormat,
    /// `flake8`.
    PythonLint,
    /// `isort -c`, fixed with `isort`.
    PythonImportOrder,
    /// `mypy`.
    PythonTypes,
    /// `npx eslint`, fixed with `npx eslint --fix`.
    JavaScriptLint,
    /// `cargo fmt -- --check`, fixed with `cargo fmt --`.
    RustFormat,
}

impl Preset {
    /// Every preset.
    pub const ALL: [Self; 6] = [
        Self::PythonFormat,
        Self::PythonLint,
        Self::PythonImportOrder,
        Self::PythonTypes,
        Self::JavaScriptLint,
        Self::RustFormat,
    ];

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PythonFormat => names::PYTHON_FORMAT,
            Self::PythonLint => names::PYTHON_LINT,
            Self::PythonImportOrder => names::PYTHON_IMPORT_ORDER,
            Self::PythonTypes => names::PYTHON_TYPES,
            Self::JavaScriptLint => names::JAVASCRIPT_LINT,
            Self::RustFormat => names::RUST_FORMAT,
        }
    }

    /// Returns a one-line description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::PythonFormat => "Python formatting with black",
            Self::PythonLint => "Python linting with flake8",
            Self::PythonImportOrder => "Python import order with isort",
            Self::PythonTypes => "Python type checking with mypy",
            Self::JavaScriptLint => "JavaScript linting with eslint",
            Self::RustFormat => "Rust formatting with cargo fmt",
        }
    }

    const fn command(&self) -> &'static [&'static str] {
        match self {
            Self::PythonFormat => &["black", "--check"],
            Self::PythonLint => &["flake8", "--max-line-length=88"],
            Self::PythonImportOrder => &["isort", "-c"],
            Self::PythonTypes => &["mypy"],
            Self::JavaScriptLint => &["npx", "eslint"],
            Self::RustFormat => &["cargo", "fmt", "--", "--check"],
        }
    }

    const fn fix_command(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::PythonFormat => Some(&["black"]),
            Self::PythonImportOrder => Some(&["isort"]),
            Self::JavaScriptLint => Some(&["npx", "eslint", "--fix"]),
            Self::RustFormat => Some(&["cargo", "fmt", "--"]),
            Self::PythonLint | Self::PythonTypes => None,
        }
    }

    /// Returns the default include pattern.
    #[must_use]
    pub const fn default_include(&self) -> &'static str {
        match self {
            Self::PythonFormat | Self::PythonLint | Self::PythonImportOrder | Self::PythonTypes => {
                "*.py"
            },
            Self::JavaScriptLint => "*.js",
            Self::RustFormat => "*.rs",
        }
    }

    /// Builds command options for this preset.
    ///
    /// `args` are appended to both the check and fix commands; `include`
    /// patterns are appended after the preset's own.
    #[must_use]
    pub fn options(&self, args: &[String], include: &[String]) -> CommandOptions {
        let with_args = |base: &[&str]| -> Vec<String> {
            base.iter()
                .map(|s| (*s).to_string())
                .chain(args.iter().cloned())
                .collect()
        };

        let mut patterns = vec![self.default_include().to_string()];
        patterns.extend(include.iter().cloned());

        let mut options = CommandOptions::new(self.name(), with_args(self.command()))
            .pass_files(true)
            .include(patterns);
        if let Some(fix) = self.fix_command() {
            options = options.fix(with_args(fix));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, CommandCheck};
    use crate::core::executor::PassFiles;

    #[test]
    fn test_args_go_to_check_and_fix() {
        let options = Preset::PythonFormat.options(&["--line-length=100".to_string()], &[]);
        assert_eq!(options.command, vec!["black", "--check", "--line-length=100"]);
        assert_eq!(
            options.fix,
            Some(vec!["black".to_string(), "--line-length=100".to_string()])
        );
        assert!(options.pass_files);
        assert!(!options.separately);
    }

    #[test]
    fn test_extra_include_appended() {
        let options = Preset::PythonTypes.options(&[], &["*.pyi".to_string()]);
        assert_eq!(options.include, vec!["*.py", "*.pyi"]);
        assert!(options.fix.is_none());
    }

    #[test]
    fn test_every_preset_builds() {
        for preset in Preset::ALL {
            let check = CommandCheck::new(preset.options(&[], &[])).expect("preset builds");
            assert_eq!(check.spec().name, preset.name());
            assert_eq!(check.spec().can_fix, preset.fix_command().is_some());
            assert_eq!(check.command().pass_files, PassFiles::Batch);
            assert!(!preset.description().is_empty());
        }
    }

    #[test]
    fn test_only_formatters_and_eslint_fix() {
        let fixable: Vec<&str> = Preset::ALL
            .iter()
            .filter(|p| p.fix_command().is_some())
            .map(Preset::name)
            .collect();
        assert_eq!(
            fixable,
            vec!["PythonFormat", "PythonImportOrder", "JavaScriptLint", "RustFormat"]
        );
    }
}
