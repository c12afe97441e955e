//! Include/exclude pattern matching for check file filters.
//!
//! Patterns are Unix shell-style wildcards (`*`, `?`, `[...]`) applied to
//! the repository-relative path string. `*` also matches `/`, so `*.py`
//! selects Python files at any depth.

use glob::Pattern;

/// A single compiled pattern.
///
/// Malformed patterns are kept as their literal text and only match a path
/// that is byte-for-byte identical to it.
#[derive(Debug, Clone)]
enum Compiled {
    Glob(Pattern),
    Literal(String),
}

impl Compiled {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(path),
            Self::Literal(text) => text == path,
        }
    }
}

/// Evaluates paths against ordered include and exclude pattern lists.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    include: Vec<Compiled>,
    exclude: Vec<Compiled>,
    warnings: Vec<String>,
}

impl PatternMatcher {
    /// Compiles the include and exclude lists.
    ///
    /// Never fails: a malformed pattern degrades to a literal and a warning
    /// is recorded instead.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Self {
        let mut warnings = Vec::new();
        let include = compile_all(include, &mut warnings);
        let exclude = compile_all(exclude, &mut warnings);
        Self {
            include,
            exclude,
            warnings,
        }
    }

    /// Returns true when the path is selected.
    ///
    /// A path is selected when the include list is empty or any include
    /// pattern matches, and no exclude pattern matches.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(path));
        included && !self.exclude.iter().any(|p| p.matches(path))
    }

    /// Filters paths, preserving their order.
    pub fn filter<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|path| self.matches(path))
            .map(str::to_string)
            .collect()
    }

    /// Warnings for patterns that failed to compile.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

fn compile_all<S: AsRef<str>>(patterns: &[S], warnings: &mut Vec<String>) -> Vec<Compiled> {
    patterns
        .iter()
        .map(|raw| {
            let raw = raw.as_ref();
            match Pattern::new(raw) {
                Ok(pattern) => Compiled::Glob(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %raw, error = %e, "Malformed pattern, matching literally");
                    warnings.push(format!("invalid pattern '{raw}': {e}"));
                    Compiled::Literal(raw.to_string())
                },
            }
        })
        .collect()
}

/// One-shot form of [`PatternMatcher::matches`].
#[must_use]
pub fn matches<S: AsRef<str>>(path: &str, include: &[S], exclude: &[S]) -> bool {
    PatternMatcher::new(include, exclude).matches(path)
}
