//! Git repository operations.
//!
//! This module finds the repository root and hooks directory, and answers
//! the questions checks ask about version-control state: which files
//! changed, whether a file has both staged and unstaged edits, and what a
//! file's diff adds.

use crate::core::error::{Error, Result};
use crate::core::files::{FileMode, FileSet};
use regex::RegexBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Read access to version-control state for one invocation.
pub trait RepositoryState: Send + Sync + std::fmt::Debug {
    /// Root directory of the working tree.
    fn root(&self) -> &Path;

    /// Returns the changed files for a mode.
    ///
    /// Status is queried once and cached; later calls see the same set even
    /// if files change on disk.
    fn changed_files(&self, mode: FileMode) -> Result<FileSet>;

    /// Returns true if the path has staged changes and further unstaged edits.
    fn has_staged_and_unstaged_for(&self, path: &str) -> Result<bool>;

    /// Returns true if lines added to `path` contain `pattern`, ignoring case.
    ///
    /// The staged diff is searched for [`FileMode::Staged`], the unstaged diff
    /// for [`FileMode::Unstaged`], and both for [`FileMode::Working`].
    fn diff_contains(&self, path: &str, pattern: &str, mode: FileMode) -> Result<bool>;

    /// Adds paths to the index.
    fn stage(&self, paths: &[String]) -> Result<()>;
}

/// Kind of change reported by `git diff --name-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Added, copied, modified, renamed or type-changed.
    Modified,
    /// Deleted.
    Deleted,
}

/// A single entry of a status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the repository root (the new path for renames).
    pub path: String,
    /// Kind of change.
    pub kind: ChangeKind,
}

/// Cached staged and unstaged status of the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Changes staged in the index.
    pub staged: Vec<StatusEntry>,
    /// Changes in the working tree not yet staged.
    pub unstaged: Vec<StatusEntry>,
    /// Paths staged (not deleted) that also have unstaged changes.
    conflicts: HashSet<String>,
}

impl StatusSnapshot {
    /// Builds a snapshot from the two status listings.
    #[must_use]
    pub fn new(staged: Vec<StatusEntry>, unstaged: Vec<StatusEntry>) -> Self {
        let unstaged_paths: HashSet<&str> = unstaged.iter().map(|e| e.path.as_str()).collect();
        let conflicts = staged
            .iter()
            .filter(|e| e.kind == ChangeKind::Modified && unstaged_paths.contains(e.path.as_str()))
            .map(|e| e.path.clone())
            .collect();
        Self {
            staged,
            unstaged,
            conflicts,
        }
    }

    /// Builds the file set for a mode. Deleted paths are never included.
    #[must_use]
    pub fn file_set(&self, mode: FileMode) -> FileSet {
        let staged = live_paths(&self.staged);
        let unstaged = live_paths(&self.unstaged);
        FileSet::from_changes(&staged, &unstaged, mode)
    }

    /// Returns true if the path is staged and also has unstaged changes.
    #[must_use]
    pub fn has_staged_and_unstaged_for(&self, path: &str) -> bool {
        self.conflicts.contains(path)
    }
}

fn live_paths(entries: &[StatusEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|e| e.kind != ChangeKind::Deleted)
        .map(|e| e.path.as_str())
        .collect()
}

/// Parses the NUL-separated output of `git diff --name-status -z`.
pub fn parse_name_status(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut fields = output.split('\0').filter(|s| !s.is_empty());

    while let Some(status) = fields.next() {
        let code = status.chars().next().unwrap_or('M');
        // Renames and copies list the old path before the new one.
        let path = if matches!(code, 'R' | 'C') {
            fields.next();
            fields.next()
        } else {
            fields.next()
        };
        let Some(path) = path else {
            break;
        };
        let kind = if code == 'D' {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        };
        if seen.insert(path) {
            entries.push(StatusEntry {
                path: path.to_string(),
                kind,
            });
        }
    }

    entries
}

/// Returns true if the added lines of a unified diff contain `pattern`, ignoring case.
pub fn added_lines_contain(diff: &str, pattern: &str) -> bool {
    let Ok(re) = RegexBuilder::new(&regex::escape(pattern))
        .case_insensitive(true)
        .build()
    else {
        return false;
    };

    // File headers (`+++ b/path`) only appear before the first hunk of each file.
    let mut in_hunk = false;
    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            in_hunk = false;
        } else if line.starts_with("@@") {
            in_hunk = true;
        } else if in_hunk {
            if let Some(added) = line.strip_prefix('+') {
                if re.is_match(added) {
                    return true;
                }
            }
        }
    }
    false
}

/// Represents a Git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Root directory of the repository (where .git is).
    root: PathBuf,
    /// Path to the .git directory (or file for worktrees).
    git_dir: PathBuf,
    /// Status, queried on first use.
    status: OnceLock<StatusSnapshot>,
}

impl GitRepo {
    /// Discovers the Git repository from the current directory.
    pub fn discover() -> Result<Self> {
        Self::discover_from(&std::env::current_dir().map_err(|e| Error::io("get current dir", e))?)
    }

    /// Discovers the Git repository from a specific path.
    pub fn discover_from(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel", "--git-dir"])
            .current_dir(path)
            .output()
            .map_err(|e| Error::io("run git rev-parse", e))?;

        if !output.status.success() {
            return Err(Error::NotGitRepo);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();

        let root = lines.next().map(PathBuf::from).ok_or(Error::NotGitRepo)?;

        let git_dir = lines
            .next()
            .map(|s| {
                let p = PathBuf::from(s);
                if p.is_absolute() {
                    p
                } else {
                    path.join(p)
                }
            })
            .ok_or(Error::NotGitRepo)?;

        Ok(Self {
            root,
            git_dir,
            status: OnceLock::new(),
        })
    }

    /// Returns the .git directory path.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Returns the hooks directory path.
    #[must_use]
    pub fn hooks_dir(&self) -> PathBuf {
        // Check for custom hooks path first
        if let Ok(output) = Command::new("git")
            .args(["config", "--get", "core.hooksPath"])
            .current_dir(&self.root)
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    let hooks_path = PathBuf::from(&path);
                    if hooks_path.is_absolute() {
                        return hooks_path;
                    }
                    return self.root.join(hooks_path);
                }
            }
        }

        // Default to .git/hooks
        self.git_dir.join("hooks")
    }

    /// Returns the path to a specific hook.
    #[must_use]
    pub fn hook_path(&self, hook_name: &str) -> PathBuf {
        self.hooks_dir().join(hook_name)
    }

    /// Returns the cached status, querying git on first use.
    pub fn status(&self) -> Result<&StatusSnapshot> {
        if let Some(status) = self.status.get() {
            return Ok(status);
        }

        let snapshot = StatusSnapshot::new(
            parse_name_status(&self.git(&["diff", "--cached", "--name-status", "-z"])?),
            parse_name_status(&self.git(&["diff", "--name-status", "-z"])?),
        );
        tracing::debug!(
            staged = snapshot.staged.len(),
            unstaged = snapshot.unstaged.len(),
            "Queried repository status"
        );

        Ok(self.status.get_or_init(|| snapshot))
    }

    /// Runs a git command at the root and returns its stdout.
    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::io(format!("run git {}", args.join(" ")), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::git(args.join(" "), stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RepositoryState for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn changed_files(&self, mode: FileMode) -> Result<FileSet> {
        Ok(self.status()?.file_set(mode))
    }

    fn has_staged_and_unstaged_for(&self, path: &str) -> Result<bool> {
        Ok(self.status()?.has_staged_and_unstaged_for(path))
    }

    fn diff_contains(&self, path: &str, pattern: &str, mode: FileMode) -> Result<bool> {
        if mode.includes_staged() {
            let diff = self.git(&["diff", "--cached", "--unified=0", "--no-color", "--", path])?;
            if added_lines_contain(&diff, pattern) {
                return Ok(true);
            }
        }
        if mode.includes_unstaged() {
            let diff = self.git(&["diff", "--unified=0", "--no-color", "--", path])?;
            if added_lines_contain(&diff, pattern) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn stage(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        tracing::debug!(files = paths.len(), "Staged fixed files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("run git");
    }

    fn create_test_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path();

        git(path, &["init"]);
        git(path, &["config", "user.email", "test@test.com"]);
        git(path, &["config", "user.name", "Test"]);

        let repo = GitRepo::discover_from(path).expect("discover repo");
        (temp, repo)
    }

    fn commit_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).expect("write file");
        git(dir, &["add", name]);
        git(dir, &["commit", "-m", "initial"]);
    }

    // =========================================================================
    // Discovery tests
    // =========================================================================

    #[test]
    fn test_discover_from_subdirectory() {
        let (temp, _) = create_test_repo();

        let subdir = temp.path().join("src/lib");
        std::fs::create_dir_all(&subdir).expect("create subdir");

        let repo = GitRepo::discover_from(&subdir).expect("discover from subdir");
        // Canonicalize both paths to handle macOS /var -> /private/var symlinks
        let expected = temp.path().canonicalize().expect("canonicalize temp");
        let actual = repo.root().canonicalize().expect("canonicalize root");
        assert_eq!(actual, expected);
        assert!(repo.git_dir().exists());
    }

    #[test]
    fn test_not_git_repo() {
        let temp = TempDir::new().expect("create temp dir");
        let result = GitRepo::discover_from(temp.path());
        assert!(matches!(result, Err(Error::NotGitRepo)));
    }

    #[test]
    fn test_hook_path() {
        let (_temp, repo) = create_test_repo();
        let hook_path = repo.hook_path("pre-commit");
        assert!(hook_path.ends_with("hooks/pre-commit"));
    }

    // =========================================================================
    // Status tests
    // =========================================================================

    #[test]
    fn test_empty_repo_has_no_changes() {
        let (_temp, repo) = create_test_repo();
        let files = repo.changed_files(FileMode::Working).expect("status");
        assert!(files.is_empty());
    }

    #[test]
    fn test_staged_and_unstaged_partition() {
        let (temp, repo) = create_test_repo();
        let dir = temp.path();
        commit_file(dir, "a.py", "print(1)\n");
        commit_file(dir, "c.md", "# c\n");

        std::fs::write(dir.join("a.py"), "print(2)\n").expect("write");
        std::fs::write(dir.join("b.js"), "let b;\n").expect("write");
        git(dir, &["add", "a.py", "b.js"]);
        std::fs::write(dir.join("a.py"), "print(3)\n").expect("write");
        std::fs::write(dir.join("c.md"), "# changed\n").expect("write");

        let staged = repo.changed_files(FileMode::Staged).expect("staged");
        assert_eq!(staged.paths().collect::<Vec<_>>(), vec!["a.py", "b.js"]);

        let working = repo.changed_files(FileMode::Working).expect("working");
        assert_eq!(
            working.paths().collect::<Vec<_>>(),
            vec!["a.py", "b.js", "c.md"]
        );

        assert!(repo.has_staged_and_unstaged_for("a.py").expect("query"));
        assert!(!repo.has_staged_and_unstaged_for("b.js").expect("query"));
        assert!(!repo.has_staged_and_unstaged_for("c.md").expect("query"));
    }

    #[test]
    fn test_status_is_cached_for_the_invocation() {
        let (temp, repo) = create_test_repo();
        std::fs::write(temp.path().join("one.txt"), "1").expect("write");
        git(temp.path(), &["add", "one.txt"]);

        let first = repo.changed_files(FileMode::Staged).expect("first");

        std::fs::write(temp.path().join("two.txt"), "2").expect("write");
        git(temp.path(), &["add", "two.txt"]);

        let second = repo.changed_files(FileMode::Staged).expect("second");
        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_staged_deletion_is_not_in_file_set() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "gone.txt", "bye\n");
        git(temp.path(), &["rm", "gone.txt"]);

        let staged = repo.changed_files(FileMode::Staged).expect("staged");
        assert!(staged.is_empty());
        assert_eq!(repo.status().expect("status").staged.len(), 1);
    }

    // =========================================================================
    // Diff tests
    // =========================================================================

    const MARKER: &str = concat!("DO NOT ", "SUBMIT");

    #[test]
    fn test_diff_contains_staged_marker() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "main.py", "x = 1\n");
        std::fs::write(temp.path().join("main.py"), concat!("x = 1\n# do not ", "submit\n")).expect("write");
        git(temp.path(), &["add", "main.py"]);

        assert!(repo
            .diff_contains("main.py", MARKER, FileMode::Staged)
            .expect("diff"));
        assert!(!repo
            .diff_contains("main.py", MARKER, FileMode::Unstaged)
            .expect("diff"));
        assert!(repo
            .diff_contains("main.py", MARKER, FileMode::Working)
            .expect("diff"));
    }

    #[test]
    fn test_stage_adds_paths() {
        let (temp, repo) = create_test_repo();
        std::fs::write(temp.path().join("new.txt"), "new").expect("write");
        repo.stage(&["new.txt".to_string()]).expect("stage");

        let fresh = GitRepo::discover_from(temp.path()).expect("discover");
        let staged = fresh.changed_files(FileMode::Staged).expect("staged");
        assert_eq!(staged.paths().collect::<Vec<_>>(), vec!["new.txt"]);
    }

    // =========================================================================
    // Parsing tests
    // =========================================================================

    #[test]
    fn test_parse_name_status() {
        let entries = parse_name_status("M\0a.py\0D\0old.txt\0R100\0from.rs\0to.rs\0A\0b c.js\0");
        assert_eq!(
            entries,
            vec![
                StatusEntry {
                    path: "a.py".into(),
                    kind: ChangeKind::Modified
                },
                StatusEntry {
                    path: "old.txt".into(),
                    kind: ChangeKind::Deleted
                },
                StatusEntry {
                    path: "to.rs".into(),
                    kind: ChangeKind::Modified
                },
                StatusEntry {
                    path: "b c.js".into(),
                    kind: ChangeKind::Modified
                },
            ]
        );
    }

    #[test]
    fn test_parse_name_status_keeps_first_of_duplicates() {
        let entries = parse_name_status("M\0a.py\0D\0a.py\0M\0b.py\0");
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "b.py"]);
        assert_eq!(entries[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_snapshot_conflicts_skip_staged_deletions() {
        let entry = |path: &str, kind| StatusEntry {
            path: path.to_string(),
            kind,
        };
        let snapshot = StatusSnapshot::new(
            vec![
                entry("a.py", ChangeKind::Modified),
                entry("gone.py", ChangeKind::Deleted),
            ],
            vec![
                entry("a.py", ChangeKind::Modified),
                entry("gone.py", ChangeKind::Modified),
                entry("c.md", ChangeKind::Deleted),
            ],
        );
        assert!(snapshot.has_staged_and_unstaged_for("a.py"));
        assert!(!snapshot.has_staged_and_unstaged_for("gone.py"));
        assert!(!snapshot.has_staged_and_unstaged_for("c.md"));
    }

    #[test]
    fn test_parse_name_status_empty() {
        assert!(parse_name_status("").is_empty());
    }

    #[test]
    fn test_added_lines_contain() {
        let diff = format!("--- a/x\n+++ b/x\n@@ -1 +1 @@\n-{MARKER}\n+fine\n+{} yet\n", "Do Not Submit");
        assert!(added_lines_contain(&diff, MARKER));
        assert!(!added_lines_contain(&format!("-{MARKER}\n+ok\n"), MARKER));
        assert!(!added_lines_contain(&format!("+++ b/{MARKER}\n"), MARKER));
    }

    #[test]
    fn test_added_line_starting_with_plus_signs() {
        let diff = format!(
            "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -0,0 +1 @@\n+++ {MARKER}\n"
        );
        assert!(added_lines_contain(&diff, MARKER));
    }

    #[test]
    fn test_headers_of_later_files_are_skipped() {
        let diff = format!(
            "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n+ok\n\
             diff --git a/{MARKER} b/{MARKER}\n--- a/{MARKER}\n+++ b/{MARKER}\n@@ -1 +1 @@\n+fine\n"
        );
        assert!(!added_lines_contain(&diff, MARKER));
    }

    #[test]
    fn test_diff_contains_added_line_with_leading_plus() {
        let (temp, repo) = create_test_repo();
        commit_file(temp.path(), "notes.txt", "start\n");
        std::fs::write(temp.path().join("notes.txt"), format!("start\n++ {MARKER}\n"))
            .expect("write");
        git(temp.path(), &["add", "notes.txt"]);

        assert!(repo
            .diff_contains("notes.txt", MARKER, FileMode::Staged)
            .expect("diff"));
    }
}
