//! # precommit
//!
//! Simple, configurable git pre-commit checks with automatic fixes.
//!
//! A repository declares an ordered checklist in `precommit.toml`. Each check
//! looks at the files changed in the working tree, reports what it finds, and
//! may know how to fix it.
//!
//! ## Features
//!
//! - **Built-in checks**: mixed staged/unstaged changes, whitespace in paths,
//!   and a do-not-submit marker in added lines
//! - **Command checks**: run any tool once per batch of files or once per file
//! - **Presets**: black, flake8, isort, mypy, eslint and rustfmt out of the box
//! - **Fixes**: fixes are verified by re-running the check, then re-staged
//!
//! ## Example
//!
//! ```rust,no_run
//! use precommit::checks::{CheckSpec, DoNotSubmit};
//! use precommit::core::executor::CommandRunner;
//! use precommit::core::git::{GitRepo, RepositoryState};
//! use precommit::{Checklist, RunOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> precommit::Result<()> {
//!     let checklist = Checklist::from_init(|list| {
//!         list.check(DoNotSubmit::new(CheckSpec::new("DoNotSubmit")));
//!     });
//!
//!     let repo = GitRepo::discover()?;
//!     let runner = CommandRunner::new(repo.root());
//!     let report = checklist
//!         .execute(Arc::new(repo), runner, &RunOptions::default())
//!         .await?;
//!
//!     print!("{}", report.render());
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/precommit/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod presets;

// Re-export main types for convenience
pub use checks::{Check, CheckSpec};
pub use config::Config;
pub use core::error::{Error, Result};
pub use core::files::FileMode;
pub use core::pattern::PatternMatcher;
pub use core::report::{CheckOutcome, OutcomeStatus, Report, RunStatus};
pub use core::runner::{Checklist, ChecklistBuilder, RunOptions};
