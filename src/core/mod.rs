//! Core functionality for precommit.
//!
//! This module contains the main components:
//! - [`pattern`]: Include/exclude path matching
//! - [`files`]: The set of changed files a run looks at
//! - [`git`]: Git repository operations
//! - [`executor`]: External command execution
//! - [`runner`]: The checklist engine
//! - [`report`]: Outcomes and their rendering
//! - [`error`]: Error types and result handling

pub mod error;
pub mod executor;
pub mod files;
pub mod git;
pub mod interrupt;
pub mod pattern;
pub mod report;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;
