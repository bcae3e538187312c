//! plan - file-based task ledger
//!
//! Tracks work items for a repository in plain files that survive code
//! review and merges.
//!
//! # Core Concepts
//!
//! - **Ledger**: `plan/todo.toml`, one `[[task]]` block per task
//! - **Task documents**: one Markdown file per task under `plan/tasks/`
//! - **Archive**: documents of done tasks move to `plan/archive/`
//! - **Allocator**: `plan/next_id.txt`, a monotonic zero-padded counter
//!
//! # Module Organization
//!
//! - `allocator`: Task id allocation
//! - `task_file`: Task document creation, header parsing and archiving
//! - `ledger`: Permissive ledger parsing and in-place block edits
//! - `lifecycle`: Create and close across the three stores
//! - `history`: Per-task event log
//! - `validate`: Read-only consistency check
//! - `project`: CI outputs derived from `project.toml`
//! - `hook`: Lifecycle hook adapter
//! - `storage`: Plan directory layout
//! - `lock`: File locking and atomic writes
//! - `config`: Configuration loading from `.plan.toml`
//! - `cli`: Command-line interface using clap

pub mod allocator;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod hook;
pub mod ledger;
pub mod lifecycle;
pub mod lock;
pub mod output;
pub mod project;
pub mod storage;
pub mod task;
pub mod task_file;
pub mod validate;

pub use error::{Error, Result};
