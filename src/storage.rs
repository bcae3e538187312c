//! Plan directory layout
//!
//! Resolves every path the plan commands touch from the repository root.
//!
//! # Directory Structure
//!
//! ```text
//! plan/
//!   todo.toml        # Ledger, one [[task]] block per task
//!   next_id.txt      # Allocator counter, e.g. "0005\n"
//!   .plan.lock       # Advisory lock held by mutating commands
//!   tasks/           # Active area: documents of open tasks
//!     0004-add-retries.md
//!   archive/         # Archive area: documents of done tasks
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::error::Result;

pub const LEDGER_FILE: &str = "todo.toml";
pub const NEXT_ID_FILE: &str = "next_id.txt";
pub const LOCK_FILE: &str = ".plan.lock";
pub const TASKS_DIR: &str = "tasks";
pub const ARCHIVE_DIR: &str = "archive";

/// Paths of one plan directory
#[derive(Debug, Clone)]
pub struct PlanLayout {
    plan_dir: PathBuf,
}

impl PlanLayout {
    pub fn new(repo_root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            plan_dir: repo_root.into().join(config.plan_dir.trim()),
        }
    }

    /// Layout with the default `plan/` directory
    pub fn for_repo(repo_root: impl Into<PathBuf>) -> Self {
        Self::new(repo_root, &Config::default())
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Plan root; `task_file` values are relative to it
    pub fn plan_dir(&self) -> &Path {
        &self.plan_dir
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.plan_dir.join(LEDGER_FILE)
    }

    pub fn next_id_file(&self) -> PathBuf {
        self.plan_dir.join(NEXT_ID_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.plan_dir.join(LOCK_FILE)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.plan_dir.join(TASKS_DIR)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.plan_dir.join(ARCHIVE_DIR)
    }

    // =========================================================================
    // Directory initialization
    // =========================================================================

    /// Create the plan, active and archive directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.tasks_dir())?;
        fs::create_dir_all(self.archive_dir())?;
        Ok(())
    }

    // =========================================================================
    // Task file paths
    // =========================================================================

    /// Resolve a ledger `task_file` value against the plan root
    pub fn resolve(&self, task_file: &str) -> PathBuf {
        normalize(&self.plan_dir.join(task_file))
    }

    /// Express a path under the plan root as a ledger `task_file` value
    ///
    /// Separators are always `/` so the ledger is portable.
    pub fn relative(&self, path: &Path) -> String {
        let normalized = normalize(path);
        let plan_dir = normalize(&self.plan_dir);
        let rel = normalized.strip_prefix(&plan_dir).unwrap_or(&normalized);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether the resolved path lies inside the archive area
    pub fn is_archived(&self, path: &Path) -> bool {
        normalize(path).starts_with(normalize(&self.archive_dir()))
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
