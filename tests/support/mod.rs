#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch repository root for driving the `plan` binary
pub struct TestPlan {
    dir: TempDir,
}

impl TestPlan {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn plan_dir(&self) -> PathBuf {
        self.dir.path().join("plan")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.plan_dir().join("todo.toml")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_file(&self, rel_path: &str) -> std::io::Result<String> {
        fs::read_to_string(self.dir.path().join(rel_path))
    }

    pub fn exists(&self, rel_path: &str) -> bool {
        self.dir.path().join(rel_path).exists()
    }

    pub fn ledger(&self) -> String {
        fs::read_to_string(self.ledger_path()).unwrap_or_default()
    }

    /// `plan` command rooted at this repository
    pub fn cmd(&self) -> Command {
        let mut cmd = plan_cmd();
        cmd.current_dir(self.path());
        cmd
    }
}

/// `plan` binary with the environment fallbacks cleared
pub fn plan_cmd() -> Command {
    let mut cmd = Command::cargo_bin("plan").expect("binary");
    for var in [
        "PLAN_REPO",
        "PLAN_TASK_ID",
        "PLAN_REPO_ROOT",
        "GITHUB_OUTPUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("valid json output")
}
