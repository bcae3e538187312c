//! Lifecycle hook adapter.
//!
//! A hook reads one JSON context object on stdin and answers with
//! `{"ok": bool, "message": string}` on stdout. The `pre-finish` hook gates
//! closing a task on the presence of its acceptance report.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::PlanLayout;

/// Context handed to a hook. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HookContext {
    pub task_id: Option<String>,
    pub repo_root: Option<String>,
    pub task_file: Option<String>,
}

impl HookContext {
    /// Parse a context, treating empty or malformed input as an empty object
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "ignoring malformed hook context");
            Self::default()
        })
    }

    /// Read a context from `reader`. Unreadable or non-UTF-8 input is an
    /// empty context, so the environment fallbacks still apply.
    pub fn from_reader(mut reader: impl Read) -> Self {
        let mut raw = Vec::new();
        if let Err(err) = reader.read_to_end(&mut raw) {
            tracing::debug!(error = %err, "ignoring unreadable hook context");
            return Self::default();
        }
        match String::from_utf8(raw) {
            Ok(raw) => Self::parse(&raw),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring non-UTF-8 hook context");
                Self::default()
            }
        }
    }

    /// Fill missing fields from the environment fallbacks
    /// (`PLAN_TASK_ID`, `PLAN_REPO_ROOT`)
    pub fn with_fallbacks(mut self, task_id: Option<String>, repo_root: Option<String>) -> Self {
        self.task_id = non_empty(self.task_id).or_else(|| non_empty(task_id));
        self.repo_root = non_empty(self.repo_root).or_else(|| non_empty(repo_root));
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookResult {
    pub ok: bool,
    pub message: String,
}

impl HookResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn reject(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// `<root>/plan/tasks/<id>/reports/acceptance.md`
pub fn acceptance_report_path(repo_root: &Path, task_id: &str) -> PathBuf {
    PlanLayout::for_repo(repo_root)
        .tasks_dir()
        .join(task_id)
        .join("reports")
        .join("acceptance.md")
}

/// Require an acceptance report before a task may finish
pub fn pre_finish(ctx: &HookContext) -> HookResult {
    let Some(task_id) = ctx.task_id.as_deref() else {
        return HookResult::reject("missing task_id in ctx (or PLAN_TASK_ID)");
    };
    let root = Path::new(ctx.repo_root.as_deref().unwrap_or("."));

    let report = acceptance_report_path(root, task_id);
    if !report.exists() {
        return HookResult::reject(format!(
            "acceptance report not found at {}",
            report.display()
        ));
    }
    HookResult::ok("acceptance report found")
}
