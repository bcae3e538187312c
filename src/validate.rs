//! Read-only consistency check of the ledger against the filesystem.
//!
//! Validation accumulates: every block is checked and every problem reported,
//! so one run lists everything that needs fixing. Only a missing ledger is
//! fatal.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::ledger::{Ledger, ParsedBlock};
use crate::storage::PlanLayout;
use crate::task::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Block cannot be read as a record, or repeats an earlier id
    Structural,
    /// Record points at a file that does not exist
    Referential,
    /// File exists but sits in the wrong area for the record's status
    Placement,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Structural => "structural",
            IssueKind::Referential => "referential",
            IssueKind::Placement => "placement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 1-based line of the block marker
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub ledger: PathBuf,
    /// Number of blocks examined
    pub records: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.issues.len()
    }

    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn validate(layout: &PlanLayout) -> Result<ValidationReport> {
    let ledger = Ledger::new(layout.ledger_file());
    let document = ledger.load()?;
    let blocks = document.parse_located();

    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (line, block) in &blocks {
        let record = match block {
            ParsedBlock::Valid(record) => record,
            ParsedBlock::Invalid(invalid) => {
                issues.push(ValidationIssue {
                    kind: IssueKind::Structural,
                    id: invalid.id.clone(),
                    line: *line,
                    message: format!("{} ({})", invalid.reason, invalid.excerpt),
                });
                continue;
            }
        };

        let id = record.id.to_string();
        if !seen.insert(id.clone()) {
            issues.push(ValidationIssue {
                kind: IssueKind::Structural,
                id: Some(id),
                line: *line,
                message: format!("duplicate id {}", record.id),
            });
            continue;
        }

        let path = layout.resolve(&record.task_file);
        if !path.is_file() {
            issues.push(ValidationIssue {
                kind: IssueKind::Referential,
                id: Some(id),
                line: *line,
                message: format!("task file not found: {}", record.task_file),
            });
            continue;
        }

        let archived = layout.is_archived(&path);
        let misplaced = match record.status {
            TaskStatus::Done if !archived => Some("done task is not archived"),
            TaskStatus::Open if archived => Some("open task is in the archive"),
            _ => None,
        };
        if let Some(problem) = misplaced {
            issues.push(ValidationIssue {
                kind: IssueKind::Placement,
                id: Some(id),
                line: *line,
                message: format!("{problem}: {}", record.task_file),
            });
        }
    }

    tracing::debug!(
        ledger = %ledger.path().display(),
        records = blocks.len(),
        issues = issues.len(),
        "validated plan"
    );
    Ok(ValidationReport {
        ledger: ledger.path().to_path_buf(),
        records: blocks.len(),
        issues,
    })
}
