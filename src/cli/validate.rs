//! plan validate command implementation

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::output::{emit_success, emit_with_status, HumanOutput, OutputOptions};

/// Options for `plan validate`
pub struct ValidateOptions {
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(options: ValidateOptions) -> Result<()> {
    let planner = super::open_planner(options.repo)?;
    let report = planner.validate()?;
    let output = OutputOptions {
        json: options.json,
        quiet: options.quiet,
    };

    if report.is_ok() {
        let mut human = HumanOutput::new("plan validate: ok");
        human.push_summary("records", report.records.to_string());
        return emit_success(output, "validate", &report, Some(&human));
    }

    let mut human = HumanOutput::new(format!(
        "plan validate: {} issue(s)",
        report.error_count()
    ));
    human.push_summary("records", report.records.to_string());
    for issue in &report.issues {
        let id = issue
            .id
            .as_deref()
            .map(|id| format!(" ({id})"))
            .unwrap_or_default();
        human.push_detail(format!(
            "[{}] line {}{id}: {}",
            issue.kind.as_str(),
            issue.line,
            issue.message
        ));
    }
    emit_with_status(output, "validate", "failed", &report, Some(&human))?;

    Err(Error::ValidationFailed {
        issues: report.error_count(),
    })
}
