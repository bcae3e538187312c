//! plan close command implementation

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `plan close`
pub struct CloseOptions {
    pub id: String,
    pub resolution: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(options: CloseOptions) -> Result<()> {
    let planner = super::open_planner(options.repo)?;
    let id = planner.parse_id(&options.id)?;
    let closed = planner.close_task(&id, options.resolution.as_deref())?;

    let mut human = HumanOutput::new(format!("plan close: {}", closed.id));
    if closed.recovered {
        human.push_warning("task file was already archived; only the ledger was updated");
    }
    human.push_summary("task_file", closed.task_file.clone());
    human.push_summary("done", closed.done.clone());
    if let Some(resolution) = &closed.resolution {
        human.push_summary("resolution", resolution.clone());
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "close",
        &closed,
        Some(&human),
    )
}
