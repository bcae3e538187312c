//! plan create command implementation

use std::path::PathBuf;

use crate::error::Result;
use crate::lifecycle::CreateTask;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `plan create`
pub struct CreateOptions {
    pub title: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(options: CreateOptions) -> Result<()> {
    let planner = super::open_planner(options.repo)?;
    let created = planner.create_task(CreateTask {
        title: options.title,
        assignee: options.assignee,
        labels: options.labels,
    })?;

    let mut human = HumanOutput::new(format!("plan create: {}", created.id));
    human.push_summary("title", created.title.clone());
    human.push_summary("assignee", created.assignee.clone());
    human.push_summary("task_file", created.task_file.clone());
    human.push_next_step(format!("plan close {}", created.id));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "create",
        &created,
        Some(&human),
    )
}
