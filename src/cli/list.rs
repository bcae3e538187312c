//! plan list / show command implementations

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::task::TaskStatus;

/// Options for `plan list`
pub struct ListOptions {
    pub status: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `plan show`
pub struct ShowOptions {
    pub id: String,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let status = options
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()?;
    let planner = super::open_planner(options.repo)?;
    let records = planner.list(status)?;

    let mut human = HumanOutput::new(format!("plan list: {} task(s)", records.len()));
    for record in &records {
        human.push_detail(format!(
            "{} [{}] {} ({})",
            record.id, record.status, record.title, record.assignee
        ));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &records,
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let planner = super::open_planner(options.repo)?;
    let id = planner.parse_id(&options.id)?;
    let view = planner.show(&id)?;
    let record = &view.record;

    let mut human = HumanOutput::new(format!("plan show: {}", record.id));
    human.push_summary("title", record.title.clone());
    human.push_summary("status", record.status.to_string());
    human.push_summary("assignee", record.assignee.clone());
    human.push_summary("created", record.created.clone());
    if !record.labels.is_empty() {
        human.push_summary("labels", record.labels.join(", "));
    }
    human.push_summary("task_file", record.task_file.clone());
    if let Some(done) = &record.done {
        human.push_summary("done", done.clone());
    }
    if let Some(resolution) = &record.resolution {
        human.push_summary("resolution", resolution.clone());
    }
    if !view.exists {
        human.push_warning(format!("task file missing: {}", view.path.display()));
        human.push_next_step("plan validate");
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &view,
        Some(&human),
    )
}
