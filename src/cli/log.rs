//! plan log command implementation

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `plan log`
pub struct LogOptions {
    pub id: String,
    pub message: String,
    pub author: Option<String>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(options: LogOptions) -> Result<()> {
    let planner = super::open_planner(options.repo)?;
    let id = planner.parse_id(&options.id)?;
    let logged = planner.log_event(&id, &options.message, options.author.as_deref())?;

    let mut human = HumanOutput::new(format!("plan log: {}", logged.id));
    human.push_summary("path", logged.path.display().to_string());
    human.push_summary("time", logged.time.clone());
    if let Some(author) = &logged.author {
        human.push_summary("author", author.clone());
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "log",
        &logged,
        Some(&human),
    )
}
