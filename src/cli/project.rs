//! plan project command implementations

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::project::ProjectOutputs;

/// Options for `plan project outputs`
pub struct OutputsOptions {
    pub output: Option<PathBuf>,
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct OutputsReport<'a> {
    outputs: &'a ProjectOutputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<&'a PathBuf>,
}

pub fn run_outputs(options: OutputsOptions) -> Result<()> {
    let root = super::repo_root(options.repo)?;
    let outputs = ProjectOutputs::load(&root)?;
    // An empty GITHUB_OUTPUT means "not running under Actions".
    let target = options.output.filter(|path| !path.as_os_str().is_empty());

    if let Some(path) = &target {
        outputs.append_to(path)?;
    } else if !options.json {
        print!("{}", outputs.render());
        return Ok(());
    }

    let mut human = HumanOutput::new("plan project outputs");
    if let Some(path) = &target {
        human.push_summary("written_to", path.display().to_string());
    }
    for (key, value) in outputs.pairs() {
        human.push_detail(format!("{key}={value}"));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project outputs",
        &OutputsReport {
            outputs: &outputs,
            written_to: target.as_ref(),
        },
        Some(&human),
    )
}
