//! Command-line interface for plan
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::lifecycle::Planner;

mod close;
mod create;
mod hook;
mod list;
mod log;
mod project;
mod validate;

/// plan - file-based task ledger
///
/// Tracks work items in a TOML ledger, one Markdown document per task, with
/// done tasks moved into an archive.
#[derive(Parser, Debug)]
#[command(name = "plan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the repository (defaults to current directory)
    #[arg(long, global = true, env = "PLAN_REPO")]
    pub repo: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task: allocate an id, write its document, record it
    Create {
        /// Task title (single line)
        title: String,

        /// Assignee (defaults to [tasks] default_assignee)
        #[arg(long)]
        assignee: Option<String>,

        /// Comma-separated labels
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
    },

    /// Close a task: archive its document and mark it done
    Close {
        /// Task id (short ids are zero-padded, e.g. 4 -> 0004)
        id: String,

        /// One-line resolution note
        #[arg(long)]
        resolution: Option<String>,
    },

    /// Record an event in a task's history
    Log {
        /// Task id
        id: String,

        /// Event text
        #[arg(short, long)]
        message: String,

        /// Who recorded the event
        #[arg(long)]
        author: Option<String>,
    },

    /// Check the ledger against the task documents
    Validate,

    /// List tasks
    List {
        /// Filter by status: open, done
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one task and its document header
    Show {
        /// Task id
        id: String,
    },

    /// Project manifest helpers
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Lifecycle hooks
    #[command(subcommand)]
    Hook(HookCommands),
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Emit CI outputs derived from project.toml
    Outputs {
        /// File to append outputs to (stdout when unset)
        #[arg(long = "output", env = "GITHUB_OUTPUT")]
        output: Option<PathBuf>,
    },
}

/// Hook subcommands
#[derive(Subcommand, Debug)]
pub enum HookCommands {
    /// Require an acceptance report before finishing a task
    PreFinish {
        /// Task id used when the stdin context has none
        #[arg(long, env = "PLAN_TASK_ID")]
        task_id: Option<String>,

        /// Repository root used when the stdin context has none
        #[arg(long, env = "PLAN_REPO_ROOT")]
        repo_root: Option<String>,
    },
}

impl Cli {
    /// Execute the parsed command
    pub fn run(self) -> Result<()> {
        tracing::debug!(command = ?self.command, "running plan command");
        match self.command {
            Commands::Create {
                title,
                assignee,
                labels,
            } => create::run(create::CreateOptions {
                title,
                assignee,
                labels,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Close { id, resolution } => close::run(close::CloseOptions {
                id,
                resolution,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Log {
                id,
                message,
                author,
            } => log::run(log::LogOptions {
                id,
                message,
                author,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Validate => validate::run(validate::ValidateOptions {
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List { status } => list::run_list(list::ListOptions {
                status,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { id } => list::run_show(list::ShowOptions {
                id,
                repo: self.repo,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Project(ProjectCommands::Outputs { output }) => {
                project::run_outputs(project::OutputsOptions {
                    output,
                    repo: self.repo,
                    json: self.json,
                    quiet: self.quiet,
                })
            }
            Commands::Hook(HookCommands::PreFinish { task_id, repo_root }) => {
                hook::run_pre_finish(hook::PreFinishOptions { task_id, repo_root })
            }
        }
    }
}

/// Repository root from `--repo`, falling back to the current directory
pub(crate) fn repo_root(repo: Option<PathBuf>) -> Result<PathBuf> {
    match repo {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

pub(crate) fn open_planner(repo: Option<PathBuf>) -> Result<Planner> {
    Planner::open(&repo_root(repo)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn labels_split_on_commas() {
        let cli = Cli::try_parse_from(["plan", "create", "Add retries", "--labels", "perf,net"])
            .unwrap();
        match cli.command {
            Commands::Create { labels, .. } => assert_eq!(labels, vec!["perf", "net"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn log_takes_short_message_flag() {
        let cli = Cli::try_parse_from(["plan", "log", "4", "-m", "tests passed"]).unwrap();
        match cli.command {
            Commands::Log {
                id,
                message,
                author,
            } => {
                assert_eq!(id, "4");
                assert_eq!(message, "tests passed");
                assert_eq!(author, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
