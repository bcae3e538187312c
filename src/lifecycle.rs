//! Task lifecycle: create and close across the allocator, the task
//! documents and the ledger.
//!
//! Mutating operations hold the plan lock from start to finish. Their step
//! order is chosen so that an interrupted run is either harmless or repaired
//! by simply running the same command again:
//!
//! - create: counter, then document, then ledger. A crash burns an id and may
//!   leave an orphan document; the ledger never references a missing file.
//! - close: document move, then ledger. Re-running close on a task whose
//!   document already sits in the archive only fixes the ledger.
//! - log: a new history file per event; existing entries are never touched.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::allocator::IdAllocator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::{self, HistoryEntry, HISTORY_DIR};
use crate::ledger::{Ledger, ParsedBlock};
use crate::lock::FileLock;
use crate::storage::PlanLayout;
use crate::task::{format_timestamp, TaskId, TaskRecord, TaskStatus};
use crate::task_file::{self, ArchiveOutcome, TaskFileStore, TaskHeader};
use crate::validate::{self, ValidationReport};

/// Input for [`Planner::create_task`]
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub assignee: Option<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedTask {
    pub id: TaskId,
    pub title: String,
    pub assignee: String,
    pub task_file: String,
    pub path: PathBuf,
    pub created: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosedTask {
    pub id: TaskId,
    pub task_file: String,
    pub path: PathBuf,
    pub done: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// The document was already archived by an earlier, interrupted close
    pub recovered: bool,
}

/// An event written to a task's history
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub id: TaskId,
    pub path: PathBuf,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A record together with what its document says
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub record: TaskRecord,
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<TaskHeader>,
}

pub struct Planner {
    layout: PlanLayout,
    config: Config,
    clock: Box<dyn Fn() -> DateTime<Utc>>,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Planner {
    pub fn new(layout: PlanLayout, config: Config) -> Self {
        Self {
            layout,
            config,
            clock: Box::new(Utc::now),
        }
    }

    /// Open the plan of a repository, reading `.plan.toml` if present
    pub fn open(repo_root: &Path) -> Result<Self> {
        let config = Config::load_from_repo(repo_root)?;
        let layout = PlanLayout::new(repo_root, &config);
        Ok(Self::new(layout, config))
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn layout(&self) -> &PlanLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.layout.ledger_file())
    }

    pub fn allocator(&self) -> IdAllocator {
        IdAllocator::new(self.layout.next_id_file(), &self.config.ids)
    }

    pub fn task_files(&self) -> TaskFileStore {
        TaskFileStore::new(&self.layout)
    }

    fn now(&self) -> String {
        format_timestamp((self.clock)())
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.layout.lock_file(), self.config.lock.timeout_ms)
    }

    /// Parse a user-supplied id, padding it to the configured width
    pub fn parse_id(&self, input: &str) -> Result<TaskId> {
        TaskId::normalize(input, self.config.ids.width)
    }

    /// Allocate an id, write the task document and append the ledger record
    pub fn create_task(&self, request: CreateTask) -> Result<CreatedTask> {
        let title = single_line("title", &request.title)?;
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }
        let assignee = match request.assignee.as_deref().map(str::trim) {
            Some(assignee) if !assignee.is_empty() => single_line("assignee", assignee)?,
            _ => self.config.tasks.default_assignee.clone(),
        };
        let labels = request
            .labels
            .iter()
            .map(|label| single_line("label", label))
            .filter(|label| !matches!(label, Ok(value) if value.is_empty()))
            .collect::<Result<Vec<_>>>()?;

        let _lock = self.lock()?;
        self.layout.ensure_dirs()?;

        let ledger = self.ledger();
        let mut document = ledger.load_or_empty()?;

        // The counter advances here even if a later step fails.
        let id = self
            .allocator()
            .next_id_with_seed(|| Ok(document.max_id().map_or(1, |max| max + 1)))?;
        if document.contains(&id) {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let created = self.now();
        let store = self.task_files();
        let record = TaskRecord {
            id: id.clone(),
            title: title.clone(),
            status: TaskStatus::Open,
            assignee: assignee.clone(),
            created: created.clone(),
            labels,
            task_file: self.layout.relative(&store.path_for(&id, &title)),
            done: None,
            resolution: None,
        };
        record.validate()?;

        let path = store.create(&id, &title, &assignee, &created)?;
        document.append(&record)?;
        ledger.save(&document)?;

        tracing::info!(id = %id, task_file = %record.task_file, "task created");
        Ok(CreatedTask {
            id,
            title,
            assignee,
            task_file: record.task_file,
            path,
            created,
        })
    }

    /// Archive the task document and mark the record done
    pub fn close_task(&self, id: &TaskId, resolution: Option<&str>) -> Result<ClosedTask> {
        let resolution = match resolution.map(str::trim) {
            Some(text) if !text.is_empty() => Some(single_line("resolution", text)?),
            _ => None,
        };

        let ledger = self.ledger();
        // Checked before locking; the lock would create the plan directory.
        if !ledger.exists() {
            return Err(Error::LedgerNotFound(ledger.path().to_path_buf()));
        }
        let _lock = self.lock()?;
        let mut document = ledger.load()?;

        let record = document.record(id)?;
        if record.status == TaskStatus::Done {
            return Err(Error::TaskAlreadyClosed(id.to_string()));
        }

        let source = self.layout.resolve(&record.task_file);
        let (archived, recovered) = match self.task_files().archive(&source)? {
            ArchiveOutcome::Moved(path) => (path, false),
            ArchiveOutcome::AlreadyArchived(path) => {
                tracing::warn!(
                    id = %id,
                    path = %path.display(),
                    "task file already archived; repairing ledger only"
                );
                (path, true)
            }
            ArchiveOutcome::Missing => {
                return Err(Error::TaskFileMissing {
                    id: id.to_string(),
                    path: source,
                });
            }
        };

        // Best effort: the ledger update never depends on the header.
        match task_file::set_status(&archived, TaskStatus::Done) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(path = %archived.display(), "task file has no status header");
            }
            Err(err) => {
                tracing::warn!(
                    path = %archived.display(),
                    error = %err,
                    "could not rewrite task file header; updating ledger anyway"
                );
            }
        }

        let done = self.now();
        let task_file = self.layout.relative(&archived);
        let mut extra = vec![("done", toml::Value::from(done.as_str()))];
        if let Some(text) = &resolution {
            extra.push(("resolution", toml::Value::from(text.as_str())));
        }
        document.set_field(id, "task_file", task_file.as_str())?;
        document.update_status(id, TaskStatus::Done, &extra)?;
        ledger.save(&document)?;

        tracing::info!(id = %id, task_file = %task_file, recovered, "task closed");
        Ok(ClosedTask {
            id: id.clone(),
            task_file,
            path: archived,
            done,
            resolution,
            recovered,
        })
    }

    /// Append an event to the task's history
    pub fn log_event(&self, id: &TaskId, message: &str, author: Option<&str>) -> Result<LoggedEvent> {
        if message.trim().is_empty() {
            return Err(Error::InvalidArgument("message cannot be empty".to_string()));
        }
        let author = match author.map(str::trim) {
            Some(name) if !name.is_empty() => Some(single_line("author", name)?),
            _ => None,
        };

        let ledger = self.ledger();
        if !ledger.exists() {
            return Err(Error::LedgerNotFound(ledger.path().to_path_buf()));
        }
        let _lock = self.lock()?;
        let record = ledger.load()?.record(id)?;

        let at = (self.clock)();
        let dir = self.history_dir(&record);
        let path = history::append(
            &dir,
            &HistoryEntry {
                at,
                author: author.as_deref(),
                message,
            },
        )?;

        tracing::info!(id = %id, path = %path.display(), "event logged");
        Ok(LoggedEvent {
            id: id.clone(),
            path,
            time: format_timestamp(at),
            author,
        })
    }

    /// `tasks/<id>/history` once it exists; otherwise the area that holds
    /// the task document.
    fn history_dir(&self, record: &TaskRecord) -> PathBuf {
        let id = record.id.as_str();
        let active = self.layout.tasks_dir().join(id).join(HISTORY_DIR);
        if active.is_dir() {
            return active;
        }
        let area = if self.layout.is_archived(&self.layout.resolve(&record.task_file)) {
            self.layout.archive_dir()
        } else {
            self.layout.tasks_dir()
        };
        area.join(id).join(HISTORY_DIR)
    }

    /// Structurally valid records, optionally filtered by status
    pub fn list(&self, status: Option<TaskStatus>) -> Result<Vec<TaskRecord>> {
        let document = self.ledger().load_or_empty()?;
        Ok(document
            .parse_all()
            .into_iter()
            .filter_map(|block| match block {
                ParsedBlock::Valid(record) => Some(record),
                ParsedBlock::Invalid(invalid) => {
                    tracing::debug!(line = invalid.line, reason = %invalid.reason, "skipping invalid block");
                    None
                }
            })
            .filter(|record| status.map_or(true, |wanted| record.status == wanted))
            .collect())
    }

    /// A record plus the parsed header of its document
    pub fn show(&self, id: &TaskId) -> Result<TaskView> {
        let record = self.ledger().load()?.record(id)?;
        let path = self.layout.resolve(&record.task_file);
        let exists = path.is_file();
        let header = if exists {
            Some(task_file::read_header(&path)?)
        } else {
            None
        };
        Ok(TaskView {
            record,
            path,
            exists,
            header,
        })
    }

    /// Read-only consistency check of ledger against filesystem
    pub fn validate(&self) -> Result<ValidationReport> {
        validate::validate(&self.layout)
    }
}

fn single_line(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.contains(['\n', '\r']) {
        return Err(Error::InvalidArgument(format!("{field} cannot span lines")));
    }
    Ok(trimmed.to_string())
}
