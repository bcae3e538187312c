//! Task documents: one Markdown file per task.
//!
//! ```text
//! ---
//! id: "0004"
//! title: "Add retries"
//! created: "2024-01-01T00:00:00Z"
//! assignee: "bob"
//! status: "open"
//! ---
//!
//! ## Goal
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::PlanLayout;
use crate::task::{TaskId, TaskStatus};

/// Marker line before and after the metadata header
pub const HEADER_MARKER: &str = "---";

const BODY_TEMPLATE: &str = "## Goal\n\n";
const MAX_SLUG_LEN: usize = 48;

/// What [`TaskFileStore::archive`] found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The file was moved into the archive
    Moved(PathBuf),
    /// The source was gone but the archive already holds the file
    AlreadyArchived(PathBuf),
    /// Neither the source nor an archived copy exists
    Missing,
}

/// Parsed metadata header of a task document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskHeader {
    pub id: Option<String>,
    pub title: Option<String>,
    pub created: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskFileStore {
    tasks_dir: PathBuf,
    archive_dir: PathBuf,
}

impl TaskFileStore {
    pub fn new(layout: &PlanLayout) -> Self {
        Self {
            tasks_dir: layout.tasks_dir(),
            archive_dir: layout.archive_dir(),
        }
    }

    /// Path a new task document will be written to
    pub fn path_for(&self, id: &TaskId, title: &str) -> PathBuf {
        self.tasks_dir.join(file_name(id, title))
    }

    /// Write a new document with an `open` header. Never overwrites.
    pub fn create(&self, id: &TaskId, title: &str, assignee: &str, created: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.tasks_dir)?;
        let path = self.path_for(id, title);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::TaskFileExists(path));
            }
            Err(err) => return Err(err.into()),
        };

        let mut content = String::new();
        content.push_str(HEADER_MARKER);
        content.push('\n');
        for (key, value) in [
            ("id", id.as_str()),
            ("title", title),
            ("created", created),
            ("assignee", assignee),
            ("status", TaskStatus::Open.as_str()),
        ] {
            content.push_str(&header_line(key, value)?);
            content.push('\n');
        }
        content.push_str(HEADER_MARKER);
        content.push_str("\n\n");
        content.push_str(BODY_TEMPLATE);

        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        tracing::debug!(path = %path.display(), "task file created");
        Ok(path)
    }

    /// Move a document from the active area into the archive, keeping its
    /// file name.
    pub fn archive(&self, path: &Path) -> Result<ArchiveOutcome> {
        let Some(name) = path.file_name() else {
            return Ok(ArchiveOutcome::Missing);
        };
        let target = self.archive_dir.join(name);

        if path == target {
            return Ok(if target.exists() {
                ArchiveOutcome::AlreadyArchived(target)
            } else {
                ArchiveOutcome::Missing
            });
        }

        if !path.exists() {
            if target.exists() {
                return Ok(ArchiveOutcome::AlreadyArchived(target));
            }
            return Ok(ArchiveOutcome::Missing);
        }

        if target.exists() {
            return Err(Error::TaskFileExists(target));
        }

        fs::create_dir_all(&self.archive_dir)?;
        if let Err(err) = fs::rename(path, &target) {
            // Cross-device moves cannot rename
            tracing::debug!(error = %err, "rename failed, copying task file instead");
            fs::copy(path, &target)?;
            fs::remove_file(path)?;
        }
        tracing::debug!(from = %path.display(), to = %target.display(), "task file archived");
        Ok(ArchiveOutcome::Moved(target))
    }
}

/// `<id>-<slug>.md`
pub fn file_name(id: &TaskId, title: &str) -> String {
    format!("{id}-{}.md", slugify(title))
}

/// Lower-case, non-alphanumeric runs collapsed to `-`, capped in length
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug
    }
}

pub(crate) fn header_line(key: &str, value: &str) -> Result<String> {
    Ok(format!("{key}: {}", serde_json::to_string(value)?))
}

fn parse_header_line(line: &str) -> Option<(&str, String)> {
    let (key, raw) = line.split_once(':')?;
    let key = key.trim();
    let raw = raw.trim();
    let value = if raw.starts_with('"') {
        serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.trim_matches('"').to_string())
    } else {
        raw.to_string()
    };
    Some((key, value))
}

fn is_marker_line(line: &[u8]) -> bool {
    line.trim_ascii() == HEADER_MARKER.as_bytes()
}

/// Byte length of the metadata header, both marker lines included.
///
/// Only the header has to be text; the body is kept as raw bytes.
fn header_len(content: &[u8]) -> Option<usize> {
    let mut lines = content.split_inclusive(|byte| *byte == b'\n');
    let opening = lines.next()?;
    if !is_marker_line(opening) {
        return None;
    }
    let mut offset = opening.len();
    for line in lines {
        offset += line.len();
        if is_marker_line(line) {
            return Some(offset);
        }
    }
    None
}

/// Parse the metadata header of a document
pub fn read_header(path: &Path) -> Result<TaskHeader> {
    let content = fs::read(path)?;
    let mut header = TaskHeader::default();
    let Some(len) = header_len(&content) else {
        return Ok(header);
    };

    let text = String::from_utf8_lossy(&content[..len]);
    for line in text.lines().filter(|line| line.trim() != HEADER_MARKER) {
        let Some((key, value)) = parse_header_line(line) else {
            continue;
        };
        let slot = match key {
            "id" => &mut header.id,
            "title" => &mut header.title,
            "created" => &mut header.created,
            "assignee" => &mut header.assignee,
            "status" => &mut header.status,
            _ => continue,
        };
        slot.get_or_insert(value);
    }
    Ok(header)
}

/// Rewrite the header `status:` line. Returns `false` if there is none.
pub fn set_status(path: &Path, status: TaskStatus) -> Result<bool> {
    let content = fs::read(path)?;
    let Some(len) = header_len(&content) else {
        return Ok(false);
    };
    let Ok(header) = std::str::from_utf8(&content[..len]) else {
        return Ok(false);
    };

    let mut rewritten = String::with_capacity(header.len());
    let mut replaced = false;
    for line in header.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let is_status = body.trim() != HEADER_MARKER
            && parse_header_line(body).is_some_and(|(key, _)| key == "status");
        if is_status && !replaced {
            rewritten.push_str(&header_line("status", status.as_str())?);
            rewritten.push_str(&line[body.len()..]);
            replaced = true;
        } else {
            rewritten.push_str(line);
        }
    }
    if !replaced {
        return Ok(false);
    }

    let mut out = rewritten.into_bytes();
    out.extend_from_slice(&content[len..]);
    crate::lock::write_atomic(path, &out)?;
    Ok(true)
}
