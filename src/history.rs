//! Per-task event history.
//!
//! Each event is one small Markdown file under `<area>/<id>/history/`, named
//! after its UTC timestamp. Entries are never rewritten.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::format_timestamp;
use crate::task_file::{header_line, HEADER_MARKER};

pub const HISTORY_DIR: &str = "history";

/// Attempts at a free file name when several events share a second
const MAX_NAME_ATTEMPTS: usize = 100;

/// One event to record
#[derive(Debug, Clone)]
pub struct HistoryEntry<'a> {
    pub at: DateTime<Utc>,
    pub author: Option<&'a str>,
    pub message: &'a str,
}

impl HistoryEntry<'_> {
    /// Header with `time` and optional `author`, then the message
    pub fn render(&self) -> Result<String> {
        let mut content = String::new();
        content.push_str(&header_line("time", &format_timestamp(self.at))?);
        content.push('\n');
        if let Some(author) = self.author {
            content.push_str(&header_line("author", author)?);
            content.push('\n');
        }
        content.push_str(HEADER_MARKER);
        content.push('\n');
        content.push_str(self.message);
        if !self.message.ends_with('\n') {
            content.push('\n');
        }
        Ok(content)
    }

    fn file_stem(&self) -> String {
        self.at.format("%Y%m%dT%H%M%SZ").to_string()
    }
}

/// Write `entry` into `dir`, creating it if needed.
///
/// Names collide only within one second; later entries get a `-N` suffix.
pub fn append(dir: &Path, entry: &HistoryEntry<'_>) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let content = entry.render()?;
    let stem = entry.file_stem();

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.md")
        } else {
            format!("{stem}-{attempt}.md")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(content.as_bytes())?;
                tracing::debug!(path = %path.display(), "history entry written");
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::InvalidState {
        path: dir.to_path_buf(),
        message: format!("no free history file name for {stem}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn entry_has_time_author_and_message() {
        let entry = HistoryEntry {
            at: at(),
            author: Some("alice"),
            message: "tests passed",
        };
        assert_eq!(
            entry.render().unwrap(),
            "time: \"2024-03-01T12:30:05Z\"\nauthor: \"alice\"\n---\ntests passed\n"
        );
    }

    #[test]
    fn same_second_entries_get_distinct_names() {
        let dir = TempDir::new().unwrap();
        let history = dir.path().join("0004").join(HISTORY_DIR);
        let entry = HistoryEntry {
            at: at(),
            author: None,
            message: "first",
        };

        let first = append(&history, &entry).unwrap();
        let second = append(
            &history,
            &HistoryEntry {
                message: "second",
                ..entry.clone()
            },
        )
        .unwrap();

        assert_eq!(first.file_name().unwrap(), "20240301T123005Z.md");
        assert_eq!(second.file_name().unwrap(), "20240301T123005Z-1.md");
        assert_eq!(fs::read_to_string(&first).unwrap(), "time: \"2024-03-01T12:30:05Z\"\n---\nfirst\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "time: \"2024-03-01T12:30:05Z\"\n---\nsecond\n");
    }
}
