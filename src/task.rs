//! Task data model shared by the ledger, the task documents and the CLI.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// A task id: zero-padded decimal text such as `0007`.
///
/// Stored and compared as text; only the allocator interprets it as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Parse an id exactly as written in the ledger
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        if !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(Error::InvalidArgument(format!(
                "task id must be decimal digits: '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse user input, padding short ids (`7` -> `0007`)
    pub fn normalize(value: &str, width: usize) -> Result<Self> {
        let id = Self::parse(value)?;
        if id.0.len() >= width {
            return Ok(id);
        }
        Ok(Self(format!("{:0>width$}", id.0)))
    }

    /// Format a counter value with at least `width` digits
    pub fn from_number(number: u64, width: usize) -> Self {
        Self(format!("{number:0width$}"))
    }

    pub fn number(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task lifecycle state. Only `Open -> Done` is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(TaskStatus::Open),
            "done" => Ok(TaskStatus::Done),
            other => Err(Error::InvalidArgument(format!(
                "unknown status '{other}' (expected open|done)"
            ))),
        }
    }
}

/// One ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub assignee: String,
    pub created: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub task_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl TaskRecord {
    /// Check the record against the write-time schema.
    ///
    /// The ledger refuses to write anything that would later fail validation.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRecord(format!("task {id}: title cannot be empty")));
        }
        if self.title.contains('\n') {
            return Err(Error::InvalidRecord(format!(
                "task {id}: title cannot span lines"
            )));
        }
        if self.assignee.trim().is_empty() {
            return Err(Error::InvalidRecord(format!("task {id}: assignee cannot be empty")));
        }
        parse_timestamp(&self.created).map_err(|_| {
            Error::InvalidRecord(format!(
                "task {id}: created '{}' is not an RFC 3339 timestamp",
                self.created
            ))
        })?;
        if self.task_file.trim().is_empty() {
            return Err(Error::InvalidRecord(format!("task {id}: task_file cannot be empty")));
        }
        if self.labels.iter().any(|label| label.trim().is_empty()) {
            return Err(Error::InvalidRecord(format!("task {id}: labels cannot be empty")));
        }
        match (self.status, &self.done) {
            (TaskStatus::Done, None) => Err(Error::InvalidRecord(format!(
                "task {id}: done status requires a done timestamp"
            ))),
            (TaskStatus::Open, Some(_)) => Err(Error::InvalidRecord(format!(
                "task {id}: open task cannot carry a done timestamp"
            ))),
            (TaskStatus::Open, None) if self.resolution.is_some() => Err(Error::InvalidRecord(
                format!("task {id}: resolution is only set at closure"),
            )),
            _ => Ok(()),
        }
    }
}

/// Timestamp as written to the ledger and task documents
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|at| at.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> TaskRecord {
        TaskRecord {
            id: TaskId::parse("0004").unwrap(),
            title: "Add retries".to_string(),
            status: TaskStatus::Open,
            assignee: "bob".to_string(),
            created: "2024-01-01T00:00:00Z".to_string(),
            labels: vec!["perf".to_string()],
            task_file: "tasks/0004-add-retries.md".to_string(),
            done: None,
            resolution: None,
        }
    }

    #[test]
    fn id_parse_rejects_non_digits() {
        assert!(TaskId::parse("00a4").is_err());
        assert!(TaskId::parse("  ").is_err());
        assert_eq!(TaskId::parse(" 0004 ").unwrap().as_str(), "0004");
    }

    #[test]
    fn id_normalize_pads_short_input() {
        assert_eq!(TaskId::normalize("7", 4).unwrap().as_str(), "0007");
        assert_eq!(TaskId::normalize("12345", 4).unwrap().as_str(), "12345");
    }

    #[test]
    fn id_from_number_keeps_minimum_width() {
        assert_eq!(TaskId::from_number(5, 4).as_str(), "0005");
        assert_eq!(TaskId::from_number(10000, 4).as_str(), "10000");
    }

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("open".parse::<TaskStatus>().unwrap(), TaskStatus::Open);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("finished".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn timestamps_use_trailing_z() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-01T00:00:00Z");
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z").unwrap(), at);
    }

    #[test]
    fn validate_accepts_open_record() {
        record().validate().expect("valid");
    }

    #[test]
    fn validate_requires_done_timestamp_for_done_status() {
        let mut rec = record();
        rec.status = TaskStatus::Done;
        assert!(matches!(rec.validate(), Err(Error::InvalidRecord(_))));

        rec.done = Some("2024-01-02T00:00:00Z".to_string());
        rec.resolution = Some("shipped".to_string());
        rec.validate().expect("valid done record");
    }

    #[test]
    fn validate_rejects_bad_created_and_empty_title() {
        let mut rec = record();
        rec.created = "yesterday".to_string();
        assert!(matches!(rec.validate(), Err(Error::InvalidRecord(_))));

        let mut rec = record();
        rec.title = "  ".to_string();
        assert!(matches!(rec.validate(), Err(Error::InvalidRecord(_))));
    }
}
