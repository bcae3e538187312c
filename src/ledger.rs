//! The task ledger (`plan/todo.toml`).
//!
//! The ledger is a sequence of `[[task]]` blocks, one per task. It is edited
//! as text rather than round-tripped through a TOML serializer, so comments,
//! a leading `[meta]` table and hand formatting survive every rewrite.
//!
//! Reading is permissive: blocks are delimited only by the `[[task]]` marker,
//! fields may appear in any order, and a block missing a required field is
//! reported as [`ParsedBlock::Invalid`] instead of failing the whole read.
//! Writing is strict: [`LedgerDocument::append`] emits a fixed field order and
//! refuses records that fail [`TaskRecord::validate`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::lock;
use crate::task::{TaskId, TaskRecord, TaskStatus};

/// Line that opens every record block
pub const BLOCK_MARKER: &str = "[[task]]";

/// Fields a block must carry to be usable at all
pub const REQUIRED_FIELDS: [&str; 3] = ["id", "task_file", "status"];

const EXCERPT_LEN: usize = 80;

fn field_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(.*?)\s*$").expect("valid field regex")
    })
}

fn is_marker(line: &str) -> bool {
    line.trim() == BLOCK_MARKER
}

/// Decode the right-hand side of a `key = value` line as a TOML value
fn decode_value(raw: &str) -> Option<toml::Value> {
    let table: toml::Table = toml::from_str(&format!("v = {raw}")).ok()?;
    table.get("v").cloned()
}

/// Split a line into field name and decoded value
fn parse_field_line(line: &str) -> Option<(String, Option<toml::Value>)> {
    let caps = field_line_regex().captures(line)?;
    let key = caps.get(1)?.as_str().to_string();
    let value = caps.get(2).and_then(|raw| decode_value(raw.as_str()));
    Some((key, value))
}

/// Render one `key = value` line using TOML value syntax
pub fn field_line(key: &str, value: impl Into<toml::Value>) -> String {
    format!("{key} = {}", value.into())
}

/// Handle on the ledger file
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document; a missing ledger is [`Error::LedgerNotFound`]
    pub fn load(&self) -> Result<LedgerDocument> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(LedgerDocument::parse(&content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(Error::LedgerNotFound(self.path.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load the document, treating a missing ledger as empty
    pub fn load_or_empty(&self) -> Result<LedgerDocument> {
        match self.load() {
            Err(Error::LedgerNotFound(_)) => Ok(LedgerDocument::default()),
            other => other,
        }
    }

    /// Replace the ledger atomically
    pub fn save(&self, document: &LedgerDocument) -> Result<()> {
        lock::write_atomic_str(&self.path, &document.render())
    }
}

/// A located block: line range `[start, end)` in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerBlock {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Result of parsing one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBlock {
    Valid(TaskRecord),
    Invalid(InvalidBlock),
}

/// A block that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidBlock {
    /// 1-based line of the block marker
    pub line: usize,
    /// Id, when one could be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
    pub excerpt: String,
}

/// In-memory ledger text, edited line by line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDocument {
    lines: Vec<String>,
}

impl LedgerDocument {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Line ranges of every block, in document order
    fn block_ranges(&self) -> Vec<(usize, usize)> {
        let starts: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| is_marker(line))
            .map(|(idx, _)| idx)
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(self.lines.len());
                (start, end)
            })
            .collect()
    }

    fn block_id(&self, start: usize, end: usize) -> Option<String> {
        self.lines[start + 1..end].iter().find_map(|line| {
            match parse_field_line(line) {
                Some((key, Some(toml::Value::String(value)))) if key == "id" => Some(value),
                _ => None,
            }
        })
    }

    /// Locate the first block whose `id` field equals `id`
    pub fn find_block(&self, id: &TaskId) -> Option<LedgerBlock> {
        self.block_ranges().into_iter().find_map(|(start, end)| {
            if self.block_id(start, end).as_deref() == Some(id.as_str()) {
                Some(LedgerBlock {
                    start,
                    end,
                    text: self.lines[start..end].join("\n"),
                })
            } else {
                None
            }
        })
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.find_block(id).is_some()
    }

    /// Parse every block, keeping invalid ones as [`ParsedBlock::Invalid`]
    pub fn parse_all(&self) -> Vec<ParsedBlock> {
        self.parse_located()
            .into_iter()
            .map(|(_, block)| block)
            .collect()
    }

    /// Like [`parse_all`](Self::parse_all), paired with the 1-based line of
    /// each block marker
    pub fn parse_located(&self) -> Vec<(usize, ParsedBlock)> {
        self.block_ranges()
            .into_iter()
            .map(|(start, end)| (start + 1, parse_block(start, &self.lines[start..end])))
            .collect()
    }

    /// Parse the block for `id`
    pub fn record(&self, id: &TaskId) -> Result<TaskRecord> {
        let block = self
            .find_block(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        match parse_block(block.start, &self.lines[block.start..block.end]) {
            ParsedBlock::Valid(record) => Ok(record),
            ParsedBlock::Invalid(invalid) => Err(Error::InvalidRecord(format!(
                "task {id} (line {}): {}",
                invalid.line, invalid.reason
            ))),
        }
    }

    /// Highest numeric id present, ignoring malformed blocks
    pub fn max_id(&self) -> Option<u64> {
        self.block_ranges()
            .into_iter()
            .filter_map(|(start, end)| self.block_id(start, end))
            .filter_map(|id| TaskId::parse(&id).ok()?.number())
            .max()
    }

    /// Append a record as the last block, in fixed field order
    pub fn append(&mut self, record: &TaskRecord) -> Result<()> {
        record.validate()?;

        if self.lines.last().is_some_and(|line| !line.trim().is_empty()) {
            self.lines.push(String::new());
        }
        self.lines.extend(render_record(record));
        Ok(())
    }

    /// Rewrite the block's `status` line and insert `extra_fields` right
    /// after its `task_file` line. Only the first matching block is edited.
    pub fn update_status(
        &mut self,
        id: &TaskId,
        status: TaskStatus,
        extra_fields: &[(&str, toml::Value)],
    ) -> Result<()> {
        let block = self
            .find_block(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        let status_idx = self
            .field_index(&block, "status")
            .ok_or_else(|| Error::InvalidRecord(format!("task {id}: block has no status line")))?;
        self.lines[status_idx] = field_line("status", status.as_str());

        let insert_at = match self.field_index(&block, "task_file") {
            Some(idx) => idx + 1,
            None => self.content_end(&block),
        };
        let extra: Vec<String> = extra_fields
            .iter()
            .map(|(key, value)| field_line(key, value.clone()))
            .collect();
        self.lines.splice(insert_at..insert_at, extra);
        Ok(())
    }

    /// Rewrite an existing field line of the block for `id`
    pub fn set_field(&mut self, id: &TaskId, key: &str, value: impl Into<toml::Value>) -> Result<()> {
        let block = self
            .find_block(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        let idx = self
            .field_index(&block, key)
            .ok_or_else(|| Error::InvalidRecord(format!("task {id}: block has no {key} line")))?;
        self.lines[idx] = field_line(key, value);
        Ok(())
    }

    fn field_index(&self, block: &LedgerBlock, key: &str) -> Option<usize> {
        (block.start + 1..block.end).find(|&idx| {
            parse_field_line(&self.lines[idx]).is_some_and(|(name, _)| name == key)
        })
    }

    /// Index just past the last non-blank line of the block
    fn content_end(&self, block: &LedgerBlock) -> usize {
        (block.start + 1..block.end)
            .rev()
            .find(|&idx| !self.lines[idx].trim().is_empty())
            .map(|idx| idx + 1)
            .unwrap_or(block.start + 1)
    }
}

fn render_record(record: &TaskRecord) -> Vec<String> {
    let mut lines = vec![
        BLOCK_MARKER.to_string(),
        field_line("id", record.id.as_str()),
        field_line("title", record.title.as_str()),
        field_line("status", record.status.as_str()),
        field_line("assignee", record.assignee.as_str()),
        field_line("created", record.created.as_str()),
    ];
    if !record.labels.is_empty() {
        lines.push(field_line("labels", record.labels.clone()));
    }
    lines.push(field_line("task_file", record.task_file.as_str()));
    if let Some(done) = &record.done {
        lines.push(field_line("done", done.as_str()));
    }
    if let Some(resolution) = &record.resolution {
        lines.push(field_line("resolution", resolution.as_str()));
    }
    lines
}

fn excerpt(lines: &[String]) -> String {
    let joined = lines.join(" ");
    let compact = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    compact.chars().take(EXCERPT_LEN).collect()
}

fn parse_block(start: usize, lines: &[String]) -> ParsedBlock {
    // First occurrence of a field wins, like the lookup used for edits.
    let mut fields: HashMap<String, Option<toml::Value>> = HashMap::new();
    for line in lines.iter().skip(1) {
        if let Some((key, value)) = parse_field_line(line) {
            fields.entry(key).or_insert(value);
        }
    }

    let string_field = |key: &str| -> Option<String> {
        match fields.get(key) {
            Some(Some(toml::Value::String(value))) => Some(value.clone()),
            _ => None,
        }
    };

    let invalid = |id: Option<String>, reason: String| {
        ParsedBlock::Invalid(InvalidBlock {
            line: start + 1,
            id,
            reason,
            excerpt: excerpt(lines),
        })
    };

    let raw_id = string_field("id");
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|key| string_field(*key).is_none())
        .collect();
    if !missing.is_empty() {
        return invalid(raw_id, format!("missing {}", missing.join(", ")));
    }

    let (Some(raw_id), Some(task_file), Some(raw_status)) = (
        raw_id,
        string_field("task_file"),
        string_field("status"),
    ) else {
        return invalid(None, "missing required fields".to_string());
    };

    let id = match TaskId::parse(&raw_id) {
        Ok(id) => id,
        Err(_) => return invalid(Some(raw_id.clone()), format!("malformed id '{raw_id}'")),
    };
    let status = match raw_status.parse::<TaskStatus>() {
        Ok(status) => status,
        Err(_) => {
            return invalid(Some(raw_id), format!("unknown status '{raw_status}'"));
        }
    };

    let labels = match fields.get("labels") {
        Some(Some(toml::Value::Array(items))) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    ParsedBlock::Valid(TaskRecord {
        id,
        title: string_field("title").unwrap_or_default(),
        status,
        assignee: string_field("assignee").unwrap_or_default(),
        created: string_field("created").unwrap_or_default(),
        labels,
        task_file,
        done: string_field("done"),
        resolution: string_field("resolution"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, title: &str) -> TaskRecord {
        TaskRecord {
            id: TaskId::parse(id).unwrap(),
            title: title.to_string(),
            status: TaskStatus::Open,
            assignee: "bob".to_string(),
            created: "2024-01-01T00:00:00Z".to_string(),
            labels: vec!["perf".to_string()],
            task_file: format!("tasks/{id}-task.md"),
            done: None,
            resolution: None,
        }
    }

    fn valid(blocks: Vec<ParsedBlock>) -> Vec<TaskRecord> {
        blocks
            .into_iter()
            .filter_map(|block| match block {
                ParsedBlock::Valid(record) => Some(record),
                ParsedBlock::Invalid(_) => None,
            })
            .collect()
    }

    #[test]
    fn append_emits_fixed_field_order() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0004", "Add retries")).unwrap();

        assert_eq!(
            doc.render(),
            "[[task]]\n\
             id = \"0004\"\n\
             title = \"Add retries\"\n\
             status = \"open\"\n\
             assignee = \"bob\"\n\
             created = \"2024-01-01T00:00:00Z\"\n\
             labels = [\"perf\"]\n\
             task_file = \"tasks/0004-task.md\"\n"
        );
    }

    #[test]
    fn append_separates_blocks_and_keeps_preamble() {
        let mut doc = LedgerDocument::parse("# plan ledger\n[meta]\nname = \"demo\"\n");
        doc.append(&record("0001", "One")).unwrap();
        doc.append(&record("0002", "Two")).unwrap();

        let text = doc.render();
        assert!(text.starts_with("# plan ledger\n[meta]\nname = \"demo\"\n\n[[task]]\n"));
        assert!(text.contains("task_file = \"tasks/0001-task.md\"\n\n[[task]]\nid = \"0002\""));
    }

    #[test]
    fn append_rejects_invalid_record() {
        let mut doc = LedgerDocument::default();
        let mut rec = record("0001", "One");
        rec.title = String::new();

        assert!(matches!(doc.append(&rec), Err(Error::InvalidRecord(_))));
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn append_then_parse_preserves_key_fields() {
        let mut doc = LedgerDocument::default();
        let mut rec = record("0042", "Quote \"this\" and \\ that");
        rec.labels = vec!["a b".to_string(), "c".to_string()];
        doc.append(&rec).unwrap();

        let reparsed = LedgerDocument::parse(&doc.render());
        let records = valid(reparsed.parse_all());
        assert_eq!(records, vec![rec]);
    }

    #[test]
    fn find_block_returns_text_until_next_marker() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0001", "One")).unwrap();
        doc.append(&record("0002", "Two")).unwrap();

        let block = doc.find_block(&TaskId::parse("0001").unwrap()).unwrap();
        assert!(block.text.starts_with("[[task]]\nid = \"0001\""));
        assert!(!block.text.contains("0002"));

        assert!(doc.find_block(&TaskId::parse("0003").unwrap()).is_none());
    }

    #[test]
    fn parse_all_tolerates_field_reordering_and_spacing() {
        let doc = LedgerDocument::parse(
            "[[task]]\n\
             task_file=\"tasks/0007-x.md\"\n\
             status   =   \"done\"\n\
             # comment\n\
             id = \"0007\"\n\
             done = \"2024-02-01T00:00:00Z\"\n",
        );

        let records = valid(doc.parse_all());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "0007");
        assert_eq!(records[0].status, TaskStatus::Done);
        assert_eq!(records[0].task_file, "tasks/0007-x.md");
        assert_eq!(records[0].title, "");
    }

    #[test]
    fn parse_all_reports_missing_fields_without_failing() {
        let doc = LedgerDocument::parse(
            "[[task]]\n\
             id = \"0001\"\n\
             status = \"open\"\n\
             \n\
             [[task]]\n\
             id = \"0002\"\n\
             status = \"open\"\n\
             task_file = \"tasks/0002-b.md\"\n\
             \n\
             [[task]]\n\
             id = \"0003\"\n\
             status = \"finished\"\n\
             task_file = \"tasks/0003-c.md\"\n",
        );

        let blocks = doc.parse_all();
        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            ParsedBlock::Invalid(invalid) => {
                assert_eq!(invalid.line, 1);
                assert_eq!(invalid.id.as_deref(), Some("0001"));
                assert_eq!(invalid.reason, "missing task_file");
            }
            other => panic!("expected invalid block, got {other:?}"),
        }
        assert!(matches!(blocks[1], ParsedBlock::Valid(_)));
        match &blocks[2] {
            ParsedBlock::Invalid(invalid) => assert!(invalid.reason.contains("finished")),
            other => panic!("expected invalid block, got {other:?}"),
        }
    }

    #[test]
    fn update_status_rewrites_and_inserts_after_task_file() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0004", "Add retries")).unwrap();
        doc.append(&record("0005", "Other")).unwrap();
        let id = TaskId::parse("0004").unwrap();

        doc.update_status(
            &id,
            TaskStatus::Done,
            &[
                ("done", toml::Value::from("2024-01-02T00:00:00Z")),
                ("resolution", toml::Value::from("shipped")),
            ],
        )
        .unwrap();

        let block = doc.find_block(&id).unwrap();
        assert_eq!(
            block.text,
            "[[task]]\n\
             id = \"0004\"\n\
             title = \"Add retries\"\n\
             status = \"done\"\n\
             assignee = \"bob\"\n\
             created = \"2024-01-01T00:00:00Z\"\n\
             labels = [\"perf\"]\n\
             task_file = \"tasks/0004-task.md\"\n\
             done = \"2024-01-02T00:00:00Z\"\n\
             resolution = \"shipped\"\n"
        );

        let other = doc.record(&TaskId::parse("0005").unwrap()).unwrap();
        assert_eq!(other.status, TaskStatus::Open);
    }

    #[test]
    fn update_status_edits_only_first_duplicate() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0001", "One")).unwrap();
        doc.append(&record("0001", "Again")).unwrap();
        let id = TaskId::parse("0001").unwrap();

        doc.update_status(&id, TaskStatus::Done, &[("done", toml::Value::from("2024-01-02T00:00:00Z"))])
            .unwrap();

        let statuses: Vec<TaskStatus> = valid(doc.parse_all()).iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![TaskStatus::Done, TaskStatus::Open]);
    }

    #[test]
    fn update_status_unknown_id_is_not_found() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0001", "One")).unwrap();

        let err = doc
            .update_status(&TaskId::parse("0009").unwrap(), TaskStatus::Done, &[])
            .expect_err("missing");
        assert!(matches!(err, Error::TaskNotFound(id) if id == "0009"));
    }

    #[test]
    fn set_field_rewrites_existing_line() {
        let mut doc = LedgerDocument::default();
        doc.append(&record("0001", "One")).unwrap();
        let id = TaskId::parse("0001").unwrap();

        doc.set_field(&id, "task_file", "archive/0001-task.md").unwrap();
        assert_eq!(doc.record(&id).unwrap().task_file, "archive/0001-task.md");
        assert!(matches!(
            doc.set_field(&id, "resolution", "x"),
            Err(Error::InvalidRecord(_))
        ));
    }

    #[test]
    fn max_id_ignores_malformed_blocks() {
        let doc = LedgerDocument::parse(
            "[[task]]\nid = \"0003\"\n\n[[task]]\nid = \"zz\"\n\n[[task]]\nid = \"0011\"\n",
        );
        assert_eq!(doc.max_id(), Some(11));
        assert_eq!(LedgerDocument::default().max_id(), None);
    }

    #[test]
    fn ledger_load_distinguishes_missing_file() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::new(dir.path().join("todo.toml"));

        assert!(matches!(ledger.load(), Err(Error::LedgerNotFound(_))));
        assert_eq!(ledger.load_or_empty().unwrap(), LedgerDocument::default());

        let mut doc = LedgerDocument::default();
        doc.append(&record("0001", "One")).unwrap();
        ledger.save(&doc).unwrap();
        assert_eq!(ledger.load().unwrap(), doc);
    }
}
