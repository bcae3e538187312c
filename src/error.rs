//! Error types for plan
//!
//! Exit codes:
//! - 0: Success
//! - 1: Check failed (validation issues, hook rejected)
//! - 2: User error (bad args, missing ledger, unknown task)
//! - 3: Inconsistent state (malformed record, duplicate id, already closed)
//! - 4: Operation failed (I/O, lock, serialization)

use std::path::PathBuf;

use serde_json::json;
use thiserror::Error;

/// Exit codes for the plan CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CHECK_FAILED: i32 = 1;
    pub const USER_ERROR: i32 = 2;
    pub const INCONSISTENT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for plan operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Ledger not found: {0}")]
    LedgerNotFound(PathBuf),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task file for {id} not found: {path}")]
    TaskFileMissing { id: String, path: PathBuf },

    #[error("Project configuration not found: {0}")]
    ProjectConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Inconsistent state (exit code 3)
    #[error("Invalid ledger record: {0}")]
    InvalidRecord(String),

    #[error("Duplicate task id in ledger: {0}")]
    DuplicateId(String),

    #[error("Task {0} is already closed")]
    TaskAlreadyClosed(String),

    #[error("Task file already exists: {0}")]
    TaskFileExists(PathBuf),

    #[error("Invalid state in {path}: {message}")]
    InvalidState { path: PathBuf, message: String },

    #[error("Task id space exhausted: {next} does not fit in {width} digits")]
    IdSpaceExhausted { next: u64, width: usize },

    // Check failures (exit code 1)
    #[error("Validation failed: {issues} issue(s)")]
    ValidationFailed { issues: usize },

    #[error("Hook rejected: {0}")]
    HookRejected(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ValidationFailed { .. } | Error::HookRejected(_) => exit_codes::CHECK_FAILED,

            Error::LedgerNotFound(_)
            | Error::TaskNotFound(_)
            | Error::TaskFileMissing { .. }
            | Error::ProjectConfigNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::InvalidRecord(_)
            | Error::DuplicateId(_)
            | Error::TaskAlreadyClosed(_)
            | Error::TaskFileExists(_)
            | Error::InvalidState { .. }
            | Error::IdSpaceExhausted { .. } => exit_codes::INCONSISTENT,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for the JSON error envelope
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::LedgerNotFound(path)
            | Error::ProjectConfigNotFound(path)
            | Error::TaskFileExists(path)
            | Error::LockFailed(path) => Some(json!({ "path": path })),
            Error::TaskNotFound(id)
            | Error::DuplicateId(id)
            | Error::TaskAlreadyClosed(id) => Some(json!({ "id": id })),
            Error::TaskFileMissing { id, path } => Some(json!({ "id": id, "path": path })),
            Error::InvalidState { path, message } => {
                Some(json!({ "path": path, "message": message }))
            }
            Error::IdSpaceExhausted { next, width } => {
                Some(json!({ "next": next, "width": width }))
            }
            Error::ValidationFailed { issues } => Some(json!({ "issues": issues })),
            Error::InvalidConfig(message)
            | Error::InvalidArgument(message)
            | Error::InvalidRecord(message)
            | Error::HookRejected(message) => Some(json!({ "message": message })),
            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) => None,
        }
    }
}

/// Result type alias for plan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
