use std::path::PathBuf;

use plan::error::{exit_codes, Error, JsonError};
use serde_json::Value;

#[test]
fn exit_code_user_error() {
    let err = Error::InvalidArgument("bad input".to_string());
    assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(
        Error::LedgerNotFound(PathBuf::from("plan/todo.toml")).exit_code(),
        exit_codes::USER_ERROR
    );
    assert_eq!(
        Error::TaskNotFound("0004".to_string()).exit_code(),
        exit_codes::USER_ERROR
    );
}

#[test]
fn exit_code_inconsistent() {
    assert_eq!(
        Error::TaskAlreadyClosed("0004".to_string()).exit_code(),
        exit_codes::INCONSISTENT
    );
    assert_eq!(
        Error::IdSpaceExhausted { next: 10000, width: 4 }.exit_code(),
        exit_codes::INCONSISTENT
    );
}

#[test]
fn exit_code_check_failed() {
    assert_eq!(
        Error::ValidationFailed { issues: 2 }.exit_code(),
        exit_codes::CHECK_FAILED
    );
    assert_eq!(
        Error::HookRejected("no report".to_string()).exit_code(),
        exit_codes::CHECK_FAILED
    );
}

#[test]
fn exit_code_operation_failed() {
    let err = Error::LockFailed(PathBuf::from("plan/.plan.lock"));
    assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn details_include_task_file_fields() {
    let err = Error::TaskFileMissing {
        id: "0004".to_string(),
        path: PathBuf::from("plan/tasks/0004-add-retries.md"),
    };
    let details = err.details().expect("details");
    assert_eq!(details["id"], Value::String("0004".to_string()));
    assert_eq!(
        details["path"],
        Value::String("plan/tasks/0004-add-retries.md".to_string())
    );
}

#[test]
fn json_error_includes_details() {
    let err = Error::InvalidConfig("bad config".to_string());
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    let details = json.details.expect("details");
    assert_eq!(details["message"], Value::String("bad config".to_string()));
}
