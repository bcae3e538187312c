mod support;

use predicates::str::contains;

use support::{parse_json, TestPlan};

#[test]
fn validate_reports_done_task_outside_archive() -> Result<(), Box<dyn std::error::Error>> {
    let plan = TestPlan::new();
    plan.write_file(
        "plan/todo.toml",
        "[[task]]\n\
         id = \"0007\"\n\
         title = \"Fix thing\"\n\
         status = \"done\"\n\
         task_file = \"tasks/0007-fix-thing.md\"\n\
         done = \"2024-01-02T00:00:00Z\"\n",
    )?;
    plan.write_file("plan/tasks/0007-fix-thing.md", "---\nid: \"0007\"\n---\n")?;

    plan.cmd()
        .arg("validate")
        .assert()
        .failure()
        .code(1)
        .stdout(contains("plan validate: 1 issue(s)"))
        .stdout(contains("[placement] line 1 (0007): done task is not archived"))
        .stderr(contains("Validation failed: 1 issue(s)"));
    Ok(())
}

#[test]
fn validate_json_lists_every_issue() -> Result<(), Box<dyn std::error::Error>> {
    let plan = TestPlan::new();
    plan.write_file(
        "plan/todo.toml",
        "# hand-maintained\n\
         [[task]]\n\
         id = \"0001\"\n\
         status = \"open\"\n\
         \n\
         [[task]]\n\
         id = \"0002\"\n\
         status = \"open\"\n\
         task_file = \"tasks/0002-missing.md\"\n",
    )?;

    let output = plan
        .cmd()
        .args(["validate", "--json"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let json = parse_json(&output);
    assert_eq!(json["command"], "validate");
    assert_eq!(json["status"], "failed");

    let issues = json["data"]["issues"].as_array().expect("issues");
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0]["kind"], "structural");
    assert_eq!(issues[0]["line"], 2);
    assert_eq!(issues[1]["kind"], "referential");
    assert_eq!(issues[1]["id"], "0002");
    Ok(())
}

#[test]
fn validate_without_ledger_is_user_error() {
    let plan = TestPlan::new();

    plan.cmd()
        .arg("validate")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("Ledger not found"));
}

#[test]
fn validate_accepts_freshly_created_tasks() {
    let plan = TestPlan::new();
    plan.cmd().args(["create", "One"]).assert().success();
    plan.cmd().args(["create", "Two"]).assert().success();

    plan.cmd()
        .args(["validate", "--json"])
        .assert()
        .success()
        .stdout(contains("\"status\": \"success\""))
        .stdout(contains("\"records\": 2"));
}
