mod support;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use assert_cmd::cargo::cargo_bin;
use plan::ledger::{LedgerDocument, ParsedBlock};

use support::TestPlan;

const CREATORS: usize = 8;

fn plan_bin() -> PathBuf {
    cargo_bin("plan")
}

fn spawn_plan(repo: &Path, args: &[String]) -> std::io::Result<Child> {
    let mut cmd = Command::new(plan_bin());
    cmd.current_dir(repo);
    for var in ["PLAN_REPO", "PLAN_TASK_ID", "PLAN_REPO_ROOT", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd.args(args);
    cmd.spawn()
}

#[test]
fn concurrent_creates_issue_distinct_ids() -> Result<(), Box<dyn std::error::Error>> {
    let plan = TestPlan::new();

    let children = (0..CREATORS)
        .map(|n| {
            let args = vec!["create".to_string(), format!("Task {n}")];
            spawn_plan(plan.path(), &args)
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    for mut child in children {
        let status = child.wait()?;
        assert!(status.success(), "plan create failed: {status}");
    }

    let document = LedgerDocument::parse(&plan.ledger());
    let mut ids = HashSet::new();
    for block in document.parse_all() {
        match block {
            ParsedBlock::Valid(record) => {
                let id = record.id.as_str().to_string();
                assert!(ids.insert(id.clone()), "duplicate id {id}");
                assert!(plan.exists(&format!("plan/{}", record.task_file)));
            }
            ParsedBlock::Invalid(invalid) => panic!("invalid block: {}", invalid.reason),
        }
    }
    assert_eq!(ids.len(), CREATORS);
    assert_eq!(plan.read_file("plan/next_id.txt")?, format!("{:04}\n", CREATORS + 1));

    plan.cmd().arg("validate").assert().success();
    Ok(())
}
