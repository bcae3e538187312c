//! Shared output formatting for plan CLI commands.

use serde::Serialize;

use crate::error::{exit_codes, Result};

pub const SCHEMA_VERSION: &str = "plan.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    emit_with_status(options, command, "success", data, human)
}

/// Emit a result whose envelope status is not plain success, such as a
/// validation report that found issues
pub fn emit_with_status<T: Serialize>(
    options: OutputOptions,
    command: &str,
    status: &'static str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status,
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &crate::error::Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    let hint = next_steps.first().map(|step| step.as_str());
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// Command name for the error envelope, e.g. `close` or `project outputs`.
///
/// `--repo` and `--status` take a value, which is skipped as well.
pub fn infer_command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg.starts_with('-') {
            skip_value = !arg.contains('=') && VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        words.push(arg);
        if words.len() == 2 {
            break;
        }
    }

    let mut words = words.into_iter();
    let Some(command) = words.next() else {
        return "plan".to_string();
    };

    if matches!(command.as_str(), "project" | "hook") {
        if let Some(sub) = words.next() {
            return format!("{command} {sub}");
        }
    }
    command
}

const VALUE_FLAGS: [&str; 8] = [
    "--repo",
    "--status",
    "--assignee",
    "--labels",
    "--resolution",
    "--message",
    "-m",
    "--author",
];

fn error_kind(err: &crate::error::Error) -> &'static str {
    match err.exit_code() {
        exit_codes::CHECK_FAILED => "check_failed",
        exit_codes::USER_ERROR => "user_error",
        exit_codes::INCONSISTENT => "inconsistent",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &crate::error::Error) -> Vec<String> {
    use crate::error::Error;

    match err {
        Error::LedgerNotFound(_) => vec!["plan create \"<title>\"".to_string()],
        Error::TaskNotFound(_) => vec!["plan list".to_string()],
        Error::TaskFileMissing { .. } | Error::InvalidRecord(_) | Error::DuplicateId(_) => {
            vec!["plan validate".to_string()]
        }
        Error::TaskAlreadyClosed(id) => vec![format!("plan show {id}")],
        Error::InvalidState { path, .. } => {
            vec![format!("fix or remove {} then retry", path.display())]
        }
        Error::IdSpaceExhausted { .. } => {
            vec!["set overflow = \"widen\" under [ids] in .plan.toml".to_string()]
        }
        Error::InvalidConfig(_) => vec!["fix .plan.toml then retry".to_string()],
        Error::LockFailed(_) => vec!["retry once the other plan command finishes".to_string()],
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}
