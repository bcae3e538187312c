//! CI outputs derived from `project.toml`.
//!
//! Reads the project manifest at the repository root and flattens it into the
//! `key=value` lines GitHub Actions expects in `$GITHUB_OUTPUT`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

pub const PROJECT_FILE: &str = "project.toml";

/// A parsed `project.toml`.
///
/// Values are looked up per key; a missing or wrongly typed value falls back
/// to its default instead of failing the whole manifest.
#[derive(Debug, Clone, Default)]
pub struct ProjectManifest {
    root: toml::Table,
}

impl ProjectManifest {
    /// Load `<repo_root>/project.toml`
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(PROJECT_FILE);
        if !path.is_file() {
            return Err(Error::ProjectConfigNotFound(path));
        }
        let content = fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(Self {
            root: toml::from_str(content)?,
        })
    }

    fn value(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.root
            .get(section)
            .and_then(toml::Value::as_table)
            .and_then(|table| table.get(key))
    }

    fn flag(&self, section: &str, key: &str, default: bool) -> bool {
        match self.value(section, key) {
            Some(value) => value.as_bool().unwrap_or_else(|| {
                tracing::debug!(section, key, "ignoring non-boolean project value");
                default
            }),
            None => default,
        }
    }

    fn text(&self, section: &str, key: &str, default: &str) -> String {
        self.value(section, key)
            .and_then(toml::Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// String entries of an array; other entries are skipped
    fn list(&self, section: &str, key: &str) -> Vec<String> {
        self.value(section, key)
            .and_then(toml::Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(toml::Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Flattened CI outputs, serialized in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectOutputs {
    pub project_type: String,
    pub run_build: bool,
    pub run_tests: bool,
    pub run_security: bool,
    pub run_docs: bool,
    pub quick_gate_precommit: bool,
    pub outputs_list: String,
    pub outputs_contains_docker: bool,
    pub docker_enabled: bool,
    pub docker_image: String,
    pub project_name: String,
    pub project_version: String,
}

impl From<&ProjectManifest> for ProjectOutputs {
    fn from(manifest: &ProjectManifest) -> Self {
        let outputs = manifest.list("artifact", "outputs");
        Self {
            project_type: manifest.text("project", "type", "library"),
            run_build: manifest.flag("ci", "run_build", true),
            run_tests: manifest.flag("ci", "run_tests", true),
            run_security: manifest.flag("ci", "run_security", true),
            run_docs: manifest.flag("ci", "run_docs", true),
            quick_gate_precommit: manifest
                .list("ci", "quick_gate")
                .iter()
                .any(|gate| gate == "pre-commit"),
            outputs_list: outputs.join(","),
            outputs_contains_docker: outputs.iter().any(|output| output == "docker"),
            docker_enabled: manifest.flag("docker", "enabled", false),
            docker_image: manifest.text("docker", "image", ""),
            project_name: manifest.text("project", "name", ""),
            project_version: manifest.text("project", "version", ""),
        }
    }
}

impl ProjectOutputs {
    pub fn load(repo_root: &Path) -> Result<Self> {
        Ok(Self::from(&ProjectManifest::load(repo_root)?))
    }

    /// Ordered `(key, value)` pairs; booleans are literal `true`/`false`
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("project_type", self.project_type.clone()),
            ("run_build", self.run_build.to_string()),
            ("run_tests", self.run_tests.to_string()),
            ("run_security", self.run_security.to_string()),
            ("run_docs", self.run_docs.to_string()),
            ("quick_gate_precommit", self.quick_gate_precommit.to_string()),
            ("outputs_list", self.outputs_list.clone()),
            ("outputs_contains_docker", self.outputs_contains_docker.to_string()),
            ("docker_enabled", self.docker_enabled.to_string()),
            ("docker_image", self.docker_image.clone()),
            ("project_name", self.project_name.clone()),
            ("project_version", self.project_version.clone()),
        ]
    }

    /// `key=value` lines, each terminated by a newline
    pub fn render(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }

    /// Append the rendered lines to a GitHub Actions output file
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.render().as_bytes())?;
        tracing::debug!(path = %path.display(), "appended project outputs");
        Ok(())
    }
}
