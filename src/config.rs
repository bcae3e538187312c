//! Configuration loading and management
//!
//! Handles parsing of the optional `.plan.toml` file at the repository root.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file at the repository root
pub const CONFIG_FILE: &str = ".plan.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Plan directory, relative to the repository root
    #[serde(default = "default_plan_dir")]
    pub plan_dir: String,

    /// Task id allocation
    #[serde(default)]
    pub ids: IdsConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Plan lock
    #[serde(default)]
    pub lock: LockConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_dir: default_plan_dir(),
            ids: IdsConfig::default(),
            tasks: TasksConfig::default(),
            lock: LockConfig::default(),
        }
    }
}

fn default_plan_dir() -> String {
    "plan".to_string()
}

/// What the allocator does once ids no longer fit in `width` digits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse to issue the id
    Error,
    /// Issue wider ids; `width` stays the minimum padding
    Widen,
}

/// Task id configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdsConfig {
    /// Zero-padded id width
    #[serde(default = "default_id_width")]
    pub width: usize,

    /// Behaviour once the width is exhausted
    #[serde(default = "default_overflow")]
    pub overflow: OverflowPolicy,
}

fn default_id_width() -> usize {
    4
}

fn default_overflow() -> OverflowPolicy {
    OverflowPolicy::Error
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            width: default_id_width(),
            overflow: default_overflow(),
        }
    }
}

/// Task defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Assignee used when none is given
    #[serde(default = "default_assignee")]
    pub default_assignee: String,
}

fn default_assignee() -> String {
    "unassigned".to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_assignee: default_assignee(),
        }
    }
}

/// Lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a mutating command waits for the plan lock
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `.plan.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from repo root, or return defaults when absent.
    ///
    /// A present but invalid file is an error rather than a silent fallback.
    pub fn load_from_repo(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        let plan_dir = self.plan_dir.trim();
        if plan_dir.is_empty() {
            return Err(Error::InvalidConfig("plan_dir cannot be empty".to_string()));
        }
        if Path::new(plan_dir).is_absolute() {
            return Err(Error::InvalidConfig(
                "plan_dir must be relative to the repository root".to_string(),
            ));
        }
        if self.ids.width == 0 {
            return Err(Error::InvalidConfig("ids.width must be >= 1".to_string()));
        }
        if self.ids.width > 12 {
            return Err(Error::InvalidConfig("ids.width must be <= 12".to_string()));
        }
        if self.tasks.default_assignee.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.default_assignee cannot be empty".to_string(),
            ));
        }
        if self.lock.timeout_ms == 0 {
            return Err(Error::InvalidConfig("lock.timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}
