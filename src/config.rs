//! Configuration management for woodlog

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatcher::AssertAction;
use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::registry::SinkEnvironment;
use crate::sink::ConsoleStream;
use crate::storage::{default_catalog, DEFAULT_MAX_AGE_HOURS};

/// One sink to build and plant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Registry key of the sink constructor (e.g. "console")
    pub kind: String,

    /// Admission policy
    #[serde(flatten)]
    pub policy: Policy,

    /// Console stream (console sinks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<ConsoleStream>,

    /// Line source command line, `{pid}` is substituted (capture sinks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// Method scope for captured lines (capture sinks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Process whose lines are captured, defaults to this one (capture sinks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Records kept (memory sinks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl SinkConfig {
    pub fn new(kind: impl Into<String>, policy: Policy) -> Self {
        Self {
            kind: kind.into(),
            policy,
            ..Self::default()
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for log catalogs; `~` is expanded
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Files older than this many hours are swept when a directory is reused (default: 8)
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// What an accepted ASSERT does: "abort" (default) or "panic"
    #[serde(default)]
    pub assert_action: AssertAction,

    /// Sinks to plant, in order
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

fn default_base_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("woodlog"))
        .unwrap_or_else(|| config_dir().join("logs"))
}

fn default_retention_hours() -> u64 {
    DEFAULT_MAX_AGE_HOURS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            retention_hours: default_retention_hours(),
            assert_action: AssertAction::default(),
            sinks: vec![SinkConfig::new("console", Policy::new())],
        }
    }
}

impl Config {
    /// Load configuration from `path`, or return the default if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.base_dir = expand_path(&config.base_dir);
        Ok(config)
    }

    /// Save configuration to `path`, creating its parent directory
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Shared settings handed to sink constructors
    pub fn sink_environment(&self) -> SinkEnvironment {
        SinkEnvironment {
            base_dir: expand_path(&self.base_dir),
            retention_hours: self.retention_hours,
            default_catalog: default_catalog(),
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Get the base configuration directory (~/.woodlog)
/// Falls back to ./.woodlog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".woodlog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".woodlog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
