//! Sink registry
//!
//! Maps the `kind` key of a `SinkConfig` to the function that builds the sink.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::CaptureConfig;
use crate::config::SinkConfig;
use crate::error::{Error, Result};
use crate::sink::{CaptureSink, ConsoleSink, FileSink, MemorySink, Sink, DEFAULT_CAPACITY};
use crate::storage::catalog_dir;

/// Settings shared by every sink built from one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEnvironment {
    /// Root directory for log catalogs
    pub base_dir: PathBuf,
    /// Retention window for reused directories
    pub retention_hours: u64,
    /// Catalog used when a policy does not name one
    pub default_catalog: String,
}

impl SinkEnvironment {
    /// Catalog named by `config`, or the default one
    pub fn catalog_for(&self, config: &SinkConfig) -> String {
        config
            .policy
            .catalog
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.default_catalog.clone())
    }
}

/// Builds a sink from its configuration
pub type SinkConstructor = fn(&SinkConfig, &SinkEnvironment) -> Result<Arc<dyn Sink>>;

/// Registered sink constructors, keyed by kind
#[derive(Debug, Clone, Default)]
pub struct SinkRegistry {
    constructors: BTreeMap<String, SinkConstructor>,
}

impl SinkRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `console`, `file`, `memory` and `capture` kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, SinkConstructor); 4] = [
            ("console", build_console),
            ("file", build_file),
            ("memory", build_memory),
            ("capture", build_capture),
        ];
        for (kind, constructor) in builtins {
            registry
                .constructors
                .insert(kind.to_string(), constructor);
        }
        registry
    }

    /// Register a constructor under `kind`
    ///
    /// Keys must be non-empty, lowercase ASCII letters, digits, `-` or `_`.
    pub fn register(&mut self, kind: &str, constructor: SinkConstructor) -> Result<()> {
        if !is_valid_kind(kind) {
            return Err(Error::InvalidSinkKind(kind.to_string()));
        }
        if self.constructors.contains_key(kind) {
            return Err(Error::DuplicateSinkKind(kind.to_string()));
        }

        self.constructors.insert(kind.to_string(), constructor);
        Ok(())
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the sink described by `config`
    pub fn build(&self, config: &SinkConfig, env: &SinkEnvironment) -> Result<Arc<dyn Sink>> {
        let constructor = self
            .constructors
            .get(&config.kind)
            .ok_or_else(|| Error::UnknownSinkKind(config.kind.clone()))?;
        constructor(config, env)
    }
}

fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn build_console(config: &SinkConfig, _env: &SinkEnvironment) -> Result<Arc<dyn Sink>> {
    Ok(Arc::new(ConsoleSink::new(
        config.policy.clone(),
        config.stream.unwrap_or_default(),
    )))
}

fn build_file(config: &SinkConfig, env: &SinkEnvironment) -> Result<Arc<dyn Sink>> {
    let directory = catalog_dir(&env.base_dir, &env.catalog_for(config));
    Ok(Arc::new(FileSink::new(
        config.policy.clone(),
        directory,
        env.retention_hours,
    )))
}

fn build_memory(config: &SinkConfig, _env: &SinkEnvironment) -> Result<Arc<dyn Sink>> {
    let capacity = config
        .capacity
        .unwrap_or(DEFAULT_CAPACITY);
    Ok(Arc::new(MemorySink::new(config.policy.clone(), capacity)))
}

fn build_capture(config: &SinkConfig, env: &SinkEnvironment) -> Result<Arc<dyn Sink>> {
    let mut capture = CaptureConfig::new(env.base_dir.clone(), env.catalog_for(config))
        .with_max_age_hours(env.retention_hours);
    if let Some(command) = &config.command {
        capture = capture.with_command(command.iter().cloned());
    }
    if let Some(pid) = config.pid {
        capture = capture.with_pid(pid);
    }
    if let Some(method) = &config.method {
        capture = capture.with_method(method.clone());
    }

    Ok(Arc::new(CaptureSink::new(config.policy.clone(), capture)))
}
