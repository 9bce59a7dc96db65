//! Per-call file sink
//!
//! Every admitted call is written to its own file inside the catalog directory.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{describe_error, LogError, Sink};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;
use crate::storage::{call_file_name, ensure_directory};

/// Attempts at finding a free name when two calls land on the same millisecond
const MAX_NAME_ATTEMPTS: usize = 8;

/// Sink writing one file per call
pub struct FileSink {
    policy: Policy,
    directory: PathBuf,
    max_age_hours: u64,
    ready: AtomicBool,
}

impl FileSink {
    /// Create a sink writing into `directory`
    pub fn new(policy: Policy, directory: PathBuf, max_age_hours: u64) -> Self {
        Self {
            policy,
            directory,
            max_age_hours,
            ready: AtomicBool::new(false),
        }
    }

    /// Directory receiving the files
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_call(
        &self,
        level: Level,
        context: &CallContext,
        message: &str,
        error: Option<LogError<'_>>,
    ) -> Result<PathBuf> {
        let name = call_file_name(context.timestamp, &context.caller_method, &context.file_line);
        let (path, mut file) = create_unique(&self.directory, &name)?;

        let mut body = format!("{}-{}:\n{}\n", level.as_str(), context.file_line, message);
        if let Some(err) = error {
            body.push_str(&describe_error(err));
            body.push('\n');
        }

        file.write_all(body.as_bytes())
            .map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}

fn create_unique(directory: &Path, name: &str) -> Result<(PathBuf, File)> {
    let mut last_error = None;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = if attempt == 0 {
            directory.join(name)
        } else {
            directory.join(format!("{} ({})", name, attempt))
        };

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_error = Some((path, e)),
            Err(e) => return Err(Error::io(path, e)),
        }
    }

    let (path, e) = last_error.unwrap_or_else(|| {
        (
            directory.join(name),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"),
        )
    });
    Err(Error::io(path, e))
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn plant(&self) -> Result<()> {
        match ensure_directory(&self.directory, self.max_age_hours) {
            Ok(()) => self.ready.store(true, Ordering::Release),
            Err(e) => {
                self.ready.store(false, Ordering::Release);
                tracing::error!(error = %e, "Failed to create log directory, file sink disabled");
            }
        }
        Ok(())
    }

    fn unplant(&self) -> Result<()> {
        self.ready.store(false, Ordering::Release);
        Ok(())
    }

    fn accept(&self, level: Level, context: &CallContext, message: &str, error: Option<LogError<'_>>) {
        if !self.ready.load(Ordering::Acquire) {
            return;
        }

        if let Err(e) = self.write_call(level, context, message, error) {
            tracing::warn!(error = %e, "File sink failed to write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ctx() -> CallContext {
        CallContext::for_test("main", "Checkout", "submit", "shop")
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_file_sink_writes_one_file_per_call() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("shop");
        let sink = FileSink::new(Policy::new(), dir.clone(), 8);
        sink.plant().unwrap();

        let context = ctx();
        sink.accept(Level::Warn, &context, "first", None);
        sink.accept(Level::Warn, &context, "second", None);

        let files = files_in(&dir);
        assert_eq!(files.len(), 2);

        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(" submit-test.rs:1"));

        let first = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(first, "WARN-test.rs:1:\nfirst\n");
        let second = fs::read_to_string(&files[1]).unwrap();
        assert_eq!(second, "WARN-test.rs:1:\nsecond\n");
    }

    #[test]
    fn test_file_sink_includes_error_chain() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileSink::new(Policy::new(), temp_dir.path().to_path_buf(), 8);
        sink.plant().unwrap();

        let err = io::Error::new(io::ErrorKind::Other, "socket closed");
        sink.accept(Level::Error, &ctx(), "upload failed", Some(&err));

        let files = files_in(temp_dir.path());
        let body = fs::read_to_string(&files[0]).unwrap();
        assert!(body.ends_with("upload failed\nsocket closed\n"));
    }

    #[test]
    fn test_file_sink_is_inert_when_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        File::create(&blocker).unwrap();

        let sink = FileSink::new(Policy::new(), blocker.clone(), 8);
        // Resource errors stay inside the sink
        assert!(sink.plant().is_ok());
        sink.accept(Level::Info, &ctx(), "dropped", None);
        assert!(blocker.is_file());
    }

    #[test]
    fn test_file_sink_ignores_calls_before_plant() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("unplanted");
        let sink = FileSink::new(Policy::new(), dir.clone(), 8);
        sink.accept(Level::Info, &ctx(), "dropped", None);
        assert!(!dir.exists());
    }
}
