//! Sink that mirrors an external log stream into files
//!
//! Records are not written by `accept`; the sink owns a [`CaptureWorker`]
//! that runs for as long as the sink is planted.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use super::{LogError, Sink};
use crate::capture::{CaptureConfig, CaptureWorker, WorkerState};
use crate::error::Result;
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;

pub struct CaptureSink {
    policy: Policy,
    worker: Mutex<CaptureWorker>,
}

impl CaptureSink {
    pub fn new(policy: Policy, config: CaptureConfig) -> Self {
        let worker = CaptureWorker::new(config, policy.clone());
        Self {
            policy,
            worker: Mutex::new(worker),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.worker().state()
    }

    /// Files written by the current or most recent capture run
    pub fn files(&self) -> Vec<PathBuf> {
        self.worker().files().to_vec()
    }

    fn worker(&self) -> MutexGuard<'_, CaptureWorker> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        "capture"
    }

    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn plant(&self) -> Result<()> {
        if let Err(e) = self.worker().start() {
            tracing::error!(error = %e, "Failed to start log capture");
        }
        Ok(())
    }

    fn unplant(&self) -> Result<()> {
        self.worker().stop();
        Ok(())
    }

    fn accept(&self, _level: Level, _context: &CallContext, _message: &str, _error: Option<LogError<'_>>) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_sink_follows_plant_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let config = CaptureConfig::new(temp_dir.path(), "shop")
            .with_command(["sh", "-c", "exec sleep 30"]);
        let sink = CaptureSink::new(Policy::new().with_threshold(Level::Error), config);

        assert_eq!(sink.state(), WorkerState::Idle);
        sink.plant().unwrap();
        assert_eq!(sink.state(), WorkerState::Running);
        // E, A and ALL
        assert_eq!(sink.files().len(), 3);

        sink.unplant().unwrap();
        assert_eq!(sink.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_capture_sink_swallows_start_failure() {
        let temp_dir = TempDir::new().unwrap();
        let config = CaptureConfig::new(temp_dir.path(), "shop")
            .with_command(["/nonexistent/woodlog-line-source"]);
        let sink = CaptureSink::new(Policy::new(), config);

        assert!(sink.plant().is_ok());
        assert_eq!(sink.state(), WorkerState::Stopped);
    }
}
