//! Capture of an external log stream into per-level files
//!
//! A [`CaptureWorker`] launches a line source (by default `logcat` filtered to
//! this process), classifies each line with a [`Classifier`] and appends it to
//! a [`CaptureFileSet`]. Reading happens on a dedicated thread driving a
//! current-thread tokio runtime, so the worker can be used from synchronous
//! code without an ambient runtime.

mod classifier;
mod files;

pub use classifier::Classifier;
pub use files::CaptureFileSet;

use std::path::PathBuf;
use std::process::Stdio;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::storage::{catalog_dir, ensure_directory, DEFAULT_MAX_AGE_HOURS};

/// Default line source, `{pid}` is replaced with the target process id
pub const DEFAULT_COMMAND: [&str; 4] = ["logcat", "--pid={pid}", "-v", "threadtime"];

/// Pause after the source reaches end of stream before reading again
pub const EOS_BACKOFF: Duration = Duration::from_secs(1);

/// Time the source gets to exit after SIGTERM before it is killed
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const WORKER_THREAD_NAME: &str = "woodlog-capture";

/// Lifecycle of a capture worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Where and what to capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Root directory for log catalogs
    pub base_dir: PathBuf,
    /// Sub-directory receiving this worker's files
    pub catalog: String,
    /// Source command line; `{pid}` is substituted in every argument
    pub command: Vec<String>,
    /// Process whose lines are kept
    pub pid: u32,
    /// Only keep lines mentioning this method
    pub method: Option<String>,
    /// Retention applied when the directory is reused
    pub max_age_hours: u64,
}

impl CaptureConfig {
    pub fn new(base_dir: impl Into<PathBuf>, catalog: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            catalog: catalog.into(),
            command: DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect(),
            pid: std::process::id(),
            method: None,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_max_age_hours(mut self, hours: u64) -> Self {
        self.max_age_hours = hours;
        self
    }

    /// Directory the capture files are written to
    pub fn directory(&self) -> PathBuf {
        catalog_dir(&self.base_dir, &self.catalog)
    }

    /// Command line with `{pid}` substituted
    pub fn resolved_command(&self) -> Vec<String> {
        let pid = self.pid.to_string();
        self.command
            .iter()
            .map(|arg| arg.replace("{pid}", &pid))
            .collect()
    }
}

struct WorkerHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    thread: JoinHandle<()>,
}

/// Background reader of an external log stream
pub struct CaptureWorker {
    config: CaptureConfig,
    policy: Policy,
    state: WorkerState,
    handle: Option<WorkerHandle>,
    files: Vec<PathBuf>,
}

impl CaptureWorker {
    pub fn new(config: CaptureConfig, policy: Policy) -> Self {
        Self {
            config,
            policy,
            state: WorkerState::Idle,
            handle: None,
            files: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Files opened by the most recent run
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Launch the source and start reading
    ///
    /// Does nothing while already running. On failure the worker ends up
    /// `Stopped` and may be started again.
    pub fn start(&mut self) -> Result<()> {
        if self.state == WorkerState::Running {
            return Ok(());
        }

        self.state = WorkerState::Starting;
        match self.launch() {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = WorkerState::Running;
                tracing::debug!(pid = self.config.pid, "Capture worker running");
                Ok(())
            }
            Err(e) => {
                self.state = WorkerState::Stopped;
                Err(e)
            }
        }
    }

    /// Stop the source and close the files
    ///
    /// Blocks until the reader thread has finished. Does nothing unless running.
    pub fn stop(&mut self) {
        if self.state != WorkerState::Running {
            return;
        }

        self.state = WorkerState::Stopping;
        if let Some(mut handle) = self.handle.take() {
            if let Some(tx) = handle.stop_tx.take() {
                let _ = tx.send(());
            }
            if handle.thread.join().is_err() {
                tracing::error!("Capture worker thread panicked");
            }
        }
        self.state = WorkerState::Stopped;
        tracing::debug!("Capture worker stopped");
    }

    fn launch(&mut self) -> Result<WorkerHandle> {
        self.files.clear();

        let directory = self.config.directory();
        ensure_directory(&directory, self.config.max_age_hours)?;

        let classifier = Classifier::new(
            self.config.pid,
            self.policy.class.clone(),
            self.config.method.clone(),
            self.policy.thread.clone(),
        )?;

        let command = self.config.resolved_command();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| Error::ProcessSpawn {
                command: command.join(" "),
                source,
            })?;

        let files =
            CaptureFileSet::open(&directory, &self.policy.enabled_levels(), Local::now());
        let paths = files.paths();

        let spawned = {
            let _guard = runtime.enter();
            spawn_source(&command)
        };
        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                for close_error in files.close() {
                    tracing::warn!(error = %close_error, "Failed to close capture file");
                }
                return Err(e);
            }
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(read_loop(child, files, classifier, stop_rx)))
            .map_err(|source| Error::ProcessSpawn {
                command: command.join(" "),
                source,
            })?;
        self.files = paths;

        Ok(WorkerHandle {
            stop_tx: Some(stop_tx),
            thread,
        })
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_source(command: &[String]) -> Result<Child> {
    let Some((program, args)) = command.split_first() else {
        return Err(Error::ProcessSpawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::ProcessSpawn {
            command: command.join(" "),
            source,
        })
}

fn route_line(classifier: &Classifier, files: &mut CaptureFileSet, line: &str) {
    match classifier.classify(line) {
        Ok(Some(level)) => files.write(level, line),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, line, "Skipping unclassified capture line"),
    }
}

async fn read_loop(
    mut child: Child,
    mut files: CaptureFileSet,
    classifier: Classifier,
    mut stop_rx: oneshot::Receiver<()>,
) {
    match child.stdout.take() {
        Some(stdout) => {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                let pause = tokio::select! {
                    _ = &mut stop_rx => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            route_line(&classifier, &mut files, &line);
                            false
                        }
                        // The source may be paused rather than finished
                        Ok(None) => true,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to read capture source");
                            true
                        }
                    },
                };

                if pause {
                    tokio::select! {
                        _ = &mut stop_rx => break,
                        _ = tokio::time::sleep(EOS_BACKOFF) => {}
                    }
                }
            }
        }
        None => {
            tracing::error!("Capture source has no stdout");
            let _ = stop_rx.await;
        }
    }

    terminate(&mut child).await;

    for e in files.close() {
        tracing::warn!(error = %e, "Failed to close capture file");
    }
}

async fn terminate(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }

    request_exit(child);

    if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_err() {
        tracing::warn!("Capture source did not exit in time, killing it");
        if let Err(e) = child.kill().await {
            tracing::error!(error = %e, "Failed to kill capture source");
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(raw_pid) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
        tracing::warn!(error = %e, pid, "Failed to send SIGTERM to capture source");
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    let _ = child.start_kill();
}
