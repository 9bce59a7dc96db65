//! Console sink
//!
//! Writes one line per call to stdout, stderr, or any injected writer.

use std::io::{self, Write};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{describe_error, LogError, Sink};
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;

const TIME_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Standard stream a console sink writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

/// Sink printing formatted lines to a console stream
pub struct ConsoleSink {
    policy: Policy,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Create a sink writing to the given standard stream
    pub fn new(policy: Policy, stream: ConsoleStream) -> Self {
        let out: Box<dyn Write + Send> = match stream {
            ConsoleStream::Stdout => Box::new(io::stdout()),
            ConsoleStream::Stderr => Box::new(io::stderr()),
        };
        Self::with_writer(policy, out)
    }

    /// Create a sink writing to an arbitrary writer
    pub fn with_writer(policy: Policy, out: Box<dyn Write + Send>) -> Self {
        Self {
            policy,
            out: Mutex::new(out),
        }
    }
}

/// Format a call as a single console entry
pub fn format_line(
    level: Level,
    context: &CallContext,
    message: &str,
    error: Option<LogError<'_>>,
) -> String {
    let mut line = format!(
        "{} {}/{} ({}) {}@{}: {}",
        context.timestamp.format(TIME_FORMAT),
        level.letter(),
        context.tag,
        context.thread,
        context.caller_method,
        context.file_line,
        message
    );
    if let Some(err) = error {
        line.push('\n');
        line.push_str(&describe_error(err));
    }
    line.push('\n');
    line
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn accept(&self, level: Level, context: &CallContext, message: &str, error: Option<LogError<'_>>) {
        let line = format_line(level, context, message, error);

        // A poisoned lock only means another writer panicked mid-line
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Console sink failed to write");
        }
    }
}
