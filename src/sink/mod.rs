//! Sink abstraction and built-in sinks
//!
//! Every destination implements `Sink`. The dispatcher checks the sink's policy
//! before calling `accept`, so implementations only render and persist.

mod capture;
mod console;
mod file;
mod memory;

pub use capture::CaptureSink;
pub use console::{ConsoleSink, ConsoleStream};
pub use file::FileSink;
pub use memory::{MemorySink, Record, DEFAULT_CAPACITY};

use std::error::Error as StdError;

use crate::error::Result;
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;

/// Error value passed along with a log call
pub type LogError<'a> = &'a (dyn StdError + 'static);

/// A destination for log records
///
/// # Object Safety
/// This trait is object-safe; the dispatcher stores `Arc<dyn Sink>`.
pub trait Sink: Send + Sync {
    /// Short name used in diagnostics and lifecycle errors
    fn name(&self) -> &str;

    /// Filter deciding which calls reach `accept`
    fn policy(&self) -> &Policy;

    /// Acquire resources; called before the sink becomes visible to dispatch
    fn plant(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources; called after the sink is no longer visible
    fn unplant(&self) -> Result<()> {
        Ok(())
    }

    /// Handle one admitted call
    fn accept(&self, level: Level, context: &CallContext, message: &str, error: Option<LogError<'_>>);
}

/// Render an error and its chain of sources, one per line
pub fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str("\nCaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct NullSink {
        policy: Policy,
    }

    impl Sink for NullSink {
        fn name(&self) -> &str {
            "null"
        }

        fn policy(&self) -> &Policy {
            &self.policy
        }

        fn accept(&self, _: Level, _: &CallContext, _: &str, _: Option<LogError<'_>>) {}
    }

    #[test]
    fn test_sink_is_object_safe() {
        let sink: Box<dyn Sink> = Box::new(NullSink {
            policy: Policy::new(),
        });
        assert_eq!(sink.name(), "null");
        assert!(sink.plant().is_ok());
        assert!(sink.unplant().is_ok());
    }

    #[test]
    fn test_describe_error_walks_sources() {
        let err = Error::io(
            "/var/log/app",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = describe_error(&err);
        assert!(text.starts_with("I/O error on /var/log/app"));
        assert!(text.ends_with("Caused by: denied"));
    }
}
