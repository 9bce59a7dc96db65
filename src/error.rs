//! Error types for the logging engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the dispatcher, its sinks and the capture worker
#[derive(Debug, Error)]
pub enum Error {
    /// The sink is already part of the forest
    #[error("sink `{0}` is already planted")]
    AlreadyPlanted(String),

    /// The sink is not part of the forest
    #[error("sink `{0}` is not planted")]
    NotPlanted(String),

    /// The call stack is shorter than the frame we need to inspect
    #[error("call stack has {available} frames, frame {required} was requested")]
    StackUnavailable { available: usize, required: usize },

    /// Directory or file I/O failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external line source could not be launched
    #[error("failed to spawn `{command}`: {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A captured line carried a level token we do not know
    #[error("unrecognized level token `{0}`")]
    Classification(String),

    /// Message template and arguments do not agree
    #[error("malformed format: {0}")]
    Format(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// No constructor is registered for the sink kind
    #[error("no sink registered for kind `{0}`")]
    UnknownSinkKind(String),

    /// Registry keys must be non-empty lowercase identifiers
    #[error("invalid sink kind `{0}`")]
    InvalidSinkKind(String),

    /// A constructor is already registered under this key
    #[error("sink kind `{0}` is already registered")]
    DuplicateSinkKind(String),

    /// One or more sinks failed while being torn down
    #[error("{} sink(s) failed during teardown", .0.len())]
    Teardown(Vec<Error>),
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "/tmp/woodlog/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/woodlog/missing"));
        assert!(text.contains("gone"));
    }

    #[test]
    fn test_teardown_counts_failures() {
        let err = Error::Teardown(vec![
            Error::NotPlanted("a".into()),
            Error::Classification("Q".into()),
        ]);
        assert_eq!(err.to_string(), "2 sink(s) failed during teardown");
    }
}
