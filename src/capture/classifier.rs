//! Line classification for captured log streams
//!
//! Lines follow the logcat `threadtime` layout, with the date and time being
//! optional: `[MM-dd HH:MM:SS.mmm]  <pid>  <tid>  <level>  <tag>: <message>`.

use regex::Regex;

use crate::error::{Error, Result};
use crate::level::Level;

/// Decides whether a captured line belongs to the host process and at which level
#[derive(Debug, Clone)]
pub struct Classifier {
    pattern: Regex,
    class: Option<String>,
    method: Option<String>,
    thread: Option<String>,
}

impl Classifier {
    /// Build a classifier for lines emitted by `pid`
    ///
    /// Each scope, when set, must appear in the line for it to match. The
    /// thread scope also matches the thread id column exactly.
    pub fn new(
        pid: u32,
        class: Option<String>,
        method: Option<String>,
        thread: Option<String>,
    ) -> Result<Self> {
        let pattern = format!(
            r"^(?:\d{{2}}-\d{{2}}\s+\d{{2}}:\d{{2}}:\d{{2}}\.\d+\s+)?\s*{}\s+(?P<tid>\d+)\s+(?P<level>\S+)\s+(?P<body>.*)$",
            pid
        );
        let pattern = Regex::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            pattern,
            class: class.filter(|s| !s.is_empty()),
            method: method.filter(|s| !s.is_empty()),
            thread: thread.filter(|s| !s.is_empty()),
        })
    }

    /// Classify one line
    ///
    /// Returns `Ok(None)` for lines from other processes or outside the
    /// configured scopes, and `Err(Classification)` when the level column
    /// holds an unknown token.
    pub fn classify(&self, line: &str) -> Result<Option<Level>> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let body = &caps["body"];
        let tid = &caps["tid"];

        if self.class.as_ref().is_some_and(|c| !body.contains(c.as_str())) {
            return Ok(None);
        }
        if self
            .method
            .as_ref()
            .is_some_and(|m| !body.contains(m.as_str()))
        {
            return Ok(None);
        }
        if self
            .thread
            .as_ref()
            .is_some_and(|t| t != tid && !body.contains(t.as_str()))
        {
            return Ok(None);
        }

        let level: Level = caps["level"].parse()?;
        if !level.is_message_level() {
            return Err(Error::Classification(caps["level"].to_string()));
        }
        Ok(Some(level))
    }
}
