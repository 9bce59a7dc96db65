//! Log levels
//!
//! Levels are totally ordered. The same order is used for threshold checks and
//! as an index into per-level tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Severity of a log call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    /// Threshold sentinel: everything passes
    All,
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    /// Programmer error; fatal once delivered
    Assert,
    /// Threshold sentinel: nothing passes
    Silent,
}

impl Level {
    /// Every level, in order
    pub const ALL_LEVELS: [Level; 8] = [
        Level::All,
        Level::Verbose,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Assert,
        Level::Silent,
    ];

    /// Levels a message can actually be logged at
    pub const MESSAGE_LEVELS: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Assert,
    ];

    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Assert => "ASSERT",
            Level::Silent => "SILENT",
        }
    }

    /// Short label, as used by logcat and in capture file names
    pub fn letter(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Verbose => "V",
            Level::Debug => "D",
            Level::Info => "I",
            Level::Warn => "W",
            Level::Error => "E",
            Level::Assert => "A",
            Level::Silent => "S",
        }
    }

    /// Position in the total order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Whether a message may be emitted at this level
    pub fn is_message_level(&self) -> bool {
        !matches!(self, Level::All | Level::Silent)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    /// Accepts full names in any case and single logcat letters
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let level = match token.to_ascii_uppercase().as_str() {
            "ALL" => Level::All,
            "V" | "VERBOSE" => Level::Verbose,
            "D" | "DEBUG" => Level::Debug,
            "I" | "INFO" => Level::Info,
            "W" | "WARN" | "WARNING" => Level::Warn,
            "E" | "ERROR" => Level::Error,
            "A" | "F" | "ASSERT" | "FATAL" => Level::Assert,
            "S" | "SILENT" => Level::Silent,
            _ => return Err(Error::Classification(token.to_string())),
        };
        Ok(level)
    }
}

impl TryFrom<String> for Level {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Error> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(Level::All < Level::Verbose);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Assert < Level::Silent);
        for (i, level) in Level::ALL_LEVELS.iter().enumerate() {
            assert_eq!(level.index(), i);
        }
    }

    #[test]
    fn test_parse_names_and_letters() {
        assert_eq!("W".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("F".parse::<Level>().unwrap(), Level::Assert);
        assert_eq!(" info ".parse::<Level>().unwrap(), Level::Info);
        assert!(matches!(
            "Q".parse::<Level>(),
            Err(Error::Classification(token)) if token == "Q"
        ));
    }

    #[test]
    fn test_message_levels_exclude_sentinels() {
        assert!(!Level::All.is_message_level());
        assert!(!Level::Silent.is_message_level());
        assert!(Level::MESSAGE_LEVELS.iter().all(|l| l.is_message_level()));
    }

    #[test]
    fn test_deserialize_from_string() {
        #[derive(serde::Deserialize)]
        struct Holder {
            level: Level,
        }
        let holder: Holder = toml::from_str("level = \"E\"").unwrap();
        assert_eq!(holder.level, Level::Error);
        assert!(toml::from_str::<Holder>("level = \"LOUD\"").is_err());
    }
}
