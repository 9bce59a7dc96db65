//! Calling-context capture
//!
//! A `CallContext` is built once per dispatch, either from an explicit
//! `CallSite` recorded by the logging macros or by walking the call stack.
//! Stack walking relies on symbol names being present. When the stack is too
//! short (stripped binaries, aggressive inlining) the dispatcher falls back to
//! the last frame it has and keeps going.

use std::backtrace::Backtrace;
use std::panic::Location;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::error::{Error, Result};

/// Frames between `BacktraceProbe::frames` and the code that called
/// `Dispatcher::dispatch`: `frames` -> `Dispatcher::probe_context` ->
/// `Dispatcher::dispatch` -> caller. Recalibrate when that path changes.
pub const CALL_STACK_INDEX: usize = 3;

/// Class names longer than this are truncated
const MAX_TAG_LENGTH: usize = 30;

const UNKNOWN: &str = "unknown";

static AT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?P<path>.+?):(?P<line>\d+)(?::\d+)?\s*$").expect("valid regex")
});

static SYMBOL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+:\s+)?(?P<symbol>\S.*?)\s*$").expect("valid regex"));

static SYMBOL_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::h[0-9a-f]{16}$").expect("valid regex"));

static TRAIT_IMPL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>]+?) as [^<>]+>").expect("valid regex"));

/// A source location recorded at compile time by the logging macros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Fully qualified path of the calling function
    pub function: &'static str,
    /// Source file
    pub file: &'static str,
    /// Line in `file`
    pub line: u32,
}

impl CallSite {
    pub const fn new(function: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            function,
            file,
            line,
        }
    }
}

/// One frame of a captured call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Demangled symbol, e.g. `shop::cart::Checkout::submit`
    pub symbol: String,
    /// Source file, when debug info is available
    pub file: Option<String>,
    /// Line in `file`
    pub line: Option<u32>,
}

impl Frame {
    /// Placeholder used when no frame at all could be captured
    pub fn unknown() -> Self {
        Self {
            symbol: UNKNOWN.to_string(),
            file: None,
            line: None,
        }
    }
}

/// Snapshot of the caller's identity at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Name of the calling thread
    pub thread: String,
    /// Type (or innermost module, for free functions) of the caller
    pub caller_class: String,
    /// Calling function
    pub caller_method: String,
    /// `file.rs:line` of the call
    pub file_line: String,
    /// Module path enclosing `caller_class`
    pub package_name: String,
    /// Tag used by renderers; defaults to `caller_class`
    pub tag: String,
    /// When the call was made
    pub timestamp: DateTime<Local>,
}

impl CallContext {
    /// Build a context from a macro-recorded call site
    pub fn from_site(site: &CallSite, tag: Option<&str>) -> Self {
        Self::new(site.function, site.file, site.line, tag)
    }

    /// Build a context from borrowed location parts
    pub fn new(symbol: &str, file: &str, line: u32, tag: Option<&str>) -> Self {
        let file_line = format!("{}:{}", file_name(file), line);
        Self::from_symbol(symbol, file_line, tag)
    }

    /// Build a context from a stack frame; `location` supplies file:line
    pub fn from_frame(frame: &Frame, location: &Location<'_>, tag: Option<&str>) -> Self {
        let file_line = format!("{}:{}", file_name(location.file()), location.line());
        Self::from_symbol(&frame.symbol, file_line, tag)
    }

    fn from_symbol(symbol: &str, file_line: String, tag: Option<&str>) -> Self {
        let (package_name, caller_class, caller_method) = split_symbol(symbol);
        Self {
            thread: current_thread_name(),
            tag: tag.map(str::to_string).unwrap_or_else(|| caller_class.clone()),
            caller_class,
            caller_method,
            file_line,
            package_name,
            timestamp: Local::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test(thread: &str, class: &str, method: &str, package: &str) -> Self {
        Self {
            thread: thread.to_string(),
            caller_class: class.to_string(),
            caller_method: method.to_string(),
            file_line: "test.rs:1".to_string(),
            package_name: package.to_string(),
            tag: class.to_string(),
            timestamp: Local::now(),
        }
    }
}

/// Source of call-stack frames
pub trait Probe: Send + Sync {
    /// Capture the current stack, innermost frame first, starting at the
    /// probe's own frame
    fn frames(&self) -> Vec<Frame>;
}

/// Probe backed by `std::backtrace`
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceProbe;

impl Probe for BacktraceProbe {
    #[inline(never)]
    fn frames(&self) -> Vec<Frame> {
        let text = Backtrace::force_capture().to_string();
        let frames = parse_backtrace(&text);

        // Anchor on our own frame so that runtime frames above it don't count
        match frames
            .iter()
            .position(|f| f.symbol.contains("BacktraceProbe") && f.symbol.ends_with("frames"))
        {
            Some(anchor) => frames.into_iter().skip(anchor).collect(),
            None => frames,
        }
    }
}

/// Pick the frame `skip` positions past the probe frame
pub fn select_frame(frames: &[Frame], skip: usize) -> Result<&Frame> {
    frames.get(skip).ok_or(Error::StackUnavailable {
        available: frames.len(),
        required: skip,
    })
}

/// Parse the textual form of a `std::backtrace::Backtrace`
pub fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = AT_LINE.captures(line) {
            if let Some(last) = frames.last_mut() {
                if last.file.is_none() {
                    last.file = Some(caps["path"].to_string());
                    last.line = caps["line"].parse().ok();
                }
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("stack backtrace") || trimmed.starts_with("note:")
        {
            continue;
        }

        if let Some(caps) = SYMBOL_LINE.captures(line) {
            let symbol = SYMBOL_HASH.replace(&caps["symbol"], "").into_owned();
            frames.push(Frame {
                symbol,
                file: None,
                line: None,
            });
        }
    }

    frames
}

/// Split a function path into (package, class, method)
///
/// `shop::cart::Checkout::submit` yields `("shop::cart", "Checkout", "submit")`.
/// Closure segments are dropped and trait impls collapse to the implementing type.
pub fn split_symbol(symbol: &str) -> (String, String, String) {
    let symbol = SYMBOL_HASH.replace(symbol.trim(), "");
    let symbol = TRAIT_IMPL.replace_all(&symbol, "$1");
    let cleaned: String = symbol.chars().filter(|c| !matches!(c, '<' | '>')).collect();

    let segments: Vec<&str> = cleaned
        .split("::")
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();

    match segments.as_slice() {
        [] => (String::new(), UNKNOWN.to_string(), UNKNOWN.to_string()),
        [method] => (String::new(), truncate_class(method), method.to_string()),
        [package @ .., class, method] => (
            package.join("::"),
            truncate_class(class),
            method.to_string(),
        ),
    }
}

fn truncate_class(class: &str) -> String {
    class.chars().take(MAX_TAG_LENGTH).collect()
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Name of the current thread, or its id when unnamed
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
