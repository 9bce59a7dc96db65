//! Woodlog - a leveled logging engine with pluggable sinks
//!
//! This library provides the dispatcher, sink policies, calling-context capture
//! and the capture of an external log stream into per-level files.

pub mod capture;
pub mod catcher;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod level;
mod macros;
pub mod policy;
pub mod probe;
pub mod registry;
pub mod render;
pub mod sink;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::{Config, SinkConfig};
pub use dispatcher::{AssertAction, Dispatcher, DispatcherBuilder};
pub use error::{Error, Result};
pub use level::Level;
pub use policy::Policy;
pub use probe::{CallContext, CallSite};
pub use registry::{SinkEnvironment, SinkRegistry};
pub use sink::Sink;
