//! The dispatcher: owns the forest of planted sinks and fans calls out to it
//!
//! Reads go through a lock-free `ArcSwap` snapshot; planting and unplanting
//! serialize on a mutex and publish a fresh snapshot when done. A dispatch that
//! races with `unplant_all` sees either the old forest or the empty one, never
//! a partial one.

use std::fmt::Display;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::level::Level;
use crate::probe::{
    select_frame, BacktraceProbe, CallContext, CallSite, Frame, Probe, CALL_STACK_INDEX,
};
use crate::registry::SinkRegistry;
use crate::render::render_or_placeholder;
use crate::sink::{LogError, Sink};

/// Hook run before an accepted ASSERT terminates the call
pub type FatalHook = Box<dyn Fn(&CallContext, &str) + Send + Sync>;

/// What an accepted ASSERT does after the fatal hook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertAction {
    /// Abort the process
    #[default]
    Abort,
    /// Panic on the calling thread
    Panic,
}

type Forest = Vec<Arc<dyn Sink>>;

/// Builder for a [`Dispatcher`] with a custom probe, fatal hook or assert action
#[derive(Default)]
pub struct DispatcherBuilder {
    probe: Option<Box<dyn Probe>>,
    fatal_hook: Option<FatalHook>,
    assert_action: AssertAction,
}

impl DispatcherBuilder {
    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn fatal_hook(mut self, hook: impl Fn(&CallContext, &str) + Send + Sync + 'static) -> Self {
        self.fatal_hook = Some(Box::new(hook));
        self
    }

    pub fn assert_action(mut self, action: AssertAction) -> Self {
        self.assert_action = action;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            forest: ArcSwap::from_pointee(Vec::new()),
            planting: Mutex::new(Vec::new()),
            probe: self.probe.unwrap_or_else(|| Box::new(BacktraceProbe)),
            fatal_hook: self.fatal_hook,
            assert_action: self.assert_action,
        }
    }
}

/// Routes log calls to every planted sink whose policy admits them
pub struct Dispatcher {
    forest: ArcSwap<Forest>,
    planting: Mutex<Forest>,
    probe: Box<dyn Probe>,
    fatal_hook: Option<FatalHook>,
    assert_action: AssertAction,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with the backtrace probe, no fatal hook and `AssertAction::Abort`
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Build every sink listed in `config` and plant them in order
    ///
    /// Sinks planted before a failure are torn down again when the partially
    /// built dispatcher is dropped.
    pub fn from_config(config: &Config, registry: &SinkRegistry) -> Result<Self> {
        let dispatcher = Self::builder()
            .assert_action(config.assert_action)
            .build();
        let env = config.sink_environment();

        for sink_config in &config.sinks {
            let sink = registry.build(sink_config, &env)?;
            dispatcher.plant(sink)?;
        }

        tracing::debug!(sinks = dispatcher.planted_count(), "Dispatcher ready");
        Ok(dispatcher)
    }

    /// Add a sink to the forest
    pub fn plant(&self, sink: Arc<dyn Sink>) -> Result<()> {
        let mut planted = self.planted();
        if planted.iter().any(|s| same_sink(s, &sink)) {
            return Err(Error::AlreadyPlanted(sink.name().to_string()));
        }

        planted.push(Arc::clone(&sink));
        if let Err(e) = sink.plant() {
            planted.pop();
            return Err(e);
        }

        self.forest.store(Arc::new(planted.clone()));
        Ok(())
    }

    /// Remove a sink from the forest and release its resources
    pub fn unplant(&self, sink: &Arc<dyn Sink>) -> Result<()> {
        let removed = {
            let mut planted = self.planted();
            let Some(index) = planted.iter().position(|s| same_sink(s, sink)) else {
                return Err(Error::NotPlanted(sink.name().to_string()));
            };
            let removed = planted.remove(index);
            self.forest.store(Arc::new(planted.clone()));
            removed
        };

        removed.unplant()
    }

    /// Empty the forest, then tear every sink down
    pub fn unplant_all(&self) -> Result<()> {
        let removed = {
            let mut planted = self.planted();
            self.forest.store(Arc::new(Vec::new()));
            std::mem::take(&mut *planted)
        };

        let failures: Vec<Error> = removed
            .iter()
            .filter_map(|sink| sink.unplant().err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }

    /// Tear down every sink
    pub fn shutdown(&self) -> Result<()> {
        self.unplant_all()
    }

    /// Number of sinks in the current snapshot
    pub fn planted_count(&self) -> usize {
        self.forest.load().len()
    }

    /// Sinks in the current snapshot, in plant order
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        self.forest.load().iter().cloned().collect()
    }

    /// Log a call, deriving the context from the call stack
    ///
    /// `message` is used verbatim when `args` is empty and rendered as a `{}`
    /// template otherwise. Dispatches at `All` or `Silent` are ignored.
    #[track_caller]
    #[inline(never)]
    pub fn dispatch(
        &self,
        level: Level,
        message: &str,
        error: Option<LogError<'_>>,
        args: &[&dyn Display],
    ) {
        if !self.wants(level) {
            return;
        }

        let context = self.probe_context(None);
        self.deliver(level, &context, message, error, args);
    }

    /// Log a call from a call site recorded at compile time
    pub fn dispatch_at(
        &self,
        site: CallSite,
        tag: Option<&str>,
        level: Level,
        message: &str,
        error: Option<LogError<'_>>,
        args: &[&dyn Display],
    ) {
        if !self.wants(level) {
            return;
        }

        let context = CallContext::from_site(&site, tag);
        self.deliver(level, &context, message, error, args);
    }

    /// Log a call with a context built by the caller
    pub fn dispatch_with_context(
        &self,
        context: &CallContext,
        level: Level,
        message: &str,
        error: Option<LogError<'_>>,
    ) {
        if !self.wants(level) {
            return;
        }

        self.deliver(level, context, message, error, &[]);
    }

    /// Cheap pre-check so that no context is built for calls nobody wants
    fn wants(&self, level: Level) -> bool {
        level.is_message_level()
            && self
                .forest
                .load()
                .iter()
                .any(|sink| sink.policy().admits_level(level))
    }

    #[track_caller]
    #[inline(never)]
    fn probe_context(&self, tag: Option<&str>) -> CallContext {
        let location = Location::caller();
        let frames = self.probe.frames();

        let frame = match select_frame(&frames, CALL_STACK_INDEX) {
            Ok(frame) => frame.clone(),
            Err(e) => {
                tracing::debug!(error = %e, "Falling back to the outermost captured frame");
                frames.last().cloned().unwrap_or_else(Frame::unknown)
            }
        };

        CallContext::from_frame(&frame, location, tag)
    }

    fn deliver(
        &self,
        level: Level,
        context: &CallContext,
        message: &str,
        error: Option<LogError<'_>>,
        args: &[&dyn Display],
    ) {
        let forest = self.forest.load();
        let mut rendered: Option<String> = None;

        for sink in forest.iter() {
            if !sink.policy().is_admitted(level, context) {
                continue;
            }
            let text = rendered.get_or_insert_with(|| render_or_placeholder(message, args));
            sink.accept(level, context, text, error);
        }

        if level == Level::Assert {
            if let Some(text) = rendered {
                self.fail(context, &text);
            }
        }
    }

    fn fail(&self, context: &CallContext, message: &str) -> ! {
        if let Some(hook) = &self.fatal_hook {
            hook(context, message);
        }

        match self.assert_action {
            AssertAction::Abort => std::process::abort(),
            AssertAction::Panic => panic!("assertion logged at {}: {}", context.file_line, message),
        }
    }

    fn planted(&self) -> MutexGuard<'_, Forest> {
        self.planting.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "Sink teardown failed");
        }
    }
}

/// Sinks are identified by the allocation behind their `Arc`
fn same_sink(a: &Arc<dyn Sink>, b: &Arc<dyn Sink>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
