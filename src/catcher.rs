//! Panic catcher
//!
//! Reports unhandled panics through a dispatcher, then hands over to the
//! previously installed hook. Dropping the returned guard restores that hook.

use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::level::Level;
use crate::policy::Policy;
use crate::probe::CallContext;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Restores the previous panic hook when dropped
#[must_use = "the panic hook is removed when the guard is dropped"]
pub struct CatcherGuard {
    previous: Option<Arc<PanicHook>>,
}

impl Drop for CatcherGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Our own hook holds the other reference
            let _ = panic::take_hook();
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}

/// Install a panic hook reporting panics admitted by `policy`
pub fn install(dispatcher: Arc<Dispatcher>, policy: Policy) -> CatcherGuard {
    let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
    let chained = Arc::clone(&previous);

    panic::set_hook(Box::new(move |info| {
        report(&dispatcher, &policy, info);
        chained(info);
    }));

    CatcherGuard {
        previous: Some(previous),
    }
}

fn report(dispatcher: &Dispatcher, policy: &Policy, info: &PanicHookInfo<'_>) {
    let context = panic_context(info);
    if !policy.is_admitted(Level::Error, &context) {
        return;
    }

    let message = format!("Unhandled panic: {}", payload_text(info));
    dispatcher.dispatch_with_context(&context, Level::Error, &message, None);
}

fn panic_context(info: &PanicHookInfo<'_>) -> CallContext {
    let (file, line) = info
        .location()
        .map(|l| (l.file(), l.line()))
        .unwrap_or(("unknown", 0));

    CallContext::new("panic", file, line, Some("panic"))
}

fn payload_text(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::sync::Mutex;

    // Panic hooks are process-wide
    static HOOK_LOCK: Mutex<()> = Mutex::new(());

    fn setup() -> (Arc<Dispatcher>, Arc<MemorySink>) {
        let dispatcher = Arc::new(Dispatcher::new());
        let sink = Arc::new(MemorySink::new(Policy::new(), 10));
        dispatcher.plant(sink.clone()).unwrap();
        (dispatcher, sink)
    }

    #[test]
    fn test_panic_is_reported() {
        let _lock = HOOK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (dispatcher, sink) = setup();
        let guard = install(
            Arc::clone(&dispatcher),
            Policy::new().with_thread("panicking-worker"),
        );

        let handle = std::thread::Builder::new()
            .name("panicking-worker".into())
            .spawn(|| panic!("inventory exhausted"))
            .unwrap();
        assert!(handle.join().is_err());
        drop(guard);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Error);
        assert_eq!(records[0].message, "Unhandled panic: inventory exhausted");
        assert_eq!(records[0].context.thread, "panicking-worker");
        assert_eq!(records[0].context.tag, "panic");
        assert!(records[0].context.file_line.starts_with("catcher.rs:"));
    }

    #[test]
    fn test_policy_filters_panics() {
        let _lock = HOOK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (dispatcher, sink) = setup();
        let guard = install(
            Arc::clone(&dispatcher),
            Policy::new().with_thread("ui-thread"),
        );

        let handle = std::thread::Builder::new()
            .name("background".into())
            .spawn(|| panic!("ignored"))
            .unwrap();
        assert!(handle.join().is_err());
        drop(guard);

        assert!(sink.is_empty());
    }

    #[test]
    fn test_guard_restores_previous_hook() {
        let _lock = HOOK_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let (dispatcher, sink) = setup();
        drop(install(Arc::clone(&dispatcher), Policy::new()));

        let handle = std::thread::spawn(|| panic!("after uninstall"));
        assert!(handle.join().is_err());

        assert!(sink.is_empty());
    }
}
