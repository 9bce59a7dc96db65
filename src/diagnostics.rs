//! Internal diagnostics
//!
//! The engine reports its own failures (sink I/O, capture classification,
//! retention sweeps) through `tracing`, never through its sinks. Applications
//! that have no subscriber of their own can install a stderr one here.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "woodlog=warn";

/// Install a stderr subscriber filtered by `RUST_LOG`, or `woodlog=warn`
///
/// Returns `false` when a global subscriber is already set.
pub fn init_diagnostics() -> bool {
    init_diagnostics_with(DEFAULT_FILTER)
}

/// Like [`init_diagnostics`] with a custom fallback filter
pub fn init_diagnostics_with(default_filter: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .is_ok()
}
