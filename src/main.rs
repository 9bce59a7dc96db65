use std::path::PathBuf;

use anyhow::{Context, Result};

use woodlog::diagnostics::init_diagnostics;
use woodlog::{config, Config, Dispatcher, SinkRegistry};

fn main() -> Result<()> {
    init_diagnostics();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::config_file_path);

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let dispatcher = Dispatcher::from_config(&config, &SinkRegistry::with_defaults())
        .context("Failed to plant configured sinks")?;

    tracing::info!(
        sinks = dispatcher.planted_count(),
        base_dir = %config.base_dir.display(),
        "Sinks planted"
    );

    woodlog::verbose!(&dispatcher, "verbose message from {}", env!("CARGO_PKG_NAME"));
    woodlog::debug!(&dispatcher, "debug message");
    woodlog::info!(&dispatcher, "info message");
    woodlog::warn!(&dispatcher, "warn message");
    let err = std::io::Error::new(std::io::ErrorKind::Other, "sample failure");
    woodlog::error!(&dispatcher, err = &err, "error message");

    dispatcher.shutdown().context("Failed to tear down sinks")?;
    Ok(())
}
