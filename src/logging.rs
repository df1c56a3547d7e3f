use anyhow::Context;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. With file logging on,
/// events go to both stderr and the configured file.
pub fn init(logging: &LoggingConfig, default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level '{}'", default_level))?;

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if logging.log_to_file {
        let file = std::fs::File::create(&logging.log_file_path)
            .with_context(|| format!("Failed to create log file '{}'", logging.log_file_path))?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file));

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()
            .context("Failed to initialize logging")?;
    }
    Ok(())
}
