//! Tracing subscriber setup.
//!
//! stdout carries the protocol, so logs go to stderr or to a log directory.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

const LOG_FILE_PREFIX: &str = "zoho-mcp.log";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must be held until exit when logging to files, or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => EnvFilter::try_new(&config.level)
      .map_err(|e| eyre!("Invalid log level '{}': {}", config.level, e))?,
  };

  let (writer, guard) = match &config.directory {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
      let (non_blocking, guard) = tracing_appender::non_blocking(appender);
      (BoxMakeWriter::new(non_blocking), Some(guard))
    }
    None => (BoxMakeWriter::new(std::io::stderr), None),
  };

  let builder = fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false);

  let result = match config.format {
    LogFormat::Json => builder.json().try_init(),
    LogFormat::Text => builder.compact().try_init(),
  };
  result.map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
