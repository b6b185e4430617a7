use std::fs::OpenOptions;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, fmt::writer::BoxMakeWriter, layer::SubscriberExt,
    util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Output goes to `file_path` when
/// set, otherwise to stderr; stdout carries command output only.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let writer = match &config.file_path {
        Some(path) => BoxMakeWriter::new(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = if config.format == "json" {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_ansi(config.file_path.is_none())
            .with_file(false)
            .with_line_number(true)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).with(filter).try_init()?;
    Ok(())
}

/// `warning` is accepted as an alias for `warn`.
fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
