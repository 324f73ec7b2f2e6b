//! Logging setup.
//!
//! One subscriber, assembled from up to three pieces: a level filter, a
//! console layer, and (when enabled) a rolling-file layer. The format
//! choice only decides how each sink renders; the pipeline itself is the
//! same either way, so the layers are boxed and the format branch stays
//! local to the constructors.

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;
type ConsoleRegistry = Layered<BoxedLayer, FilteredRegistry>;
type BoxedFileLayer = Box<dyn Layer<ConsoleRegistry> + Send + Sync>;

/// Installs the global subscriber. Safe to call more than once; only the
/// first installation wins (later calls are no-ops, which keeps tests
/// that each spin up a server from fighting over the global).
pub fn init_with_config(cfg: &LoggingConfig) {
    let file = if cfg.enable_file_logging {
        file_writer(cfg)
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(level_filter(cfg))
        .with(console_layer(cfg.format))
        .with(file.map(|writer| file_layer(cfg.format, writer)))
        .try_init();
}

/// An explicit `logging.level` beats `RUST_LOG`; with neither set, "info".
fn level_filter(cfg: &LoggingConfig) -> EnvFilter {
    match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    let base = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stdout);
    match format {
        LogFormat::Json => base.json().with_ansi(false).boxed(),
        LogFormat::Text => base.with_ansi(true).boxed(),
    }
}

fn file_layer(
    format: LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> BoxedFileLayer {
    let base = tracing_subscriber::fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer);
    match format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Text => base.boxed(),
    }
}

/// Builds the non-blocking rolling-file writer, or `None` (with a notice
/// on stderr) when the log directory cannot be created -- console logging
/// still works in that case.
fn file_writer(cfg: &LoggingConfig) -> Option<tracing_appender::non_blocking::NonBlocking> {
    if let Err(err) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "log directory '{}' is unavailable ({err}); file logging disabled",
            cfg.dir
        );
        return None;
    }

    let rotation = match cfg.rotation.to_ascii_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    };
    let appender =
        tracing_appender::rolling::RollingFileAppender::new(rotation, &cfg.dir, &cfg.filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Dropping the guard would flush and stop the worker thread. Logging
    // lives as long as the process, so the guard is deliberately never
    // dropped.
    std::mem::forget(guard);

    Some(writer)
}
