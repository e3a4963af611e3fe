//! Logging setup for hosts embedding the engine.
//!
//! The engine itself only emits `tracing` events; these helpers install a
//! subscriber for binaries and tests that do not bring their own.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Console logging. `RUST_LOG` overrides `level` when set.
///
/// # Examples
/// ```no_run
/// // Development
/// reservation_engine::logging::init_logging("debug", false)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(level: &str, json_format: bool) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let result = if json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    result.context("failed to install tracing subscriber")
}

/// Console logging plus a daily-rotating JSON file under `log_dir`.
///
/// Keep the returned guard alive for as long as file logs should be flushed.
pub fn init_logging_with_file(
    level: &str,
    log_dir: impl AsRef<Path>,
) -> anyhow::Result<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "reservations");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
