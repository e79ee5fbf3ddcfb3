//! Logging setup for the pipeline binary.
//!
//! Console output always; a daily-rotating file log when a log directory is
//! configured. The level defaults to `info` and `RUST_LOG` overrides it.
//!
//! ```no_run
//! orders_etl::logging::init(None, false).expect("Failed to initialize logging");
//! tracing::info!("Pipeline started");
//! ```

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Build the env filter: `RUST_LOG` if set, else `debug` when verbose, else `info`.
fn env_filter(verbose: bool) -> Result<EnvFilter> {
    let default_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Failed to create env filter")
}

/// Initializes console logging and, if `log_dir` is given, a rolling file log.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the file
/// appender fails.
pub fn init(log_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(10)
                .filename_prefix("orders-etl")
                .filename_suffix("log")
                .build(dir)
                .context("Failed to create file appender")?;

            Some(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_ansi(false)
                    .with_writer(appender)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose)?)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging initialized, log directory: {}", dir.display());
    }

    Ok(())
}
