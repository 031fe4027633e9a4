//! Logging and metrics setup for the CLI.
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.
//! The same holds for the `--metrics` summary.

use crate::{CliError, Result};
use std::sync::Arc;
use terraslope_metrics::metrics_export::InMemoryRecorder;
use terraslope_metrics::{describe_metrics, metrics};
use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the log filter.
///
/// An explicit level wins over `RUST_LOG`, which wins over [`DEFAULT_LOG_LEVEL`].
///
/// # Arguments
///
/// * `level` - Filter directive such as `debug` or `terraslope_dem=trace`
pub fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Logging(format!("invalid log level '{}': {}", level, e))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))),
    }
}

/// Install the global subscriber.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Install an in-memory metrics recorder as the global recorder and register
/// every metric description with it.
///
/// Fails if a recorder is already installed in this process.
pub fn install_metrics_recorder() -> Result<Arc<InMemoryRecorder>> {
    let recorder = Arc::new(InMemoryRecorder::new());
    metrics::set_global_recorder(Arc::clone(&recorder))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    describe_metrics();
    Ok(recorder)
}
