//! # terraslope-cli
//!
//! Library side of the `terraslope` binary: argument definitions, YAML
//! configuration, logging setup and the command handlers.

pub mod cli;
pub mod commands;
pub mod config;
mod error;
pub mod logging;

pub use cli::{AnalyzeArgs, Cli, Command};
pub use commands::{parse_points, read_points, run, tile_report, write_analysis, App};
pub use config::TerraslopeConfig;
pub use error::{CliError, CliErrorKind, Result};
pub use logging::{build_filter, init_logging, install_metrics_recorder, DEFAULT_LOG_LEVEL};
