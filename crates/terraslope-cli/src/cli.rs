//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Terrain elevation and slope analysis over web elevation tiles.
#[derive(Debug, Parser)]
#[command(name = "terraslope", author, version, about, long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter such as `debug` or `terraslope_dem=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print collected metrics to stderr when the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze slopes inside a polygon
    Analyze(AnalyzeArgs),

    /// Print the elevation at a coordinate
    #[command(allow_negative_numbers = true)]
    Elevation {
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        lon: f64,
    },

    /// Print the tile and pixel a coordinate falls on
    #[command(allow_negative_numbers = true)]
    Tile {
        /// Latitude in degrees
        lat: f64,
        /// Longitude in degrees
        lon: f64,
        /// Zoom level (defaults to the configured zoom)
        #[arg(short, long)]
        zoom: Option<u8>,
    },

    /// Print the effective configuration as YAML
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Closed polygon ring: a JSON file, or inline JSON such as
    /// `[[35.37,138.72],[35.37,138.73],[35.36,138.73],[35.37,138.72]]`
    pub polygon: String,

    /// Cell spacing in meters
    #[arg(short, long, default_value_t = 30.0)]
    pub spacing: f64,

    /// Cross-section line as a JSON file or inline JSON (default: highest to lowest point)
    #[arg(short, long)]
    pub line: Option<String>,

    /// Number of cross-section samples (default from configuration)
    #[arg(long)]
    pub samples: Option<u32>,

    /// Elevation time budget in seconds (default from configuration)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Write the JSON result to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}
