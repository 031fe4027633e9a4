//! Command handlers.

use crate::cli::{AnalyzeArgs, Cli, Command};
use crate::config::TerraslopeConfig;
use crate::{CliError, Result};
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use terraslope_analysis::{AnalysisRequest, TerrainAnalysis, TerrainAnalyzer};
use terraslope_dem::{check_zoom, geo_to_tile, FetchConfig, GeoPoint, TileFetcher};
use tracing::info;

/// A coordinate as accepted on the command line: `[lat, lon]` or
/// `{"lat": .., "lon": ..}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointInput {
    Pair([f64; 2]),
    Object(GeoPoint),
}

impl From<PointInput> for GeoPoint {
    fn from(input: PointInput) -> Self {
        match input {
            PointInput::Pair([lat, lon]) => GeoPoint::new(lat, lon),
            PointInput::Object(point) => point,
        }
    }
}

/// Parse a JSON array of coordinates.
pub fn parse_points(json: &str) -> Result<Vec<GeoPoint>> {
    let points: Vec<PointInput> = serde_json::from_str(json)
        .map_err(|e| CliError::Input(format!("expected a JSON array of [lat, lon] pairs: {}", e)))?;
    Ok(points.into_iter().map(GeoPoint::from).collect())
}

/// Read coordinates from inline JSON or from a JSON file.
///
/// Arguments starting with `[` are parsed inline; anything else is a path.
pub fn read_points(arg: &str) -> Result<Vec<GeoPoint>> {
    if arg.trim_start().starts_with('[') {
        return parse_points(arg);
    }

    let path = Path::new(arg);
    let json = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_points(&json)
}

/// Describe the tile and pixel a coordinate falls on.
pub fn tile_report(fetch: &FetchConfig, lat: f64, lon: f64, zoom: Option<u8>) -> Result<String> {
    check_coordinate(lat, lon)?;
    let zoom = check_zoom(zoom.unwrap_or(fetch.zoom))?;
    let tile = geo_to_tile(lat, lon, zoom, fetch.tile_size);
    Ok(format!(
        "tile {} pixel ({}, {}) of {}",
        tile.address, tile.px, tile.py, fetch.tile_size
    ))
}

fn check_coordinate(lat: f64, lon: f64) -> Result<()> {
    if GeoPoint::new(lat, lon).is_valid() {
        Ok(())
    } else {
        Err(CliError::Input(format!("coordinate ({}, {}) out of range", lat, lon)))
    }
}

/// Configuration plus the analyzer built from it.
#[derive(Debug)]
pub struct App {
    config: TerraslopeConfig,
    analyzer: TerrainAnalyzer,
}

impl App {
    /// Build an app whose fetcher uses the configured HTTP sources.
    pub fn new(config: TerraslopeConfig) -> Result<Self> {
        let fetcher = TileFetcher::with_http_sources(config.fetch.clone())
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Build an app around an existing fetcher.
    pub fn with_fetcher(config: TerraslopeConfig, fetcher: Arc<TileFetcher>) -> Self {
        let analyzer = TerrainAnalyzer::new(fetcher, config.analysis.clone());
        Self { config, analyzer }
    }

    /// The effective configuration.
    pub fn config(&self) -> &TerraslopeConfig {
        &self.config
    }

    /// Turn command arguments into an analysis request.
    pub fn request(&self, args: &AnalyzeArgs) -> Result<AnalysisRequest> {
        let polygon = read_points(&args.polygon)?;
        let timeout = match args.timeout {
            Some(0) => return Err(CliError::Input("--timeout must be at least 1 second".into())),
            Some(secs) => Duration::from_secs(secs),
            None => self.config.analysis.timeout(),
        };

        let mut request = AnalysisRequest::new(polygon, args.spacing).with_timeout(timeout);
        if let Some(line) = &args.line {
            request = request.with_cross_section(read_points(line)?);
        }
        if let Some(samples) = args.samples {
            request = request.with_samples(samples);
        }
        Ok(request)
    }

    /// Run an analysis.
    pub fn analyze(&self, args: &AnalyzeArgs) -> Result<TerrainAnalysis> {
        let request = self.request(args)?;
        let analysis = self.analyzer.analyze(&request)?;

        let stats = self.analyzer.fetcher().stats();
        info!(
            tiles = stats.tiles_fetched,
            cache_hits = stats.cache_hits,
            failures = stats.source_failures,
            "Fetch summary"
        );
        Ok(analysis)
    }

    /// Elevation at a coordinate, `None` where no source has data.
    pub fn elevation(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        check_coordinate(lat, lon)?;
        Ok(self.analyzer.fetcher().elevation_at(lat, lon))
    }
}

/// Encode an analysis as JSON and write it to the requested file or `out`.
pub fn write_analysis<W: Write>(analysis: &TerrainAnalysis, args: &AnalyzeArgs, out: &mut W) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(analysis)
    } else {
        serde_json::to_string(analysis)
    }
    .map_err(|e| CliError::Encode(e.to_string()))?;

    match &args.output {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "Analysis written");
        }
        None => writeln!(out, "{}", json)?,
    }
    Ok(())
}

/// Execute a parsed command line, writing command output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = TerraslopeConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Command::Config => {
            write!(out, "{}", config.to_yaml()?)?;
        }
        Command::Tile { lat, lon, zoom } => {
            writeln!(out, "{}", tile_report(&config.fetch, *lat, *lon, *zoom)?)?;
        }
        Command::Elevation { lat, lon } => {
            let app = App::new(config)?;
            match app.elevation(*lat, *lon)? {
                Some(elevation) => writeln!(out, "{:.2} m", elevation)?,
                None => writeln!(out, "no data")?,
            }
        }
        Command::Analyze(args) => {
            let app = App::new(config)?;
            let analysis = app.analyze(args)?;
            write_analysis(&analysis, args, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraslope_dem::DemError;

    #[test]
    fn test_parse_pairs_and_objects() {
        let points = parse_points(r#"[[35.0, 138.5], {"lat": 35.1, "lon": 138.6}]"#).unwrap();
        assert_eq!(points, [GeoPoint::new(35.0, 138.5), GeoPoint::new(35.1, 138.6)]);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for json in ["{}", "[[1.0]]", "[[1.0, 2.0, 3.0]]", "[\"a\"]", "not json"] {
            assert!(matches!(parse_points(json), Err(CliError::Input(_))), "{json}");
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        assert!(matches!(
            read_points("/nonexistent/polygon.json"),
            Err(CliError::Read { .. })
        ));
    }

    #[test]
    fn test_tile_report() {
        let fetch = FetchConfig::default();
        let report = tile_report(&fetch, 0.0, 0.0, Some(1)).unwrap();
        assert_eq!(report, "tile 1/1/1 pixel (0, 0) of 256");

        assert!(matches!(
            tile_report(&fetch, 0.0, 0.0, Some(25)),
            Err(CliError::Elevation(DemError::InvalidZoomLevel(25)))
        ));
        assert!(matches!(
            tile_report(&fetch, 91.0, 0.0, None),
            Err(CliError::Input(_))
        ));
    }
}
