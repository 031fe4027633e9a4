//! End-to-end analysis of one polygon.
//!
//! [`TerrainAnalyzer`] validates a request, grids the polygon, resolves
//! elevations through a shared [`TileFetcher`] within the request's time
//! budget, then derives slopes, statistics and a cross-section.

use crate::cross_section::{extract_cross_section, CrossSectionPoint, DEFAULT_CROSS_SECTION_SAMPLES};
use crate::grid::{generate_grid, grid_shape, GridFrame};
use crate::matrix::{build_matrix, ElevationMatrix};
use crate::slope::{calculate_slopes, slope_matrix, CellSlope};
use crate::stats::{compute_stats, SlopeStats};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use terraslope_dem::{GeoPoint, TileFetcher};
use terraslope_metrics::metric_defs;
use tracing::{debug, info, warn};

/// Default maximum number of lattice cells per request.
pub const DEFAULT_MAX_POINTS: usize = 250_000;

/// Default time budget for elevation resolution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Analysis policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Maximum lattice size (`rows × cols`) accepted for one request.
    pub max_points: usize,
    /// Cross-section samples when the request does not say.
    pub cross_section_samples: u32,
    /// Default resolution time budget in seconds.
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            cross_section_samples: DEFAULT_CROSS_SECTION_SAMPLES,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl AnalysisConfig {
    /// The default time budget as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Closed polygon ring.
    pub polygon: Vec<GeoPoint>,
    /// Cell spacing in meters.
    pub spacing_m: f64,
    /// Explicit cross-section line; without one an automatic line is used.
    pub cross_section: Option<Vec<GeoPoint>>,
    /// Cross-section sample count; falls back to the analyzer's default.
    pub cross_section_samples: Option<u32>,
    /// Time budget for elevation resolution.
    pub timeout: Duration,
}

impl AnalysisRequest {
    /// Request with no cross-section line and the default time budget.
    pub fn new(polygon: Vec<GeoPoint>, spacing_m: f64) -> Self {
        Self {
            polygon,
            spacing_m,
            cross_section: None,
            cross_section_samples: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set an explicit cross-section line.
    pub fn with_cross_section(mut self, line: Vec<GeoPoint>) -> Self {
        self.cross_section = Some(line);
        self
    }

    /// Set the cross-section sample count.
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.cross_section_samples = Some(samples);
        self
    }

    /// Set the time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainAnalysis {
    /// Lattice rows.
    pub rows: usize,
    /// Lattice columns.
    pub cols: usize,
    /// Latitude of row 0.
    pub origin_lat: f64,
    /// Longitude of column 0.
    pub origin_lon: f64,
    /// Cell spacing in meters.
    pub cell_size_m: f64,
    /// Lattice points inside the polygon.
    pub point_count: usize,
    /// Points with a resolved elevation.
    pub resolved_count: usize,
    /// Elevations, `rows × cols`.
    pub elevation_matrix: ElevationMatrix,
    /// Slope degrees, `rows × cols`.
    pub slope_matrix: Vec<Vec<Option<f64>>>,
    /// Per-cell slopes.
    pub slopes: Vec<CellSlope>,
    /// Aggregate statistics.
    pub stats: SlopeStats,
    /// Elevation profile, if one could be drawn.
    pub cross_section: Option<Vec<CrossSectionPoint>>,
    /// Whether the profile runs from the highest to the lowest cell rather
    /// than along a requested line.
    pub auto_cross_section: bool,
}

/// Runs analyses against a shared tile fetcher.
#[derive(Debug, Clone)]
pub struct TerrainAnalyzer {
    fetcher: Arc<TileFetcher>,
    config: AnalysisConfig,
}

impl TerrainAnalyzer {
    /// Create an analyzer.
    pub fn new(fetcher: Arc<TileFetcher>, config: AnalysisConfig) -> Self {
        Self { fetcher, config }
    }

    /// The shared fetcher.
    pub fn fetcher(&self) -> &Arc<TileFetcher> {
        &self.fetcher
    }

    /// The analysis policy.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a polygon.
    ///
    /// Validation failures are reported before any tile is fetched. Missing
    /// elevation data is not an error.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<TerrainAnalysis> {
        let start = Instant::now();
        let result = self.run(request);

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.category().as_str(),
        };
        let labels = [("outcome", outcome.to_string())];
        metrics::counter!(metric_defs::ANALYSES.name, &labels).increment(1);

        match &result {
            Ok(analysis) => info!(
                rows = analysis.rows,
                cols = analysis.cols,
                points = analysis.point_count,
                resolved = analysis.resolved_count,
                slopes = analysis.slopes.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Analysis complete"
            ),
            Err(e) => warn!(category = %e.category(), error = %e, "Analysis failed"),
        }

        result
    }

    fn run(&self, request: &AnalysisRequest) -> Result<TerrainAnalysis> {
        let samples = request
            .cross_section_samples
            .unwrap_or(self.config.cross_section_samples);
        if let Some(line) = &request.cross_section {
            validate_line(line)?;
        }
        if samples == 0 {
            return Err(AnalysisError::InvalidCrossSection(
                "sample count must be at least 1".into(),
            ));
        }

        let (rows, cols, _) = grid_shape(&request.polygon, request.spacing_m)?;
        let cells = rows.saturating_mul(cols);
        if cells > self.config.max_points {
            return Err(AnalysisError::TooManyPoints {
                points: cells,
                limit: self.config.max_points,
            });
        }

        let grid = generate_grid(&request.polygon, request.spacing_m)?;
        metrics::histogram!(metric_defs::GRID_POINTS.name).record(grid.points.len() as f64);
        debug!(rows, cols, points = grid.points.len(), "Grid generated");

        let elevations = if grid.points.is_empty() {
            Vec::new()
        } else {
            self.fetcher
                .resolve_elevations_within(&grid.points, request.timeout)?
        };

        let matrix = build_matrix(&elevations, rows, cols);
        let slopes = calculate_slopes(&matrix, grid.frame.cell_size_m);
        let stats = compute_stats(&slopes, &matrix);

        let (cross_section, auto_cross_section) = match &request.cross_section {
            Some(line) => (
                Some(extract_cross_section(&matrix, &grid.frame, line, samples).collect()),
                false,
            ),
            None => match auto_line(&matrix, &grid.frame) {
                Some(line) => (
                    Some(extract_cross_section(&matrix, &grid.frame, &line, samples).collect()),
                    true,
                ),
                None => (None, false),
            },
        };

        Ok(TerrainAnalysis {
            rows,
            cols,
            origin_lat: grid.frame.origin_lat,
            origin_lon: grid.frame.origin_lon,
            cell_size_m: grid.frame.cell_size_m,
            point_count: grid.points.len(),
            resolved_count: elevations.iter().filter(|e| e.elevation.is_some()).count(),
            slope_matrix: slope_matrix(&slopes, rows, cols),
            elevation_matrix: matrix,
            slopes,
            stats,
            cross_section,
            auto_cross_section,
        })
    }
}

/// Check an explicit cross-section line.
pub fn validate_line(line: &[GeoPoint]) -> Result<()> {
    if line.len() < 2 {
        return Err(AnalysisError::InvalidCrossSection(format!(
            "{} points, need at least 2",
            line.len()
        )));
    }
    match line.iter().find(|p| !p.is_valid()) {
        Some(bad) => Err(AnalysisError::InvalidCoordinate {
            lat: bad.lat,
            lon: bad.lon,
        }),
        None => Ok(()),
    }
}

/// Line from the highest to the lowest resolved cell, when they differ.
fn auto_line(matrix: &ElevationMatrix, frame: &GridFrame) -> Option<Vec<GeoPoint>> {
    let (high, low) = matrix.extremes()?;
    if (high.row, high.col) == (low.row, low.col) {
        return None;
    }
    Some(vec![
        frame.position(high.row, high.col),
        frame.position(low.row, low.col),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use terraslope_dem::{ElevationSource, FetchConfig, MemoryTileSource, TileBuffer};

    fn square() -> Vec<GeoPoint> {
        [
            (35.37, 138.72),
            (35.37, 138.725),
            (35.365, 138.725),
            (35.365, 138.72),
            (35.37, 138.72),
        ]
        .iter()
        .map(|&(lat, lon)| GeoPoint::new(lat, lon))
        .collect()
    }

    fn analyzer(source: MemoryTileSource) -> TerrainAnalyzer {
        let config = FetchConfig {
            sources: Vec::new(),
            ..FetchConfig::default()
        };
        let sources: Vec<Arc<dyn ElevationSource>> = vec![Arc::new(source)];
        let fetcher = TileFetcher::new(config, sources).unwrap();
        TerrainAnalyzer::new(Arc::new(fetcher), AnalysisConfig::default())
    }

    fn flat(elevation: f64) -> MemoryTileSource {
        MemoryTileSource::from_fn("flat", move |_, size| {
            Some(TileBuffer::from_elevations(size, |_, _| Some(elevation)))
        })
    }

    #[test]
    fn test_flat_area() {
        let a = analyzer(flat(250.0));
        let result = a.analyze(&AnalysisRequest::new(square(), 50.0)).unwrap();

        assert_eq!(result.elevation_matrix.rows(), result.rows);
        assert_eq!(result.elevation_matrix.cols(), result.cols);
        assert_eq!(result.slope_matrix.len(), result.rows);
        assert_eq!(result.resolved_count, result.point_count);
        assert!(!result.slopes.is_empty());
        assert_eq!(result.stats.distribution[0].percent, 100.0);
        assert_eq!(result.stats.max_elevation, 250.0);
        // Every cell is equally high: no automatic profile
        assert!(result.cross_section.is_none());
        assert!(!result.auto_cross_section);
    }

    #[test]
    fn test_no_data_area_succeeds_with_gaps() {
        let a = analyzer(MemoryTileSource::new("empty"));
        let result = a.analyze(&AnalysisRequest::new(square(), 50.0)).unwrap();

        assert!(result.point_count > 0);
        assert_eq!(result.resolved_count, 0);
        assert!(result.slopes.is_empty());
        assert_eq!(result.stats, SlopeStats::default());
        assert!(result.cross_section.is_none());
    }

    #[test]
    fn test_explicit_cross_section() {
        let a = analyzer(flat(12.0));
        let line = vec![GeoPoint::new(35.369, 138.721), GeoPoint::new(35.366, 138.724)];
        let request = AnalysisRequest::new(square(), 50.0)
            .with_cross_section(line)
            .with_samples(10);
        let result = a.analyze(&request).unwrap();

        let profile = result.cross_section.unwrap();
        assert_eq!(profile.len(), 10);
        assert!(profile.iter().all(|p| p.elevation == 12.0));
        assert!(!result.auto_cross_section);
    }

    #[test]
    fn test_validation_errors() {
        let a = analyzer(flat(1.0));

        let mut open = square();
        open.pop();
        let err = a.analyze(&AnalysisRequest::new(open, 50.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPolygon(_)));

        let err = a.analyze(&AnalysisRequest::new(square(), 0.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSpacing(_)));

        let request = AnalysisRequest::new(square(), 50.0).with_cross_section(vec![GeoPoint::new(35.0, 138.0)]);
        let err = a.analyze(&request).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCrossSection(_)));
        assert_eq!(err.category(), ErrorCategory::Validation);

        let request = AnalysisRequest::new(square(), 50.0).with_samples(0);
        assert!(matches!(
            a.analyze(&request),
            Err(AnalysisError::InvalidCrossSection(_))
        ));
    }

    #[test]
    fn test_point_limit_checked_before_fetch() {
        let source = Arc::new(flat(1.0));
        let config = FetchConfig {
            sources: Vec::new(),
            ..FetchConfig::default()
        };
        let fetcher = TileFetcher::new(config, vec![source.clone() as Arc<dyn ElevationSource>]).unwrap();
        let a = TerrainAnalyzer::new(
            Arc::new(fetcher),
            AnalysisConfig {
                max_points: 10,
                ..AnalysisConfig::default()
            },
        );

        let err = a.analyze(&AnalysisRequest::new(square(), 50.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::TooManyPoints { limit: 10, .. }));
        assert_eq!(source.fetch_count(), 0);
    }

    #[test]
    fn test_degenerate_spacing_is_a_validation_error() {
        let a = analyzer(flat(1.0));

        let err = a.analyze(&AnalysisRequest::new(square(), 1e-300)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSpacing(_)));
        assert_eq!(err.category(), ErrorCategory::Validation);

        // Representable but enormous lattices hit the point limit instead
        let err = a.analyze(&AnalysisRequest::new(square(), 0.001)).unwrap_err();
        assert!(matches!(err, AnalysisError::TooManyPoints { .. }));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_timeout_is_reported() {
        let slow = MemoryTileSource::from_fn("slow", |_, size| {
            std::thread::sleep(Duration::from_millis(500));
            Some(TileBuffer::from_elevations(size, |_, _| Some(1.0)))
        });
        let a = analyzer(slow);
        let request = AnalysisRequest::new(square(), 50.0).with_timeout(Duration::from_millis(10));

        let err = a.analyze(&request).unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout(_)));
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn test_empty_grid_skips_fetch() {
        let source = Arc::new(flat(1.0));
        let config = FetchConfig {
            sources: Vec::new(),
            ..FetchConfig::default()
        };
        let fetcher = TileFetcher::new(config, vec![source.clone() as Arc<dyn ElevationSource>]).unwrap();
        let a = TerrainAnalyzer::new(Arc::new(fetcher), AnalysisConfig::default());

        let tiny: Vec<_> = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001), (0.001, 0.0), (0.0, 0.0)]
            .iter()
            .map(|&(lat, lon)| GeoPoint::new(lat, lon))
            .collect();
        let result = a.analyze(&AnalysisRequest::new(tiny, 1000.0)).unwrap();

        assert_eq!(result.point_count, 0);
        assert_eq!((result.rows, result.cols), (2, 2));
        assert_eq!(source.fetch_count(), 0);
    }
}
