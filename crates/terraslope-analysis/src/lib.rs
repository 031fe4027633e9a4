//! # terraslope-analysis
//!
//! Slope analysis of geographic polygons over elevation tiles.
//!
//! ## Features
//!
//! - **Gridding**: Rasterize a polygon into a regular lattice of metric spacing
//! - **Slope and aspect**: Centered differences over the four axis neighbors of
//!   each interior cell, with five-way slope classification and eight-way aspect
//! - **Statistics**: Slope moments, elevation range and class distribution
//! - **Cross-sections**: Elevation profiles along a polyline, or automatically
//!   from the highest to the lowest point
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use terraslope_analysis::{AnalysisConfig, AnalysisRequest, TerrainAnalyzer};
//! use terraslope_dem::{FetchConfig, GeoPoint, TileFetcher};
//!
//! let fetcher = Arc::new(TileFetcher::with_http_sources(FetchConfig::default())?);
//! let analyzer = TerrainAnalyzer::new(fetcher, AnalysisConfig::default());
//!
//! let polygon = vec![
//!     GeoPoint::new(35.37, 138.72),
//!     GeoPoint::new(35.37, 138.73),
//!     GeoPoint::new(35.36, 138.73),
//!     GeoPoint::new(35.36, 138.72),
//!     GeoPoint::new(35.37, 138.72),
//! ];
//! let analysis = analyzer.analyze(&AnalysisRequest::new(polygon, 30.0))?;
//! println!("mean slope {:.1}°", analysis.stats.mean_slope);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cross_section;
mod error;
mod grid;
mod matrix;
mod pipeline;
mod slope;
mod stats;

pub use cross_section::{
    extract_cross_section, line_length, CrossSection, CrossSectionPoint,
    DEFAULT_CROSS_SECTION_SAMPLES,
};
pub use error::{AnalysisError, ErrorCategory};
pub use grid::{
    generate_grid, grid_shape, point_in_polygon, validate_polygon, validate_spacing, Grid,
    GridFrame, MIN_POLYGON_VERTICES,
};
pub use matrix::{build_matrix, ElevationMatrix, MatrixCell};
pub use pipeline::{
    validate_line, AnalysisConfig, AnalysisRequest, TerrainAnalysis, TerrainAnalyzer,
    DEFAULT_MAX_POINTS, DEFAULT_TIMEOUT,
};
pub use slope::{calculate_slopes, slope_matrix, CellSlope, Direction8, SlopeClass};
pub use stats::{compute_stats, ClassShare, SlopeStats};

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
