//! Polygon gridding.
//!
//! A polygon is covered with a lattice of sample points at a fixed spacing in
//! meters, anchored at the north-west corner of its bounding box. Degree steps
//! use a spherical earth:
//!
//! ```text
//! Δlat = spacing / R
//! Δlon = spacing / (R · cos(center_lat))
//! ```
//!
//! Only lattice points inside the polygon are kept.

use crate::{AnalysisError, Result};
use serde::Serialize;
use terraslope_dem::{GeoPoint, GridPoint, EARTH_RADIUS_M};

/// Largest lattice dimension; rows and columns are stored as `u32`.
pub const MAX_GRID_DIMENSION: usize = u32::MAX as usize;

/// Minimum number of vertices of a closed ring (a triangle plus the closing
/// vertex).
pub const MIN_POLYGON_VERTICES: usize = 4;

/// Placement of the lattice in geographic space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridFrame {
    /// Latitude of row 0 (the bounding box's northern edge).
    pub origin_lat: f64,
    /// Longitude of column 0 (the bounding box's western edge).
    pub origin_lon: f64,
    /// Lattice spacing in meters.
    pub cell_size_m: f64,
    /// Degrees of latitude between rows.
    pub lat_step: f64,
    /// Degrees of longitude between columns.
    pub lon_step: f64,
}

impl GridFrame {
    /// Build the frame for a spacing anchored at a north-west corner.
    ///
    /// `center_lat` sets the longitude step.
    pub fn new(origin_lat: f64, origin_lon: f64, center_lat: f64, cell_size_m: f64) -> Self {
        let lat_step = (cell_size_m / EARTH_RADIUS_M).to_degrees();
        let lon_step = (cell_size_m / (EARTH_RADIUS_M * center_lat.to_radians().cos())).to_degrees();
        Self {
            origin_lat,
            origin_lon,
            cell_size_m,
            lat_step,
            lon_step,
        }
    }

    /// Geographic position of a lattice cell.
    pub fn position(&self, row: usize, col: usize) -> GeoPoint {
        GeoPoint::new(
            self.origin_lat - row as f64 * self.lat_step,
            self.origin_lon + col as f64 * self.lon_step,
        )
    }

    /// Nearest lattice cell to a coordinate, possibly outside the grid.
    pub fn nearest_cell(&self, lat: f64, lon: f64) -> (i64, i64) {
        let row = ((self.origin_lat - lat) / self.lat_step).round() as i64;
        let col = ((lon - self.origin_lon) / self.lon_step).round() as i64;
        (row, col)
    }
}

/// A generated lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Lattice points inside the polygon, in row-major order.
    pub points: Vec<GridPoint>,
    /// Number of lattice rows.
    pub rows: usize,
    /// Number of lattice columns.
    pub cols: usize,
    /// Lattice placement.
    pub frame: GridFrame,
}

impl Grid {
    /// Total lattice cells, inside the polygon or not.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Check a polygon ring: enough vertices, valid coordinates, closed.
pub fn validate_polygon(polygon: &[GeoPoint]) -> Result<()> {
    if polygon.len() < MIN_POLYGON_VERTICES {
        return Err(AnalysisError::InvalidPolygon(format!(
            "{} vertices, need at least {}",
            polygon.len(),
            MIN_POLYGON_VERTICES
        )));
    }
    if let Some(bad) = polygon.iter().find(|p| !p.is_valid()) {
        return Err(AnalysisError::InvalidCoordinate {
            lat: bad.lat,
            lon: bad.lon,
        });
    }
    if polygon.first() != polygon.last() {
        return Err(AnalysisError::InvalidPolygon(
            "ring is not closed (first vertex must equal last)".into(),
        ));
    }
    Ok(())
}

/// Check a cell spacing in meters.
pub fn validate_spacing(spacing_m: f64) -> Result<()> {
    if spacing_m.is_finite() && spacing_m > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSpacing(spacing_m))
    }
}

/// Even-odd ray casting point-in-polygon test.
///
/// Works for open and closed rings. Points exactly on an edge may fall either
/// way.
pub fn point_in_polygon(lat: f64, lon: f64, polygon: &[GeoPoint]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (yi, xi) = (polygon[i].lat, polygon[i].lon);
        let (yj, xj) = (polygon[j].lat, polygon[j].lon);
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Lattice shape for a polygon without materializing points.
///
/// Returns `(rows, cols, frame)`.
pub fn grid_shape(polygon: &[GeoPoint], spacing_m: f64) -> Result<(usize, usize, GridFrame)> {
    validate_polygon(polygon)?;
    validate_spacing(spacing_m)?;

    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in polygon {
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
        min_lon = min_lon.min(p.lon);
        max_lon = max_lon.max(p.lon);
    }

    let center_lat = (min_lat + max_lat) / 2.0;
    let frame = GridFrame::new(max_lat, min_lon, center_lat, spacing_m);

    let rows = lattice_dimension(max_lat - min_lat, frame.lat_step)
        .ok_or(AnalysisError::InvalidSpacing(spacing_m))?;
    let cols = lattice_dimension(max_lon - min_lon, frame.lon_step)
        .ok_or(AnalysisError::InvalidSpacing(spacing_m))?;

    Ok((rows, cols, frame))
}

/// Number of lattice lines covering `span` degrees, or `None` when the step is
/// too small to represent.
fn lattice_dimension(span: f64, step: f64) -> Option<usize> {
    let lines = (span / step).ceil() + 1.0;
    if lines.is_finite() && lines <= MAX_GRID_DIMENSION as f64 {
        Some(lines as usize)
    } else {
        None
    }
}

/// Generate the lattice points inside a polygon.
///
/// A spacing too large for the polygon may leave no interior points; that is
/// a valid, empty grid.
pub fn generate_grid(polygon: &[GeoPoint], spacing_m: f64) -> Result<Grid> {
    let (rows, cols, frame) = grid_shape(polygon, spacing_m)?;

    let mut points = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let pos = frame.position(row, col);
            if point_in_polygon(pos.lat, pos.lon, polygon) {
                points.push(GridPoint {
                    lat: pos.lat,
                    lon: pos.lon,
                    row: row as u32,
                    col: col as u32,
                });
            }
        }
    }

    Ok(Grid {
        points,
        rows,
        cols,
        frame,
    })
}
