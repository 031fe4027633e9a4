//! Per-cell slope and aspect.
//!
//! Uses centered finite differences over the four axis neighbors:
//!
//! ```text
//! dz/dy = (north - south) / (2 · cell_size)
//! dz/dx = (east - west)   / (2 · cell_size)
//! g     = sqrt(dzdx² + dzdy²)
//! slope = atan(g)                     (degrees)
//! aspect = atan2(-dzdx, -dzdy)        (degrees, [0, 360), downslope bearing)
//! ```
//!
//! Border cells and cells missing any of the five values are skipped.

use crate::matrix::ElevationMatrix;
use serde::Serialize;

// ============================================================================
// Classification
// ============================================================================

/// Slope class, ordered from flattest to steepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeClass {
    /// Below 3°.
    Flat,
    /// 3° to below 8°.
    Gentle,
    /// 8° to below 15°.
    Moderate,
    /// 15° to below 30°.
    Steep,
    /// 30° and above.
    VerySteep,
}

impl SlopeClass {
    /// Every class in ascending order.
    pub const ALL: [SlopeClass; 5] = [
        SlopeClass::Flat,
        SlopeClass::Gentle,
        SlopeClass::Moderate,
        SlopeClass::Steep,
        SlopeClass::VerySteep,
    ];

    /// Classify a slope in degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        if degrees < 3.0 {
            SlopeClass::Flat
        } else if degrees < 8.0 {
            SlopeClass::Gentle
        } else if degrees < 15.0 {
            SlopeClass::Moderate
        } else if degrees < 30.0 {
            SlopeClass::Steep
        } else {
            SlopeClass::VerySteep
        }
    }

    /// Human-readable label.
    pub const fn label(&self) -> &'static str {
        match self {
            SlopeClass::Flat => "Flat (0-3°)",
            SlopeClass::Gentle => "Gentle (3-8°)",
            SlopeClass::Moderate => "Moderate (8-15°)",
            SlopeClass::Steep => "Steep (15-30°)",
            SlopeClass::VerySteep => "Very steep (30°+)",
        }
    }

    /// Display color as a hex string.
    pub const fn color(&self) -> &'static str {
        match self {
            SlopeClass::Flat => "#2ecc71",
            SlopeClass::Gentle => "#a3d977",
            SlopeClass::Moderate => "#f1c40f",
            SlopeClass::Steep => "#e67e22",
            SlopeClass::VerySteep => "#e74c3c",
        }
    }
}

/// Eight-point compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction8 {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction8 {
    const CLOCKWISE: [Direction8; 8] = [
        Direction8::N,
        Direction8::NE,
        Direction8::E,
        Direction8::SE,
        Direction8::S,
        Direction8::SW,
        Direction8::W,
        Direction8::NW,
    ];

    /// Nearest direction to a bearing in degrees.
    pub fn from_bearing(degrees: f64) -> Self {
        let sector = (degrees / 45.0).round().rem_euclid(8.0) as usize;
        Self::CLOCKWISE[sector % 8]
    }

    /// Short code ("N", "NE", ...).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction8::N => "N",
            Direction8::NE => "NE",
            Direction8::E => "E",
            Direction8::SE => "SE",
            Direction8::S => "S",
            Direction8::SW => "SW",
            Direction8::W => "W",
            Direction8::NW => "NW",
        }
    }
}

impl std::fmt::Display for Direction8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Slope computation
// ============================================================================

/// Slope and aspect of one interior cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellSlope {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
    /// Slope angle in degrees.
    pub degrees: f64,
    /// Slope as rise over run, in percent.
    pub percent: f64,
    /// Downslope bearing in degrees, `[0, 360)`.
    pub aspect_degrees: f64,
    /// Downslope bearing as a compass direction.
    pub aspect_direction: Direction8,
    /// Slope class.
    pub classification: SlopeClass,
}

/// Compute slope and aspect for every interior cell with four neighbors.
///
/// # Arguments
///
/// * `z` - Elevation matrix
/// * `cell_size_m` - Distance between adjacent cells in meters
pub fn calculate_slopes(z: &ElevationMatrix, cell_size_m: f64) -> Vec<CellSlope> {
    let (rows, cols) = (z.rows(), z.cols());
    if rows < 3 || cols < 3 {
        return Vec::new();
    }

    let mut slopes = Vec::new();
    for row in 1..rows - 1 {
        for col in 1..cols - 1 {
            let neighbors = (
                z.get(row, col),
                z.get(row - 1, col),
                z.get(row + 1, col),
                z.get(row, col + 1),
                z.get(row, col - 1),
            );
            let (Some(_), Some(north), Some(south), Some(east), Some(west)) = neighbors else {
                continue;
            };
            slopes.push(cell_slope(row, col, north, south, east, west, cell_size_m));
        }
    }
    slopes
}

fn cell_slope(
    row: usize,
    col: usize,
    north: f64,
    south: f64,
    east: f64,
    west: f64,
    cell_size_m: f64,
) -> CellSlope {
    let dzdy = (north - south) / (2.0 * cell_size_m);
    let dzdx = (east - west) / (2.0 * cell_size_m);
    let gradient = dzdx.hypot(dzdy);

    let degrees = gradient.atan().to_degrees();
    let aspect_degrees = (-dzdx).atan2(-dzdy).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    let aspect_degrees = if aspect_degrees >= 360.0 { 0.0 } else { aspect_degrees };

    CellSlope {
        row,
        col,
        degrees,
        percent: gradient * 100.0,
        aspect_degrees,
        aspect_direction: Direction8::from_bearing(aspect_degrees),
        classification: SlopeClass::from_degrees(degrees),
    }
}

/// Slope degrees laid out as a `rows × cols` matrix, `None` where no slope was
/// computed.
pub fn slope_matrix(slopes: &[CellSlope], rows: usize, cols: usize) -> Vec<Vec<Option<f64>>> {
    let mut matrix = vec![vec![None; cols]; rows];
    for s in slopes {
        if let Some(cell) = matrix.get_mut(s.row).and_then(|r| r.get_mut(s.col)) {
            *cell = Some(s.degrees);
        }
    }
    matrix
}
