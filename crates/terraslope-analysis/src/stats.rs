//! Area statistics over slopes and elevations.

use crate::matrix::ElevationMatrix;
use crate::slope::{CellSlope, SlopeClass};
use serde::Serialize;
use statrs::statistics::Statistics;
use terraslope_dem::is_plausible_elevation;

/// Share of classified cells falling into one slope class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    /// The class.
    pub class: SlopeClass,
    /// Human-readable label.
    pub label: &'static str,
    /// Display color.
    pub color: &'static str,
    /// Number of cells in this class.
    pub count: usize,
    /// Percentage of classified cells, 0 to 100.
    pub percent: f64,
}

/// Aggregate statistics of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlopeStats {
    /// Mean slope in degrees.
    pub mean_slope: f64,
    /// Maximum slope in degrees.
    pub max_slope: f64,
    /// Minimum slope in degrees.
    pub min_slope: f64,
    /// Population standard deviation of slope degrees.
    pub std_slope: f64,
    /// Lowest plausible elevation in meters.
    pub min_elevation: f64,
    /// Highest plausible elevation in meters.
    pub max_elevation: f64,
    /// Mean plausible elevation in meters.
    pub avg_elevation: f64,
    /// `max_elevation - min_elevation`.
    pub elevation_range: f64,
    /// Number of cells with a computed slope.
    pub classified_cells: usize,
    /// Per-class shares in class order; empty when no cell was classified.
    pub distribution: Vec<ClassShare>,
}

/// Summarize slopes and the elevation matrix they came from.
///
/// With no slopes every field is zero and the distribution is empty.
/// Elevation figures only consider cells in the plausible range.
pub fn compute_stats(slopes: &[CellSlope], z: &ElevationMatrix) -> SlopeStats {
    if slopes.is_empty() {
        return SlopeStats::default();
    }

    let degrees: Vec<f64> = slopes.iter().map(|s| s.degrees).collect();
    let elevations: Vec<f64> = z
        .resolved()
        .map(|c| c.elevation)
        .filter(|e| is_plausible_elevation(*e))
        .collect();

    let (min_elevation, max_elevation, avg_elevation) = if elevations.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        (
            Statistics::min(elevations.iter()),
            Statistics::max(elevations.iter()),
            elevations.iter().mean(),
        )
    };

    let total = slopes.len();
    let distribution = SlopeClass::ALL
        .iter()
        .map(|&class| {
            let count = slopes.iter().filter(|s| s.classification == class).count();
            ClassShare {
                class,
                label: class.label(),
                color: class.color(),
                count,
                percent: count as f64 * 100.0 / total as f64,
            }
        })
        .collect();

    SlopeStats {
        mean_slope: degrees.iter().mean(),
        max_slope: Statistics::max(degrees.iter()),
        min_slope: Statistics::min(degrees.iter()),
        std_slope: degrees.iter().population_std_dev(),
        min_elevation,
        max_elevation,
        avg_elevation,
        elevation_range: max_elevation - min_elevation,
        classified_cells: total,
        distribution,
    }
}
