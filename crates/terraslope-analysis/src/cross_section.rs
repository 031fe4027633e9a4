//! Elevation profiles along polylines.
//!
//! A line is sampled at equal distance steps; every sample is snapped to the
//! nearest matrix cell through the grid frame. Samples on holes or outside the
//! matrix are dropped, so a profile may be shorter than requested.

use crate::grid::GridFrame;
use crate::matrix::ElevationMatrix;
use serde::Serialize;
use std::iter::FusedIterator;
use terraslope_dem::{haversine_distance, GeoPoint};

/// Default number of samples along a cross-section.
pub const DEFAULT_CROSS_SECTION_SAMPLES: u32 = 50;

/// One resolved sample of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossSectionPoint {
    /// Distance from the start of the line in meters.
    pub distance: f64,
    /// Elevation in meters.
    pub elevation: f64,
    /// Sample latitude.
    pub lat: f64,
    /// Sample longitude.
    pub lon: f64,
}

/// Lazy profile over a polyline. Yields each resolved sample once, in order of
/// increasing distance.
#[derive(Debug, Clone)]
pub struct CrossSection<'a> {
    z: &'a ElevationMatrix,
    frame: GridFrame,
    line: &'a [GeoPoint],
    /// Distance from the start to each vertex.
    cumulative: Vec<f64>,
    num_samples: u32,
    next_sample: u32,
    /// Index of the segment the previous sample fell on.
    segment: usize,
}

/// Sample `num_samples` equally spaced points along `line`.
///
/// Lines with fewer than two vertices or a zero sample count produce an
/// empty profile. A single sample sits at the start of the line.
pub fn extract_cross_section<'a>(
    z: &'a ElevationMatrix,
    frame: &GridFrame,
    line: &'a [GeoPoint],
    num_samples: u32,
) -> CrossSection<'a> {
    let mut cumulative = Vec::with_capacity(line.len());
    if line.len() >= 2 {
        cumulative.push(0.0);
        for pair in line.windows(2) {
            let last = cumulative.last().copied().unwrap_or(0.0);
            cumulative.push(last + pair[0].distance_to(&pair[1]));
        }
    }

    CrossSection {
        z,
        frame: *frame,
        line,
        num_samples: if cumulative.is_empty() { 0 } else { num_samples },
        cumulative,
        next_sample: 0,
        segment: 0,
    }
}

impl CrossSection<'_> {
    /// Total length of the line in meters.
    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn sample_distance(&self, index: u32) -> f64 {
        let total = self.total_length();
        match self.num_samples {
            0 | 1 => 0.0,
            n if index + 1 == n => total,
            n => total * index as f64 / (n - 1) as f64,
        }
    }

    /// Interpolated position at a distance along the line.
    fn position_at(&mut self, distance: f64) -> GeoPoint {
        let last_segment = self.line.len() - 2;
        while self.segment < last_segment && self.cumulative[self.segment + 1] < distance {
            self.segment += 1;
        }

        let (a, b) = (self.line[self.segment], self.line[self.segment + 1]);
        let start = self.cumulative[self.segment];
        let length = self.cumulative[self.segment + 1] - start;
        let t = if length > 0.0 {
            ((distance - start) / length).clamp(0.0, 1.0)
        } else {
            0.0
        };

        GeoPoint::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon))
    }
}

impl Iterator for CrossSection<'_> {
    type Item = CrossSectionPoint;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_sample < self.num_samples {
            let distance = self.sample_distance(self.next_sample);
            self.next_sample += 1;

            let pos = self.position_at(distance);
            let (row, col) = self.frame.nearest_cell(pos.lat, pos.lon);
            if let Some(elevation) = self.z.get_signed(row, col) {
                return Some(CrossSectionPoint {
                    distance,
                    elevation,
                    lat: pos.lat,
                    lon: pos.lon,
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.num_samples - self.next_sample) as usize))
    }
}

impl FusedIterator for CrossSection<'_> {}

/// Great-circle length of a polyline in meters.
pub fn line_length(line: &[GeoPoint]) -> f64 {
    line.windows(2)
        .map(|p| haversine_distance(p[0].lat, p[0].lon, p[1].lat, p[1].lon))
        .sum()
}
