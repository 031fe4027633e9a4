//! Error types for terrain analysis.

use std::time::Duration;
use terraslope_dem::DemError;
use thiserror::Error;

/// Errors that can occur while analyzing a polygon.
///
/// Gaps in elevation coverage are not errors; they show up as `None` cells,
/// omitted slopes and shorter cross-sections.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The polygon ring is unusable.
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    /// The cell spacing is not a positive, finite number of meters, or is
    /// too fine to lay a lattice over the polygon.
    #[error("Invalid cell spacing {0} m (must be positive, finite and coarse enough to grid the polygon)")]
    InvalidSpacing(f64),

    /// A coordinate is non-finite or outside the geographic range.
    #[error("Invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },

    /// The cross-section line or sample count is unusable.
    #[error("Invalid cross-section: {0}")]
    InvalidCrossSection(String),

    /// The grid would exceed the configured point budget.
    #[error("Grid of {points} points exceeds the limit of {limit}")]
    TooManyPoints {
        /// Number of points the grid would contain.
        points: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Elevation resolution exceeded the request's time budget.
    #[error("Elevation resolution exceeded time budget of {0:?}")]
    Timeout(Duration),

    /// Elevation access failed.
    #[error("Elevation error: {0}")]
    Elevation(#[source] DemError),
}

/// Coarse error classes reported at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request was rejected before any computation.
    Validation,
    /// The request ran out of time.
    Timeout,
    /// Something failed that the caller cannot fix.
    Internal,
}

impl ErrorCategory {
    /// Short lowercase name, used as a metric label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AnalysisError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::InvalidPolygon(_)
            | AnalysisError::InvalidSpacing(_)
            | AnalysisError::InvalidCoordinate { .. }
            | AnalysisError::InvalidCrossSection(_)
            | AnalysisError::TooManyPoints { .. } => ErrorCategory::Validation,
            AnalysisError::Timeout(_) => ErrorCategory::Timeout,
            AnalysisError::Elevation(DemError::Timeout(_)) => ErrorCategory::Timeout,
            AnalysisError::Elevation(_) => ErrorCategory::Internal,
        }
    }
}

impl From<DemError> for AnalysisError {
    fn from(err: DemError) -> Self {
        match err {
            DemError::Timeout(budget) => AnalysisError::Timeout(budget),
            other => AnalysisError::Elevation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            AnalysisError::InvalidSpacing(0.0).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AnalysisError::TooManyPoints { points: 10, limit: 5 }.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            AnalysisError::Timeout(Duration::from_secs(1)).category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            AnalysisError::Elevation(DemError::WorkerLost).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_dem_timeout_becomes_timeout() {
        let err: AnalysisError = DemError::Timeout(Duration::from_millis(250)).into();
        assert!(matches!(err, AnalysisError::Timeout(d) if d == Duration::from_millis(250)));
        assert_eq!(err.category().to_string(), "timeout");
    }
}
