//! Metrics infrastructure for the terraslope engine.
//!
//! This crate declares every metric emitted by the tile fetcher and the analysis
//! pipeline as a structured [`Metric`] constant, so call sites never spell metric
//! names by hand. It re-exports the `metrics` crate for convenience.
//!
//! Without an installed recorder the `metrics` macros are no-ops, so library code
//! can emit unconditionally. [`metrics_export::InMemoryRecorder`] collects the
//! series in process for summaries and tests.
//!
//! # Example
//!
//! ```rust
//! use terraslope_metrics::{Metric, MetricKind};
//! use metrics::Unit;
//!
//! const TILES: Metric = Metric::counter("terraslope.tiles.fetched")
//!     .with_description("Tiles fetched from a source")
//!     .with_unit(Unit::Count)
//!     .with_labels(&["source"]);
//!
//! assert_eq!(TILES.kind, MetricKind::Counter);
//! metrics::counter!(TILES.name, "source" => "dem5a").increment(1);
//! ```

pub mod metrics_export;

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Use the const constructors to declare metrics at compile time.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "terraslope.cache.hits").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the engine.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Tile Fetching
    // ========================================================================

    /// Tile addresses missing from the cache and looked up in the sources.
    pub const TILE_REQUESTS: Metric = Metric::counter("terraslope.tiles.requests")
        .with_description("Uncached tile addresses looked up in the elevation sources")
        .with_unit(Unit::Count);

    /// Tiles accepted from an elevation source.
    ///
    /// Labels: source
    pub const TILE_FETCHED: Metric = Metric::counter("terraslope.tiles.fetched")
        .with_description("Tiles fetched and accepted from an elevation source")
        .with_unit(Unit::Count)
        .with_labels(&["source"]);

    /// Source attempts that returned an error. Missing and all no-data tiles
    /// are not failures.
    ///
    /// Labels: source, reason
    pub const SOURCE_FAILURES: Metric = Metric::counter("terraslope.tiles.source_failures")
        .with_description("Source attempts that returned an error")
        .with_unit(Unit::Count)
        .with_labels(&["source", "reason"]);

    /// Bytes of encoded tile data received.
    pub const TILE_BYTES: Metric = Metric::counter("terraslope.tiles.bytes")
        .with_description("Encoded tile bytes downloaded")
        .with_unit(Unit::Bytes);

    // ========================================================================
    // Tile Cache
    // ========================================================================

    /// Cache lookups that found an entry (positive or negative).
    pub const CACHE_HITS: Metric = Metric::counter("terraslope.cache.hits")
        .with_description("Tile cache lookups that found an entry")
        .with_unit(Unit::Count);

    /// Cache lookups that required a fetch.
    pub const CACHE_MISSES: Metric = Metric::counter("terraslope.cache.misses")
        .with_description("Tile cache lookups that required a fetch")
        .with_unit(Unit::Count);

    /// Negative entries recorded for addresses no source could serve.
    pub const CACHE_NEGATIVE: Metric = Metric::counter("terraslope.cache.negative_entries")
        .with_description("Tile addresses cached as having no data")
        .with_unit(Unit::Count);

    /// Entries evicted because the cache was full.
    pub const CACHE_EVICTIONS: Metric = Metric::counter("terraslope.cache.evictions")
        .with_description("Tile cache entries evicted at capacity")
        .with_unit(Unit::Count);

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Wall-clock time of a resolution step in milliseconds.
    pub const RESOLVE_TIME: Metric = Metric::histogram("terraslope.resolve.time_ms")
        .with_description("Wall-clock time to resolve grid elevations")
        .with_unit(Unit::Milliseconds);

    /// Completed analysis requests.
    ///
    /// Labels: outcome
    pub const ANALYSES: Metric = Metric::counter("terraslope.analysis.requests")
        .with_description("Analysis requests by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["outcome"]);

    /// Grid points generated per analysis.
    pub const GRID_POINTS: Metric = Metric::histogram("terraslope.analysis.grid_points")
        .with_description("Interior grid points generated per analysis")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &TILE_REQUESTS,
        &TILE_FETCHED,
        &SOURCE_FAILURES,
        &TILE_BYTES,
        &CACHE_HITS,
        &CACHE_MISSES,
        &CACHE_NEGATIVE,
        &CACHE_EVICTIONS,
        &RESOLVE_TIME,
        &ANALYSES,
        &GRID_POINTS,
    ];
}

/// Describes all metrics used by the engine.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
