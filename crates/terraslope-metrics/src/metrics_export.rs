//! In-memory metrics recorder.
//!
//! [`InMemoryRecorder`] keeps every counter, gauge and histogram in process so a
//! run can print a summary on exit and tests can assert on what was emitted.
//! Series are keyed by metric name plus sorted labels, rendered as
//! `name{key=value,...}`.
//!
//! ```rust
//! use terraslope_metrics::metrics_export::InMemoryRecorder;
//!
//! let recorder = InMemoryRecorder::new();
//! metrics::with_local_recorder(&recorder, || {
//!     metrics::counter!("terraslope.tiles.fetched", "source" => "dem5a").increment(1);
//! });
//!
//! let snapshot = recorder.snapshot();
//! assert_eq!(snapshot.counters["terraslope.tiles.fetched{source=dem5a}"], 1);
//! ```

use metrics::{Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running summary of the values recorded into one histogram series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    /// Number of recorded values.
    pub count: u64,
    /// Sum of recorded values.
    pub sum: f64,
    /// Smallest recorded value.
    pub min: f64,
    /// Largest recorded value.
    pub max: f64,
}

impl Default for HistogramSummary {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl HistogramSummary {
    /// Mean of the recorded values, 0 when nothing was recorded.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

#[derive(Debug, Default)]
struct HistogramCell(Mutex<HistogramSummary>);

impl HistogramFn for HistogramCell {
    fn record(&self, value: f64) {
        self.0.lock().record(value);
    }
}

/// A [`Recorder`] that stores all series in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecorder {
    counters: Mutex<HashMap<Key, Arc<AtomicU64>>>,
    gauges: Mutex<HashMap<Key, Arc<AtomicU64>>>,
    histograms: Mutex<HashMap<Key, Arc<HistogramCell>>>,
    descriptions: Mutex<BTreeMap<String, String>>,
}

impl InMemoryRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Description registered for a metric name, if any.
    pub fn description(&self, name: &str) -> Option<String> {
        self.descriptions.lock().get(name).cloned()
    }

    /// Copy the current value of every series.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .lock()
            .iter()
            .map(|(key, cell)| (series_key(key), cell.load(Ordering::Relaxed)))
            .collect();
        let gauges = self
            .gauges
            .lock()
            .iter()
            .map(|(key, cell)| (series_key(key), f64::from_bits(cell.load(Ordering::Relaxed))))
            .collect();
        let histograms = self
            .histograms
            .lock()
            .iter()
            .map(|(key, cell)| (series_key(key), *cell.0.lock()))
            .collect();

        MetricsSnapshot {
            counters,
            gauges,
            histograms,
        }
    }

    fn describe(&self, key: KeyName, description: SharedString) {
        self.descriptions
            .lock()
            .insert(key.as_str().to_string(), String::from(&*description));
    }
}

impl Recorder for InMemoryRecorder {
    fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_gauge(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_histogram(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let cell = self.counters.lock().entry(key.clone()).or_default().clone();
        Counter::from_arc(cell)
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        let cell = self.gauges.lock().entry(key.clone()).or_default().clone();
        Gauge::from_arc(cell)
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        let cell = self.histograms.lock().entry(key.clone()).or_default().clone();
        Histogram::from_arc(cell)
    }
}

/// Render a key as `name` or `name{key=value,...}` with labels sorted.
pub fn series_key(key: &Key) -> String {
    let mut labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        return key.name().to_string();
    }
    labels.sort();
    format!("{}{{{}}}", key.name(), labels.join(","))
}

/// Point-in-time copy of a recorder's series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// Counter values by series key.
    pub counters: BTreeMap<String, u64>,
    /// Gauge values by series key.
    pub gauges: BTreeMap<String, f64>,
    /// Histogram summaries by series key.
    pub histograms: BTreeMap<String, HistogramSummary>,
}

impl MetricsSnapshot {
    /// Sum of a counter over all of its label sets.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|(series, _)| series_name(series) == name)
            .map(|(_, value)| value)
            .sum()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty() && self.histograms.is_empty()
    }
}

fn series_name(series: &str) -> &str {
    series.split('{').next().unwrap_or(series)
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (series, value) in &self.counters {
            writeln!(f, "counter   {series} {value}")?;
        }
        for (series, value) in &self.gauges {
            writeln!(f, "gauge     {series} {value}")?;
        }
        for (series, h) in &self.histograms {
            writeln!(
                f,
                "histogram {series} count={} mean={:.2} min={:.2} max={:.2}",
                h.count,
                h.mean(),
                h.min,
                h.max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{describe_metrics, metric_defs};

    #[test]
    fn test_counters_by_label_set() {
        let recorder = InMemoryRecorder::new();
        metrics::with_local_recorder(&recorder, || {
            let name = metric_defs::TILE_FETCHED.name;
            metrics::counter!(name, "source" => "dem5a").increment(2);
            metrics::counter!(name, "source" => "dem10b").increment(1);
            metrics::counter!(name, "source" => "dem5a").increment(1);
        });

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.counters["terraslope.tiles.fetched{source=dem5a}"], 3);
        assert_eq!(snapshot.counters["terraslope.tiles.fetched{source=dem10b}"], 1);
        assert_eq!(snapshot.counter_total("terraslope.tiles.fetched"), 4);
        assert_eq!(snapshot.counter_total("terraslope.tiles"), 0);
    }

    #[test]
    fn test_labels_render_sorted() {
        let recorder = InMemoryRecorder::new();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("failures", "source" => "a", "reason" => "http").increment(1);
        });
        assert!(recorder
            .snapshot()
            .counters
            .contains_key("failures{reason=http,source=a}"));
    }

    #[test]
    fn test_gauges_and_histograms() {
        let recorder = InMemoryRecorder::new();
        metrics::with_local_recorder(&recorder, || {
            metrics::gauge!("depth").set(4.5);
            let h = metrics::histogram!(metric_defs::GRID_POINTS.name);
            h.record(10.0);
            h.record(30.0);
        });

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.gauges["depth"], 4.5);
        let points = snapshot.histograms["terraslope.analysis.grid_points"];
        assert_eq!(points.count, 2);
        assert_eq!((points.min, points.max, points.mean()), (10.0, 30.0, 20.0));
        assert!(snapshot.to_string().contains("count=2 mean=20.00"));
    }

    #[test]
    fn test_descriptions_are_kept() {
        let recorder = InMemoryRecorder::new();
        metrics::with_local_recorder(&recorder, describe_metrics);
        assert_eq!(
            recorder.description(metric_defs::CACHE_NEGATIVE.name).as_deref(),
            Some(metric_defs::CACHE_NEGATIVE.description)
        );
        assert!(recorder.snapshot().is_empty());
    }
}
