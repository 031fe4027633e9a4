//! Metrics emitted by the tile fetcher.
//!
//! Installs a process-wide in-memory recorder, so this file holds a single
//! test and runs as its own binary.

use std::sync::Arc;
use terraslope_dem::{
    DemError, ElevationSource, FetchConfig, MemoryTileSource, Result, TileAddress, TileBuffer,
    TileFetcher,
};
use terraslope_metrics::metric_defs;
use terraslope_metrics::metrics_export::InMemoryRecorder;

/// Source whose every request fails.
struct BrokenSource;

impl ElevationSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    fn min_zoom(&self) -> u8 {
        1
    }

    fn max_zoom(&self) -> u8 {
        20
    }

    fn fetch_tile(&self, address: &TileAddress, _tile_size: u32) -> Result<Option<TileBuffer>> {
        Err(DemError::TileDownloadFailed {
            source_name: "broken".into(),
            z: address.z,
            x: address.x,
            y: address.y,
            reason: "HTTP 503".into(),
        })
    }
}

fn center(address: TileAddress) -> (f64, f64) {
    let (min_lat, max_lat, min_lon, max_lon) = address.bounds();
    ((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0)
}

#[test]
fn test_fetcher_metrics() {
    let recorder = Arc::new(InMemoryRecorder::new());
    metrics::set_global_recorder(recorder.clone()).expect("Failed to install recorder");
    terraslope_metrics::describe_metrics();

    let covered = TileAddress::new(15, 29010, 12938);
    let uncovered = TileAddress::new(15, 29011, 12938);
    let terrain = MemoryTileSource::from_fn("terrain", move |address, size| {
        let elevation = (*address == covered).then_some(812.0);
        Some(TileBuffer::from_elevations(size, |_, _| elevation))
    });
    let sources: Vec<Arc<dyn ElevationSource>> = vec![Arc::new(BrokenSource), Arc::new(terrain)];
    let config = FetchConfig {
        zoom: 15,
        sources: Vec::new(),
        ..FetchConfig::default()
    };
    let fetcher = TileFetcher::new(config, sources).unwrap();

    let (lat, lon) = center(covered);
    assert_eq!(fetcher.elevation_at(lat, lon), Some(812.0));
    let (lat, lon) = center(uncovered);
    assert_eq!(fetcher.elevation_at(lat, lon), None);
    // Served from the cache: no further source traffic
    let (lat, lon) = center(covered);
    assert_eq!(fetcher.elevation_at(lat, lon), Some(812.0));

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.counters["terraslope.tiles.fetched{source=terrain}"], 1);
    assert_eq!(snapshot.counter_total(metric_defs::TILE_FETCHED.name), 1);
    assert_eq!(snapshot.counters["terraslope.cache.negative_entries"], 1);
    assert_eq!(snapshot.counters["terraslope.tiles.requests"], 2);
    assert_eq!(snapshot.counters["terraslope.cache.hits"], 1);
    assert_eq!(snapshot.counters["terraslope.cache.misses"], 2);

    // Only errors count as failures; the all no-data tile from `terrain` does not
    assert_eq!(
        snapshot.counters["terraslope.tiles.source_failures{reason=http,source=broken}"],
        2
    );
    assert_eq!(snapshot.counter_total(metric_defs::SOURCE_FAILURES.name), 2);

    assert_eq!(snapshot.histograms[metric_defs::RESOLVE_TIME.name].count, 3);
    assert!(recorder.description(metric_defs::TILE_FETCHED.name).is_some());
}
