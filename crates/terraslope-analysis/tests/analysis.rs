//! End-to-end analyses over synthetic terrain.
//!
//! Terrain is generated per tile by an in-memory source: a plane that rises
//! towards the south at a fixed height per Mercator pixel row.

use std::sync::Arc;
use terraslope_analysis::{
    AnalysisConfig, AnalysisRequest, Direction8, SlopeClass, TerrainAnalyzer,
};
use terraslope_dem::{
    geo_to_tile, ElevationSource, FetchConfig, GeoPoint, MemoryTileSource, TileBuffer, TileFetcher,
    DEFAULT_TILE_SIZE, DEFAULT_ZOOM,
};

const NORTH: f64 = 35.37;
const SOUTH: f64 = 35.365;
const WEST: f64 = 138.72;
const EAST: f64 = 138.725;

/// Meters of rise per pixel row.
const RISE_PER_ROW: f64 = 0.4;

fn polygon() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(NORTH, WEST),
        GeoPoint::new(NORTH, EAST),
        GeoPoint::new(SOUTH, EAST),
        GeoPoint::new(SOUTH, WEST),
        GeoPoint::new(NORTH, WEST),
    ]
}

fn south_facing_plane() -> Arc<MemoryTileSource> {
    let top = geo_to_tile(NORTH + 0.01, WEST, DEFAULT_ZOOM, DEFAULT_TILE_SIZE);
    let base = (top.address.y * DEFAULT_TILE_SIZE) as i64;

    Arc::new(MemoryTileSource::from_fn("plane", move |address, size| {
        let tile_top = (address.y * size) as i64;
        Some(TileBuffer::from_elevations(size, |_, py| {
            Some(100.0 + RISE_PER_ROW * (tile_top + py as i64 - base) as f64)
        }))
    }))
}

fn analyzer(source: Arc<MemoryTileSource>) -> TerrainAnalyzer {
    let config = FetchConfig {
        sources: Vec::new(),
        ..FetchConfig::default()
    };
    let sources: Vec<Arc<dyn ElevationSource>> = vec![source];
    let fetcher = TileFetcher::new(config, sources).expect("Failed to create fetcher");
    TerrainAnalyzer::new(Arc::new(fetcher), AnalysisConfig::default())
}

#[test]
fn test_inclined_plane() {
    let a = analyzer(south_facing_plane());
    let result = a.analyze(&AnalysisRequest::new(polygon(), 50.0)).unwrap();

    assert!(result.rows > 10 && result.cols > 8);
    assert_eq!(result.resolved_count, result.point_count);
    assert!(!result.slopes.is_empty());

    // About 0.4 m per 3.9 m pixel: roughly 6°
    assert!(result.slopes.iter().all(|s| s.classification == SlopeClass::Gentle));
    assert!(result.stats.mean_slope > 5.0 && result.stats.mean_slope < 7.0);
    assert!(result.slopes.iter().all(|s| s.aspect_direction == Direction8::N));

    let gentle = &result.stats.distribution[1];
    assert_eq!(gentle.class, SlopeClass::Gentle);
    assert_eq!(gentle.percent, 100.0);
    assert!(result.stats.elevation_range > 40.0);
}

#[test]
fn test_auto_cross_section_runs_downhill() {
    let a = analyzer(south_facing_plane());
    let result = a.analyze(&AnalysisRequest::new(polygon(), 50.0)).unwrap();

    assert!(result.auto_cross_section);
    let profile = result.cross_section.expect("Expected an automatic profile");
    assert!(profile.len() > 1);

    let first = profile.first().unwrap();
    let last = profile.last().unwrap();
    assert_eq!(first.distance, 0.0);
    assert_eq!(first.elevation, result.stats.max_elevation);
    assert_eq!(last.elevation, result.stats.min_elevation);
    assert!(first.lat < last.lat);
}

#[test]
fn test_repeated_analysis_uses_cache() {
    let source = south_facing_plane();
    let a = analyzer(Arc::clone(&source));
    let request = AnalysisRequest::new(polygon(), 50.0);

    let first = a.analyze(&request).unwrap();
    let fetched = source.fetch_count();
    assert!(fetched > 0);

    let second = a.analyze(&request).unwrap();
    assert_eq!(source.fetch_count(), fetched);
    assert_eq!(first, second);
    assert!(a.fetcher().stats().cache_hits > 0);
}

#[test]
fn test_result_serializes() {
    let a = analyzer(south_facing_plane());
    let request = AnalysisRequest::new(polygon(), 100.0)
        .with_cross_section(vec![GeoPoint::new(NORTH, WEST), GeoPoint::new(SOUTH, EAST)])
        .with_samples(5);
    let result = a.analyze(&request).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["rows"], result.rows);
    assert_eq!(json["auto_cross_section"], false);
    assert_eq!(json["elevation_matrix"].as_array().unwrap().len(), result.rows);
    assert_eq!(json["stats"]["distribution"][1]["class"], "gentle");
    assert!(json["cross_section"].as_array().unwrap().len() <= 5);
    assert!(json["slopes"][0]["aspect_direction"].is_string());
}
