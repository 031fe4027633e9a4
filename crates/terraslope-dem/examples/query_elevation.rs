//! Example: Query elevation from the GSI tile services.
//!
//! Usage: cargo run --example query_elevation -- <lat> <lon> [zoom]

use std::env;
use std::time::Instant;
use terraslope_dem::{geo_to_tile, FetchConfig, TileFetcher, DEFAULT_ZOOM};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [zoom]", args[0]);
        eprintln!("Example: {} 35.3606 138.7274 15", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");
    let zoom: u8 = args
        .get(3)
        .map(|s| s.parse().expect("Invalid zoom"))
        .unwrap_or(DEFAULT_ZOOM);

    let config = FetchConfig {
        zoom,
        ..FetchConfig::default()
    };
    let tile_size = config.tile_size;
    let fetcher = TileFetcher::with_http_sources(config).expect("Failed to create fetcher");

    let tp = geo_to_tile(lat, lon, zoom, tile_size);
    println!("Tile {} pixel ({}, {})", tp.address, tp.px, tp.py);
    println!("Sources: {}", fetcher.source_names().join(", "));

    println!("\nQuerying elevation at ({}, {})...", lat, lon);
    let query_start = Instant::now();
    match fetcher.elevation_at(lat, lon) {
        Some(elevation) => println!(
            "Elevation: {:.2} meters (fetched in {:.2}s)",
            elevation,
            query_start.elapsed().as_secs_f64()
        ),
        None => println!("No elevation data at this location"),
    }

    // Second query should be fast (tile already cached)
    let query_start = Instant::now();
    let again = fetcher.elevation_at(lat, lon);
    println!(
        "Elevation (cached): {:?} ({:.6}s)",
        again,
        query_start.elapsed().as_secs_f64()
    );

    let stats = fetcher.stats();
    println!(
        "\nTiles fetched: {}, cache hits: {}, no-data tiles: {}",
        stats.tiles_fetched, stats.cache_hits, stats.negative_entries
    );
}
