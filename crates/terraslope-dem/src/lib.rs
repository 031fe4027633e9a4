//! # terraslope-dem
//!
//! Elevation tile access for terrain analysis.
//!
//! This crate turns geographic coordinates into elevations read from slippy-map
//! raster tiles whose pixels pack one elevation each into 24 bits of RGB.
//!
//! ## Overview
//!
//! ### Tiles and pixels
//!
//! Coordinates map to a Web Mercator tile address and an in-tile pixel with
//! [`geo_to_tile`]. Each pixel decodes to meters with [`decode_pixel`]:
//! - `x = r * 65536 + g * 256 + b`
//! - `x == 2^23` means no data
//! - values below and above `2^23` are positive and two's-complement negative
//!   centimeters
//!
//! ### Sources
//!
//! Tiles come from one or more [`ElevationSource`]s tried in priority order.
//! The default configuration uses the GSI tile services (`dem5a`, `dem5b`,
//! `dem5c`, then the 10 m `dem` product):
//! `https://cyberjapandata.gsi.go.jp/xyz/dem5a_png/{z}/{x}/{y}.png`
//!
//! ### Fetching
//!
//! [`TileFetcher`] resolves batches of points. It keeps a bounded in-memory
//! cache, fetches missing tiles in concurrent chunks and remembers addresses no
//! source could serve.
//!
//! ## Example
//!
//! ```no_run
//! use terraslope_dem::{FetchConfig, GridPoint, TileFetcher};
//!
//! let fetcher = TileFetcher::with_http_sources(FetchConfig::default())?;
//!
//! // Mount Fuji summit
//! let elevation = fetcher.elevation_at(35.3606, 138.7274);
//! println!("Elevation: {:?} meters", elevation);
//!
//! let points = [GridPoint { lat: 35.36, lon: 138.72, row: 0, col: 0 }];
//! for e in fetcher.resolve_elevations(&points) {
//!     println!("({}, {}) -> {:?}", e.point.lat, e.point.lon, e.elevation);
//! }
//! # Ok::<(), terraslope_dem::DemError>(())
//! ```

mod cache;
mod codec;
mod error;
mod fetcher;
mod geo;
mod source;
mod tile;

pub use cache::{CacheEntry, EvictionPolicy, TileCache, DEFAULT_CACHE_CAPACITY};
pub use codec::{
    decode_pixel, encode_elevation, is_plausible_elevation, ELEVATION_RESOLUTION_M,
    MAX_PLAUSIBLE_ELEVATION_M, MIN_PLAUSIBLE_ELEVATION_M, NO_DATA_PIXEL, NO_DATA_VALUE,
};
pub use error::DemError;
pub use fetcher::{FetchConfig, FetchStats, TileFetcher, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_STRIDE};
pub use geo::{haversine_distance, GeoPoint, GridElevation, GridPoint, EARTH_RADIUS_M};
pub use source::{
    default_sources, ElevationSource, HttpClient, HttpTileSource, MemoryTileSource, ReqwestClient,
    SourceConfig,
};
pub use tile::{
    check_zoom, geo_to_tile, TileAddress, TileBuffer, TilePixel, DEFAULT_TILE_SIZE, DEFAULT_ZOOM,
    MAX_ZOOM, MIN_ZOOM,
};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
