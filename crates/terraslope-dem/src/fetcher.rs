//! Batched, cached elevation resolution.
//!
//! [`TileFetcher`] maps grid points to tiles, loads every distinct tile once
//! (cache first, then the sources in priority order) and decodes each point's
//! own pixel. Missing tiles are fetched in chunks with one thread per tile; a
//! chunk finishes before the next one starts.
//!
//! The fetcher supports concurrent use through `Arc<TileFetcher>`:
//! - the cache is shared behind a mutex
//! - threads asking for a tile that is already being fetched wait for that
//!   fetch instead of issuing their own
//! - addresses no source could serve are cached as negative entries

use crate::cache::{CacheEntry, EvictionPolicy, TileCache, DEFAULT_CACHE_CAPACITY};
use crate::geo::{GridElevation, GridPoint};
use crate::source::{default_sources, ElevationSource, HttpTileSource, ReqwestClient, SourceConfig};
use crate::tile::{check_zoom, geo_to_tile, TileAddress, TileBuffer, DEFAULT_TILE_SIZE, DEFAULT_ZOOM};
use crate::{DemError, Result};
use crossbeam_channel::RecvTimeoutError;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use terraslope_metrics::metric_defs;
use tracing::{debug, info, trace, warn};

/// Default number of tiles fetched concurrently.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Default pixel stride of the tile data check.
pub const DEFAULT_SAMPLE_STRIDE: u32 = 8;

/// Fetcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Zoom level every point is resolved at.
    pub zoom: u8,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Maximum number of tiles fetched at once.
    pub chunk_size: usize,
    /// Maximum number of cached tiles (positive and negative).
    pub cache_capacity: usize,
    /// Cache eviction policy.
    pub eviction: EvictionPolicy,
    /// Pixel stride used to decide whether a tile holds any data.
    pub sample_stride: u32,
    /// HTTP sources in priority order.
    pub sources: Vec<SourceConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            eviction: EvictionPolicy::default(),
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            sources: default_sources(),
        }
    }
}

impl FetchConfig {
    /// Check the configuration for values the fetcher cannot work with.
    pub fn validate(&self) -> Result<()> {
        check_zoom(self.zoom)?;
        if self.tile_size == 0 {
            return Err(DemError::InvalidTileSize {
                width: 0,
                height: 0,
                expected: self.tile_size,
            });
        }
        for source in &self.sources {
            source.validate()?;
        }
        Ok(())
    }
}

/// Fetch statistics for this fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Tiles accepted from a source.
    pub tiles_fetched: usize,
    /// Individual source requests made.
    pub source_attempts: usize,
    /// Source requests that failed with an error.
    pub source_failures: usize,
    /// Tile lookups served from the cache.
    pub cache_hits: usize,
    /// Tile lookups that required a fetch.
    pub cache_misses: usize,
    /// Addresses cached as having no data.
    pub negative_entries: usize,
}

#[derive(Default)]
struct StatsCounters {
    tiles_fetched: AtomicUsize,
    source_attempts: AtomicUsize,
    source_failures: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    negative_entries: AtomicUsize,
}

impl StatsCounters {
    fn snapshot(&self) -> FetchStats {
        FetchStats {
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            source_attempts: self.source_attempts.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            negative_entries: self.negative_entries.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.tiles_fetched,
            &self.source_attempts,
            &self.source_failures,
            &self.cache_hits,
            &self.cache_misses,
            &self.negative_entries,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Removes an address from the in-flight set and wakes waiters when dropped,
/// including when a source panics mid-fetch.
struct InFlightGuard<'a> {
    fetcher: &'a TileFetcher,
    address: TileAddress,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.fetcher.in_flight.lock().remove(&self.address);
        self.fetcher.fetch_complete.notify_all();
    }
}

/// Cached, deduplicating elevation resolver over prioritized tile sources.
pub struct TileFetcher {
    config: FetchConfig,
    sources: Vec<Arc<dyn ElevationSource>>,
    cache: Mutex<TileCache>,
    /// Addresses currently being fetched by some thread.
    in_flight: Mutex<HashSet<TileAddress>>,
    /// Signalled whenever an in-flight fetch finishes.
    fetch_complete: Condvar,
    stats: StatsCounters,
}

impl std::fmt::Debug for TileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("TileFetcher")
            .field("zoom", &self.config.zoom)
            .field("tile_size", &self.config.tile_size)
            .field("sources", &names)
            .finish()
    }
}

impl TileFetcher {
    /// Create a fetcher over explicit sources, tried in the given order.
    ///
    /// `config.sources` is ignored here; see [`TileFetcher::with_http_sources`].
    pub fn new(config: FetchConfig, sources: Vec<Arc<dyn ElevationSource>>) -> Result<Self> {
        config.validate()?;
        let cache = TileCache::new(config.cache_capacity, config.eviction);
        Ok(Self {
            config,
            sources,
            cache: Mutex::new(cache),
            in_flight: Mutex::new(HashSet::new()),
            fetch_complete: Condvar::new(),
            stats: StatsCounters::default(),
        })
    }

    /// Create a fetcher whose sources are the HTTP sources in `config.sources`.
    pub fn with_http_sources(config: FetchConfig) -> Result<Self> {
        let client = ReqwestClient::new()?;
        let sources = config
            .sources
            .iter()
            .map(|source| {
                HttpTileSource::new(source.clone(), client.clone())
                    .map(|s| Arc::new(s) as Arc<dyn ElevationSource>)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(config, sources)
    }

    /// The active configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Names of the sources in priority order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Statistics since creation or the last reset.
    pub fn stats(&self) -> FetchStats {
        self.stats.snapshot()
    }

    /// Reset fetch statistics.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Number of cached entries, positive and negative.
    pub fn cached_tile_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop every cached tile and negative entry.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
        debug!("Tile cache cleared");
    }

    /// Resolve the elevation of a single coordinate.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Option<f64> {
        let point = GridPoint {
            lat,
            lon,
            row: 0,
            col: 0,
        };
        self.resolve_elevations(&[point])
            .first()
            .and_then(|e| e.elevation)
    }

    /// Resolve elevations for a batch of points.
    ///
    /// The result has one entry per input point, in input order. Points whose
    /// tile no source could provide, or whose own pixel is no data, resolve to
    /// `None`.
    pub fn resolve_elevations(&self, points: &[GridPoint]) -> Vec<GridElevation> {
        let start = Instant::now();
        let zoom = self.config.zoom;
        let tile_size = self.config.tile_size;

        let pixels: Vec<_> = points
            .iter()
            .map(|p| geo_to_tile(p.lat, p.lon, zoom, tile_size))
            .collect();
        let addresses: BTreeSet<TileAddress> = pixels.iter().map(|tp| tp.address).collect();

        let tiles = self.load_tiles(&addresses);

        let elevations: Vec<GridElevation> = points
            .iter()
            .zip(&pixels)
            .map(|(point, tp)| GridElevation {
                point: *point,
                elevation: tiles
                    .get(&tp.address)
                    .and_then(CacheEntry::tile)
                    .and_then(|tile| tile.elevation(tp.px, tp.py)),
            })
            .collect();

        let elapsed = start.elapsed();
        metrics::histogram!(metric_defs::RESOLVE_TIME.name).record(elapsed.as_secs_f64() * 1000.0);
        debug!(
            points = points.len(),
            tiles = addresses.len(),
            resolved = elevations.iter().filter(|e| e.elevation.is_some()).count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Resolved elevations"
        );

        elevations
    }

    /// Resolve elevations on a worker thread, giving up after `timeout`.
    ///
    /// On timeout the worker is left to finish; its tiles still land in the
    /// cache but its result is discarded.
    pub fn resolve_elevations_within(
        self: &Arc<Self>,
        points: &[GridPoint],
        timeout: Duration,
    ) -> Result<Vec<GridElevation>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let fetcher = Arc::clone(self);
        let points = points.to_vec();

        std::thread::Builder::new()
            .name("terraslope-resolve".into())
            .spawn(move || {
                let elevations = fetcher.resolve_elevations(&points);
                // The receiver is gone when the caller already timed out
                let _ = tx.send(elevations);
            })
            .map_err(|_| DemError::WorkerLost)?;

        match rx.recv_timeout(timeout) {
            Ok(elevations) => Ok(elevations),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Elevation resolution timed out");
                Err(DemError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DemError::WorkerLost),
        }
    }

    /// Load every address, from cache where possible, fetching the rest in
    /// chunks.
    fn load_tiles(&self, addresses: &BTreeSet<TileAddress>) -> HashMap<TileAddress, CacheEntry> {
        let mut loaded = HashMap::with_capacity(addresses.len());
        let mut missing = Vec::new();

        {
            let mut cache = self.cache.lock();
            for address in addresses {
                match cache.get(address) {
                    Some(entry) => {
                        loaded.insert(*address, entry);
                    }
                    None => missing.push(*address),
                }
            }
        }

        let hits = loaded.len();
        self.stats.cache_hits.fetch_add(hits, Ordering::Relaxed);
        self.stats.cache_misses.fetch_add(missing.len(), Ordering::Relaxed);
        metrics::counter!(metric_defs::CACHE_HITS.name).increment(hits as u64);
        metrics::counter!(metric_defs::CACHE_MISSES.name).increment(missing.len() as u64);

        if missing.is_empty() {
            return loaded;
        }

        let chunk_size = self.config.chunk_size.max(1);
        info!(
            tiles = missing.len(),
            cached = hits,
            chunks = missing.len().div_ceil(chunk_size),
            "Fetching elevation tiles"
        );

        for chunk in missing.chunks(chunk_size) {
            let results: Vec<(TileAddress, Option<CacheEntry>)> = std::thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|address| (*address, scope.spawn(move || self.fetch_or_wait(address))))
                    .collect();

                handles
                    .into_iter()
                    .map(|(address, handle)| (address, handle.join().ok()))
                    .collect()
            });

            for (address, entry) in results {
                match entry {
                    Some(entry) => {
                        loaded.insert(address, entry);
                    }
                    None => warn!(z = address.z, x = address.x, y = address.y, "Tile fetch thread panicked"),
                }
            }
        }

        loaded
    }

    /// Get a tile from the cache, wait for another thread already fetching it,
    /// or fetch it here.
    fn fetch_or_wait(&self, address: &TileAddress) -> CacheEntry {
        {
            let mut in_flight = self.in_flight.lock();
            loop {
                if let Some(entry) = self.cache.lock().get(address) {
                    return entry;
                }
                if !in_flight.contains(address) {
                    in_flight.insert(*address);
                    break;
                }
                trace!(z = address.z, x = address.x, y = address.y, "Waiting for in-flight fetch");
                self.fetch_complete.wait(&mut in_flight);
            }
        }

        let _guard = InFlightGuard {
            fetcher: self,
            address: *address,
        };

        let entry = match self.fetch_from_sources(address) {
            Some(tile) => {
                self.stats.tiles_fetched.fetch_add(1, Ordering::Relaxed);
                CacheEntry::Tile(Arc::new(tile))
            }
            None => {
                debug!(z = address.z, x = address.x, y = address.y, "No source has data for tile");
                self.stats.negative_entries.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(metric_defs::CACHE_NEGATIVE.name).increment(1);
                CacheEntry::NoData
            }
        };

        self.cache.lock().insert(*address, entry.clone());
        entry
    }

    /// Walk the sources in priority order and return the first tile with data.
    fn fetch_from_sources(&self, address: &TileAddress) -> Option<TileBuffer> {
        metrics::counter!(metric_defs::TILE_REQUESTS.name).increment(1);
        self.sources
            .iter()
            .filter(|source| source.supports_zoom(address.z))
            .find_map(|source| self.try_source(source.as_ref(), address))
    }

    fn try_source(&self, source: &dyn ElevationSource, address: &TileAddress) -> Option<TileBuffer> {
        self.stats.source_attempts.fetch_add(1, Ordering::Relaxed);
        let (z, x, y) = (address.z, address.x, address.y);

        match source.fetch_tile(address, self.config.tile_size) {
            Ok(Some(tile)) if tile.has_data(self.config.sample_stride) => {
                debug!(source = source.name(), z, x, y, "Tile accepted");
                let labels = [("source", source.name().to_string())];
                metrics::counter!(metric_defs::TILE_FETCHED.name, &labels).increment(1);
                Some(tile)
            }
            Ok(Some(_)) => {
                debug!(source = source.name(), z, x, y, "Tile holds no data, trying next source");
                None
            }
            Ok(None) => {
                trace!(source = source.name(), z, x, y, "Tile not found");
                None
            }
            Err(e) => {
                self.stats.source_failures.fetch_add(1, Ordering::Relaxed);
                warn!(source = source.name(), z, x, y, error = %e, "Tile fetch failed, trying next source");
                let labels = [
                    ("source", source.name().to_string()),
                    ("reason", failure_reason(&e).to_string()),
                ];
                metrics::counter!(metric_defs::SOURCE_FAILURES.name, &labels).increment(1);
                None
            }
        }
    }
}

fn failure_reason(error: &DemError) -> &'static str {
    match error {
        DemError::HttpRequest(_) | DemError::TileDownloadFailed { .. } => "http",
        DemError::ImageDecode(_) => "decode",
        DemError::InvalidTileSize { .. } => "size",
        _ => "other",
    }
}
