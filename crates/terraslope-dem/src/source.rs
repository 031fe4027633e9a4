//! Elevation tile sources.
//!
//! A source turns a [`TileAddress`] into a decoded [`TileBuffer`]. The fetcher
//! tries sources in priority order; a source answering `Ok(None)` simply has no
//! tile at that address.

use crate::tile::{check_zoom, TileAddress, TileBuffer};
use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;

/// User-Agent sent with tile requests.
const USER_AGENT: &str = concat!("terraslope/", env!("CARGO_PKG_VERSION"));

/// Per-request HTTP timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for elevation tile providers.
pub trait ElevationSource: Send + Sync {
    /// Returns the source's name for logging and identification.
    fn name(&self) -> &str;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8;

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8;

    /// Checks if this source supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }

    /// Fetch and decode one tile.
    ///
    /// Returns `Ok(None)` when the source has no tile at this address.
    fn fetch_tile(&self, address: &TileAddress, tile_size: u32) -> Result<Option<TileBuffer>>;
}

/// Trait for blocking HTTP GET requests.
///
/// This abstraction allows mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// Returns `Ok(None)` for a 404 response and the body for any success.
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new client with default timeout and User-Agent.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        trace!(url, "HTTP GET");
        let response = self.client.get(url).send()?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DemError::TileDownloadFailed {
                source_name: url.to_string(),
                z: 0,
                x: 0,
                y: 0,
                reason: format!("HTTP {}", status),
            });
        }

        Ok(Some(response.bytes()?.to_vec()))
    }
}

/// Configuration of one HTTP elevation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Short name used in logs and metrics.
    pub name: String,
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url: String,
    /// Minimum supported zoom level.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    /// Maximum supported zoom level.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

fn default_min_zoom() -> u8 {
    1
}

fn default_max_zoom() -> u8 {
    15
}

impl SourceConfig {
    /// Create a source configuration.
    pub fn new(name: impl Into<String>, url: impl Into<String>, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            min_zoom,
            max_zoom,
        }
    }

    /// Check the URL template and zoom range.
    pub fn validate(&self) -> Result<()> {
        if !["{z}", "{x}", "{y}"].iter().all(|p| self.url.contains(p)) {
            return Err(DemError::InvalidUrlTemplate(self.url.clone()));
        }
        check_zoom(self.min_zoom)?;
        check_zoom(self.max_zoom)?;
        Ok(())
    }
}

/// Default GSI elevation tile sources in priority order.
///
/// The 5 m products (laser survey, photogrammetry, then the combined set) are
/// tried first and the nationwide 10 m product last; the 10 m tiles stop at
/// zoom 14 and are skipped at higher zooms.
pub fn default_sources() -> Vec<SourceConfig> {
    const BASE: &str = "https://cyberjapandata.gsi.go.jp/xyz";
    vec![
        SourceConfig::new("dem5a", format!("{BASE}/dem5a_png/{{z}}/{{x}}/{{y}}.png"), 1, 15),
        SourceConfig::new("dem5b", format!("{BASE}/dem5b_png/{{z}}/{{x}}/{{y}}.png"), 1, 15),
        SourceConfig::new("dem5c", format!("{BASE}/dem5c_png/{{z}}/{{x}}/{{y}}.png"), 1, 15),
        SourceConfig::new("dem10b", format!("{BASE}/dem_png/{{z}}/{{x}}/{{y}}.png"), 1, 14),
    ]
}

/// Elevation source backed by an HTTP tile server.
pub struct HttpTileSource<C: HttpClient> {
    config: SourceConfig,
    client: C,
}

impl<C: HttpClient> std::fmt::Debug for HttpTileSource<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTileSource")
            .field("config", &self.config)
            .finish()
    }
}

impl<C: HttpClient> HttpTileSource<C> {
    /// Create a source from a validated configuration.
    pub fn new(config: SourceConfig, client: C) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, client })
    }

    /// The source configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

impl<C: HttpClient> ElevationSource for HttpTileSource<C> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn min_zoom(&self) -> u8 {
        self.config.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.config.max_zoom
    }

    fn fetch_tile(&self, address: &TileAddress, tile_size: u32) -> Result<Option<TileBuffer>> {
        let url = address.url(&self.config.url);
        let bytes = match self.client.get(&url) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(DemError::TileDownloadFailed { reason, .. }) => {
                return Err(DemError::TileDownloadFailed {
                    source_name: self.config.name.clone(),
                    z: address.z,
                    x: address.x,
                    y: address.y,
                    reason,
                })
            }
            Err(e) => return Err(e),
        };

        metrics::counter!(terraslope_metrics::metric_defs::TILE_BYTES.name)
            .increment(bytes.len() as u64);

        TileBuffer::decode_image(&bytes, tile_size).map(Some)
    }
}

type TileGenerator = Box<dyn Fn(&TileAddress, u32) -> Option<TileBuffer> + Send + Sync>;

/// Elevation source serving tiles from memory.
///
/// Holds explicit tiles and, optionally, a generator consulted for any other
/// address. Useful for preloaded data and for exercising the fetcher offline.
pub struct MemoryTileSource {
    name: String,
    tiles: HashMap<TileAddress, TileBuffer>,
    generator: Option<TileGenerator>,
    min_zoom: u8,
    max_zoom: u8,
    fetches: AtomicUsize,
}

impl std::fmt::Debug for MemoryTileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTileSource")
            .field("name", &self.name)
            .field("tiles", &self.tiles.len())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

impl MemoryTileSource {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiles: HashMap::new(),
            generator: None,
            min_zoom: crate::MIN_ZOOM,
            max_zoom: crate::MAX_ZOOM,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Create a source that builds tiles on demand.
    pub fn from_fn<F>(name: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&TileAddress, u32) -> Option<TileBuffer> + Send + Sync + 'static,
    {
        Self {
            generator: Some(Box::new(generator)),
            ..Self::new(name)
        }
    }

    /// Add an explicit tile.
    pub fn with_tile(mut self, address: TileAddress, tile: TileBuffer) -> Self {
        self.tiles.insert(address, tile);
        self
    }

    /// Restrict the zoom levels this source answers for.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Number of `fetch_tile` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl ElevationSource for MemoryTileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    fn fetch_tile(&self, address: &TileAddress, tile_size: u32) -> Result<Option<TileBuffer>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(tile) = self.tiles.get(address) {
            return Ok(Some(tile.clone()));
        }
        Ok(self
            .generator
            .as_ref()
            .and_then(|generate| generate(address, tile_size)))
    }
}
