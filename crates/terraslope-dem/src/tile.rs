//! Web Mercator tile addressing and decoded tile buffers.
//!
//! Uses the OpenStreetMap Slippy Map tile naming convention:
//! - `z` is the zoom level
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)
//!
//! At zoom level 15 a 256 pixel tile covers roughly 1.2 km at the equator,
//! about 4.8 m per pixel.

use crate::codec::{decode_pixel, encode_elevation};
use crate::{DemError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 1;

/// Maximum valid zoom level.
pub const MAX_ZOOM: u8 = 20;

/// Default zoom level for elevation lookups.
pub const DEFAULT_ZOOM: u8 = 15;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Latitude limit of the Web Mercator projection (arctan(sinh(π))).
const MAX_MERCATOR_LAT: f64 = 85.0511;

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileAddress {
    /// X coordinate (column, 0 at 180°W, increases eastward).
    pub x: u32,
    /// Y coordinate (row, 0 at ~85.05°N, increases southward).
    pub y: u32,
    /// Zoom level.
    pub z: u8,
}

/// A tile address plus the pixel a coordinate falls on inside that tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePixel {
    /// Tile containing the coordinate.
    pub address: TileAddress,
    /// Pixel column inside the tile.
    pub px: u32,
    /// Pixel row inside the tile.
    pub py: u32,
}

/// Validate a zoom level against the supported range.
pub fn check_zoom(zoom: u8) -> Result<u8> {
    if (MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        Ok(zoom)
    } else {
        Err(DemError::InvalidZoomLevel(zoom))
    }
}

/// Map a coordinate to its tile and in-tile pixel.
///
/// Uses the Slippy Map formulas:
/// - x = floor((lon + 180) / 360 * 2^z)
/// - y = floor((1 - asinh(tan(lat)) / π) / 2 * 2^z)
///
/// Latitude is clamped to the Mercator limit, tile indices to `[0, 2^z - 1]`
/// and pixel offsets to `[0, tile_size - 1]`.
pub fn geo_to_tile(lat: f64, lon: f64, zoom: u8, tile_size: u32) -> TilePixel {
    let n = 2f64.powi(zoom as i32);
    let max_index = (n as u32).saturating_sub(1);

    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let fx = (lon + 180.0) / 360.0 * n;
    let fy = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    let x = (fx.floor().max(0.0) as u32).min(max_index);
    let y = (fy.floor().max(0.0) as u32).min(max_index);

    let max_px = tile_size.saturating_sub(1);
    let px = (((fx - x as f64) * tile_size as f64).floor().max(0.0) as u32).min(max_px);
    let py = (((fy - y as f64) * tile_size as f64).floor().max(0.0) as u32).min(max_px);

    TilePixel {
        address: TileAddress { x, y, z: zoom },
        px,
        py,
    }
}

impl TileAddress {
    /// Create a new tile address.
    ///
    /// # Panics
    /// Panics if the zoom exceeds [`MAX_ZOOM`] or the coordinates are out of
    /// range for the zoom level.
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        assert!(z <= MAX_ZOOM, "zoom {} exceeds maximum {}", z, MAX_ZOOM);
        let max_coord = 1u64 << z;
        assert!((x as u64) < max_coord, "x={} out of range for zoom {}", x, z);
        assert!((y as u64) < max_coord, "y={} out of range for zoom {}", y, z);
        Self { x, y, z }
    }

    /// Get the tile containing a coordinate.
    pub fn from_lat_lon(lat: f64, lon: f64, z: u8) -> Result<Self> {
        check_zoom(z)?;
        Ok(geo_to_tile(lat, lon, z, DEFAULT_TILE_SIZE).address)
    }

    /// Get the bounding box for this tile.
    ///
    /// Returns (min_lat, max_lat, min_lon, max_lon).
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let n = 2f64.powi(self.z as i32);

        let min_lon = self.x as f64 / n * 360.0 - 180.0;
        let max_lon = (self.x + 1) as f64 / n * 360.0 - 180.0;

        let max_lat = (PI * (1.0 - 2.0 * self.y as f64 / n)).sinh().atan().to_degrees();
        let min_lat = (PI * (1.0 - 2.0 * (self.y + 1) as f64 / n)).sinh().atan().to_degrees();

        (min_lat, max_lat, min_lon, max_lon)
    }

    /// Expand a URL template containing `{z}`, `{x}` and `{y}`.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A decoded tile: square RGB pixel data in row-major order (north to south,
/// west to east).
#[derive(Clone, PartialEq, Eq)]
pub struct TileBuffer {
    size: u32,
    rgb: Vec<u8>,
}

impl std::fmt::Debug for TileBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileBuffer").field("size", &self.size).finish()
    }
}

impl TileBuffer {
    /// Wrap raw RGB bytes.
    pub fn from_rgb(size: u32, rgb: Vec<u8>) -> Result<Self> {
        let expected = size as usize * size as usize * 3;
        if rgb.len() != expected {
            let pixels = (rgb.len() / 3) as u32;
            return Err(DemError::InvalidTileSize {
                width: size,
                height: pixels / size.max(1),
                expected: size,
            });
        }
        Ok(Self { size, rgb })
    }

    /// Decode an encoded image (PNG) into a tile buffer.
    pub fn decode_image(bytes: &[u8], expected_size: u32) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = image.dimensions();
        if width != expected_size || height != expected_size {
            return Err(DemError::InvalidTileSize {
                width,
                height,
                expected: expected_size,
            });
        }
        Ok(Self {
            size: expected_size,
            rgb: image.into_raw(),
        })
    }

    /// Build a tile by encoding one elevation per pixel.
    pub fn from_elevations<F>(size: u32, mut elevation: F) -> Self
    where
        F: FnMut(u32, u32) -> Option<f64>,
    {
        let mut rgb = Vec::with_capacity(size as usize * size as usize * 3);
        for py in 0..size {
            for px in 0..size {
                rgb.extend_from_slice(&encode_elevation(elevation(px, py)));
            }
        }
        Self { size, rgb }
    }

    /// Tile edge length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw RGB channels of a pixel.
    pub fn pixel(&self, px: u32, py: u32) -> Option<[u8; 3]> {
        if px >= self.size || py >= self.size {
            return None;
        }
        let idx = (py as usize * self.size as usize + px as usize) * 3;
        Some([self.rgb[idx], self.rgb[idx + 1], self.rgb[idx + 2]])
    }

    /// Decoded elevation of a pixel.
    pub fn elevation(&self, px: u32, py: u32) -> Option<f64> {
        let [r, g, b] = self.pixel(px, py)?;
        decode_pixel(r, g, b)
    }

    /// Coarse check for any usable elevation in the tile.
    ///
    /// Samples every `stride`-th pixel on both axes plus the far corner. A tile
    /// with data only between sample points is reported as empty.
    pub fn has_data(&self, stride: u32) -> bool {
        let stride = stride.max(1) as usize;
        let last = self.size.saturating_sub(1);
        (0..self.size)
            .step_by(stride)
            .flat_map(|py| (0..self.size).step_by(stride).map(move |px| (px, py)))
            .chain(std::iter::once((last, last)))
            .any(|(px, py)| self.elevation(px, py).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_address_equator() {
        let tp = geo_to_tile(0.0, 0.0, 12, 256);
        // At zoom 12, x=2048 is the tile just east of the prime meridian
        assert_eq!(tp.address, TileAddress { x: 2048, y: 2048, z: 12 });
        assert_eq!((tp.px, tp.py), (0, 0));
    }

    #[test]
    fn test_known_tile_mount_fuji() {
        // Mount Fuji summit at zoom 15
        let tp = geo_to_tile(35.3606, 138.7274, 15, 256);
        assert_eq!(tp.address.x, 29011);
        assert_eq!(tp.address.y, 12939);
    }

    #[test]
    fn test_tile_roundtrip() {
        let test_points = [
            (35.6812, 139.7671),  // Tokyo
            (47.6062, -122.3321), // Seattle
            (-33.8688, 151.2093), // Sydney
            (51.5074, -0.1278),   // London
            (0.0, 0.0),           // Null Island
        ];

        for (lat, lon) in test_points {
            let coord = TileAddress::from_lat_lon(lat, lon, 15).unwrap();
            let (min_lat, max_lat, min_lon, max_lon) = coord.bounds();

            assert!(
                lat >= min_lat && lat <= max_lat,
                "lat {} not in [{}, {}] for tile {:?}",
                lat,
                min_lat,
                max_lat,
                coord
            );
            assert!(
                lon >= min_lon && lon <= max_lon,
                "lon {} not in [{}, {}] for tile {:?}",
                lon,
                min_lon,
                max_lon,
                coord
            );
        }
    }

    #[test]
    fn test_pixel_offsets_follow_position() {
        let coord = TileAddress::new(15, 29011, 12938);
        let (min_lat, max_lat, min_lon, max_lon) = coord.bounds();

        // Just inside the north-west corner
        let nw = geo_to_tile(max_lat - 1e-7, min_lon + 1e-7, 15, 256);
        assert_eq!(nw.address, coord);
        assert_eq!((nw.px, nw.py), (0, 0));

        // Just inside the south-east corner
        let se = geo_to_tile(min_lat + 1e-7, max_lon - 1e-7, 15, 256);
        assert_eq!(se.address, coord);
        assert_eq!((se.px, se.py), (255, 255));
    }

    #[test]
    fn test_extremes_are_clamped() {
        let tp = geo_to_tile(89.9, 180.0, 3, 256);
        assert_eq!(tp.address, TileAddress { x: 7, y: 0, z: 3 });
        assert!(tp.px <= 255 && tp.py <= 255);

        let tp = geo_to_tile(-89.9, -180.0, 3, 256);
        assert_eq!(tp.address, TileAddress { x: 0, y: 7, z: 3 });
    }

    #[test]
    fn test_tile_url() {
        let coord = TileAddress::new(15, 29011, 12938);
        assert_eq!(
            coord.url("https://cyberjapandata.gsi.go.jp/xyz/dem5a_png/{z}/{x}/{y}.png"),
            "https://cyberjapandata.gsi.go.jp/xyz/dem5a_png/15/29011/12938.png"
        );
        assert_eq!(coord.to_string(), "15/29011/12938");
    }

    #[test]
    fn test_invalid_zoom() {
        assert!(TileAddress::from_lat_lon(0.0, 0.0, 0).is_err());
        assert!(TileAddress::from_lat_lon(0.0, 0.0, 21).is_err());
    }

    #[test]
    #[should_panic(expected = "zoom 64 exceeds maximum 20")]
    fn test_new_rejects_zoom_beyond_shift_width() {
        TileAddress::new(64, 0, 0);
    }

    #[test]
    #[should_panic(expected = "zoom 21 exceeds maximum 20")]
    fn test_new_rejects_zoom_above_max() {
        TileAddress::new(21, 0, 0);
    }

    #[test]
    fn test_buffer_elevation_lookup() {
        let tile = TileBuffer::from_elevations(16, |px, py| Some((px + py * 16) as f64));
        assert_eq!(tile.size(), 16);
        assert_eq!(tile.elevation(3, 2), Some(35.0));
        assert_eq!(tile.elevation(16, 0), None);
    }

    #[test]
    fn test_has_data_sampling() {
        let empty = TileBuffer::from_elevations(256, |_, _| None);
        assert!(!empty.has_data(8));

        // Only the far corner holds data
        let corner = TileBuffer::from_elevations(256, |px, py| {
            (px == 255 && py == 255).then_some(12.0)
        });
        assert!(corner.has_data(8));

        // Data on a sampled lattice point
        let lattice = TileBuffer::from_elevations(256, |px, py| {
            (px == 16 && py == 8).then_some(3.0)
        });
        assert!(lattice.has_data(8));

        // Data only between sample points goes unnoticed
        let missed = TileBuffer::from_elevations(256, |px, py| {
            (px == 3 && py == 5).then_some(3.0)
        });
        assert!(!missed.has_data(8));
    }

    #[test]
    fn test_from_rgb_rejects_wrong_length() {
        assert!(TileBuffer::from_rgb(4, vec![0; 4 * 4 * 3]).is_ok());
        assert!(TileBuffer::from_rgb(4, vec![0; 10]).is_err());
    }
}
