//! Error types for the DEM crate.

use thiserror::Error;

/// Errors that can occur when fetching or decoding elevation tiles.
///
/// Missing elevation data is never an error: unresolved points come back as
/// `None`. These variants cover transport failures, malformed tiles and the
/// resolution time budget.
#[derive(Debug, Error)]
pub enum DemError {
    /// HTTP request error when fetching tiles.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Failed to download tile from a remote server.
    #[error("Failed to download tile z={z} x={x} y={y} from {source_name}: {reason}")]
    TileDownloadFailed {
        /// Name of the elevation source.
        source_name: String,
        /// Zoom level.
        z: u8,
        /// X tile coordinate.
        x: u32,
        /// Y tile coordinate.
        y: u32,
        /// Reason for failure.
        reason: String,
    },

    /// The tile payload could not be decoded as an image.
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The decoded tile does not have the expected dimensions.
    #[error("Tile is {width}x{height} pixels, expected {expected}x{expected}")]
    InvalidTileSize {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
        /// Configured tile size.
        expected: u32,
    },

    /// Invalid zoom level.
    #[error("Invalid zoom level {0} (must be {min}-{max})", min = crate::MIN_ZOOM, max = crate::MAX_ZOOM)]
    InvalidZoomLevel(u8),

    /// A source URL template is missing one of its placeholders.
    #[error("URL template '{0}' must contain {{z}}, {{x}} and {{y}}")]
    InvalidUrlTemplate(String),

    /// Elevation resolution did not finish within the caller's time budget.
    #[error("Elevation resolution exceeded time budget of {0:?}")]
    Timeout(std::time::Duration),

    /// The resolution worker stopped without reporting a result.
    #[error("Elevation resolution worker terminated unexpectedly")]
    WorkerLost,
}
