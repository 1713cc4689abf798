//! Error types for imlocate.

use thiserror::Error;

/// Result alias for imlocate operations.
pub type LocateResult<T> = std::result::Result<T, LocateError>;

/// Errors surfaced to callers.
///
/// Only structural problems with the inputs are errors. Finding nothing, or
/// not having enough features to try, is reported through empty or absent
/// results instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LocateError {
    /// The search image does not fit inside the source image.
    #[error(
        "search image {search_width}x{search_height} is larger than source image \
         {source_width}x{source_height}"
    )]
    SearchLargerThanSource {
        search_width: usize,
        search_height: usize,
        source_width: usize,
        source_height: usize,
    },
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the dimensions require.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Only 1 (gray) and 3 (RGB) channel images are supported.
    #[error("unsupported channel count {channels}")]
    UnsupportedChannels { channels: usize },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The image path does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },
    /// Decoding failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
}
