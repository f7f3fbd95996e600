//! Error types for scenematch.

use thiserror::Error;

/// Result alias for scenematch operations.
pub type SceneMatchResult<T> = std::result::Result<T, SceneMatchError>;

/// Errors reported to the caller when inputs or parameters are malformed.
///
/// "No match" is never an error: locators return an empty list instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SceneMatchError {
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row length.
    #[error("invalid stride {stride} for row length {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Pixel layout with a channel count other than 1, 3 or 4.
    #[error("unsupported channel count {channels}")]
    UnsupportedChannels { channels: usize },
    /// Scene and pattern use different channel layouts.
    #[error("channel mismatch: scene has {scene}, pattern has {pattern}")]
    ChannelMismatch { scene: usize, pattern: usize },
    /// A configuration value is out of range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Image decoding or file access failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}
