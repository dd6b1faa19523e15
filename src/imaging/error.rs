//! Error taxonomy for the image pipeline.
//!
//! Each variant is terminal for the run that raised it. The session wraps
//! these in [`CompressionFailed`](crate::session::CompressionFailed) before
//! they reach a caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    /// The declared media type is not `image/*`.
    #[error("Unsupported input: {media_type} is not an image type")]
    UnsupportedInput { media_type: String },

    /// The input is larger than the configured ceiling.
    #[error("Input too large: {size} bytes exceeds the {limit} byte limit")]
    OversizeInput { size: u64, limit: u64 },

    /// Bytes passed the media-type check but could not be parsed.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid max width: {0} (must be at least 1)")]
    InvalidDimension(u32),

    #[error("Invalid quality: {0} (must be within 0.0..=1.0)")]
    InvalidQuality(f32),

    #[error("Failed to encode {format}: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },
}
