//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they check
//! the input, plan dimensions, map quality and call the backend. They are
//! synchronous; the [`session`](crate::session) moves them off the async
//! runtime.

use super::backend::{Dimensions, ImageBackend};
use super::calculations::plan_dimensions;
use super::error::ImagingError;
use super::params::{EncodeParams, OutputFormat, effective_quality};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Default input ceiling: 10 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Returns true for `image/*` media types, ignoring case and parameters.
pub fn is_image_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    essence
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
        && essence.len() > 6
}

/// Reject inputs before any decoding: wrong media type, then size.
pub fn check_input(media_type: &str, size: u64, max_bytes: u64) -> Result<()> {
    if !is_image_media_type(media_type) {
        return Err(ImagingError::UnsupportedInput {
            media_type: media_type.to_string(),
        });
    }
    if size > max_bytes {
        return Err(ImagingError::OversizeInput {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Check and fully decode a user-supplied input, returning its natural size.
///
/// A full decode (not a header probe) so truncated or corrupt bodies fail
/// here with [`ImagingError::Decode`] rather than during a later run.
pub fn decode_source(
    backend: &impl ImageBackend,
    data: &[u8],
    media_type: &str,
    max_bytes: u64,
) -> Result<Dimensions> {
    check_input(media_type, data.len() as u64, max_bytes)?;
    let surface = backend.decode(data)?;
    let dims = backend.dimensions(&surface);
    debug!(
        media_type,
        bytes = data.len(),
        width = dims.width,
        height = dims.height,
        "decoded source"
    );
    Ok(dims)
}

/// Bytes produced by one compression, with what they were encoded as.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Plan an encode without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_encode(
    natural: Dimensions,
    format: OutputFormat,
    quality: f32,
    max_width: u32,
) -> Result<EncodeParams> {
    let quality = effective_quality(format, quality)?;
    let (width, height) = plan_dimensions(natural.as_tuple(), max_width)?;
    Ok(EncodeParams {
        width,
        height,
        format,
        quality,
    })
}

/// Decode → plan → render → encode.
///
/// When the plan keeps the natural dimensions the decoded surface is
/// encoded directly, without a render pass.
pub fn compress_image<B: ImageBackend>(
    backend: &B,
    data: &[u8],
    format: OutputFormat,
    quality: f32,
    max_width: u32,
) -> Result<Encoded> {
    // Fail on bad settings before paying for a decode
    effective_quality(format, quality)?;
    if max_width == 0 {
        return Err(ImagingError::InvalidDimension(max_width));
    }

    let surface = backend.decode(data)?;
    let natural = backend.dimensions(&surface);
    let params = plan_encode(natural, format, quality, max_width)?;
    debug!(
        "encoding {}x{} → {}",
        natural.width,
        natural.height,
        params.describe()
    );

    let bytes = if (params.width, params.height) == natural.as_tuple() {
        backend.encode(&surface, params.format, params.quality)?
    } else {
        let target = backend.render(&surface, params.width, params.height);
        backend.encode(&target, params.format, params.quality)?
    };

    Ok(Encoded {
        bytes,
        width: params.width,
        height: params.height,
        format: params.format,
    })
}
