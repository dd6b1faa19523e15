//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait splits one compression into the steps the
//! orchestrator sequences: decode, read dimensions, render onto a fresh
//! target-sized surface, encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use a recording
//! mock whose surfaces are just dimensions.

use super::error::ImagingError;
use super::params::OutputFormat;

/// Pixel dimensions of a decoded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// A `Surface` is owned by exactly one run; backends must not share pixel
/// state between calls.
pub trait ImageBackend: Send + Sync {
    type Surface: Send;

    /// Parse raw bytes into a pixel-addressable surface.
    fn decode(&self, data: &[u8]) -> Result<Self::Surface, ImagingError>;

    fn dimensions(&self, surface: &Self::Surface) -> Dimensions;

    /// Draw `surface` into a new `width` x `height` surface with a single
    /// scale (no crop, no letterbox).
    fn render(&self, surface: &Self::Surface, width: u32, height: u32) -> Self::Surface;

    /// Serialize a surface into format-specific bytes.
    fn encode(
        &self,
        surface: &Self::Surface,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ImagingError>;
}
