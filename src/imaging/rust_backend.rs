//! Pure Rust image processing backend (plus libwebp for lossy WebP).
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF, BMP, TIFF) | `image::ImageReader` with content sniffing |
//! | Render | `image::DynamicImage::resize_exact` with `Triangle` (bilinear) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder`, quality 1–100 |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, effort hint → `CompressionType` |
//! | Encode → WebP | `webp::Encoder` (lossy, quality 0–100) |

use super::backend::{Dimensions, ImageBackend};
use super::error::ImagingError;
use super::params::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::LazyLock;

/// Declared media types whose decoders are compiled in.
const INPUT_CANDIDATES: &[(&str, &str, ImageFormat)] = &[
    ("jpg", "image/jpeg", ImageFormat::Jpeg),
    ("jpeg", "image/jpeg", ImageFormat::Jpeg),
    ("png", "image/png", ImageFormat::Png),
    ("webp", "image/webp", ImageFormat::WebP),
    ("gif", "image/gif", ImageFormat::Gif),
    ("bmp", "image/bmp", ImageFormat::Bmp),
    ("tif", "image/tiff", ImageFormat::Tiff),
    ("tiff", "image/tiff", ImageFormat::Tiff),
];

static SUPPORTED_INPUTS: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, _, fmt)| fmt.reading_enabled())
        .map(|(ext, media, _)| (*ext, *media))
        .collect()
});

/// Returns `(extension, media type)` pairs that have working decoders.
pub fn supported_inputs() -> &'static [(&'static str, &'static str)] {
    &SUPPORTED_INPUTS
}

/// Guess a declared media type from a file extension (case-insensitive).
pub fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    SUPPORTED_INPUTS
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, media)| *media)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the PNG effort hint (`0.0..=0.9`) onto zlib effort levels.
fn png_compression(hint: f32) -> CompressionType {
    if hint < 0.3 {
        CompressionType::Fast
    } else if hint < 0.6 {
        CompressionType::Default
    } else {
        CompressionType::Best
    }
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, ImagingError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality))
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ImagingError::Encode {
            format: OutputFormat::Jpeg.name(),
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, hint: f32) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buf, png_compression(hint), PngFilter::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| ImagingError::Encode {
            format: OutputFormat::Png.name(),
            reason: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, ImagingError> {
    let rgba = img.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder
        .encode_simple(false, quality * 100.0)
        .map_err(|e| ImagingError::Encode {
            format: OutputFormat::Webp.name(),
            reason: format!("{e:?}"),
        })?;
    Ok(encoded.to_vec())
}

impl ImageBackend for RustBackend {
    type Surface = DynamicImage;

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, ImagingError> {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImagingError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| ImagingError::Decode(e.to_string()))
    }

    fn dimensions(&self, surface: &DynamicImage) -> Dimensions {
        Dimensions {
            width: surface.width(),
            height: surface.height(),
        }
    }

    fn render(&self, surface: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        surface.resize_exact(width, height, FilterType::Triangle)
    }

    fn encode(
        &self,
        surface: &DynamicImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ImagingError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(surface, quality),
            OutputFormat::Png => encode_png(surface, quality),
            OutputFormat::Webp => encode_webp(surface, quality),
        }
    }
}
