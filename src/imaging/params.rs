//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the pixel work.
//!
//! ## Types
//!
//! - [`OutputFormat`] — JPEG, PNG or WebP, with media type and file extension.
//! - [`effective_quality`] — maps the user's 0–1 slider to what the encoder expects.
//! - [`EncodeParams`] — target dimensions, format and effective quality for one encode.

use super::error::ImagingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PNG has no visual-quality knob; the slider is scaled down and treated as
/// a compression-effort hint.
pub const PNG_QUALITY_SCALE: f32 = 0.9;

/// Output encoding selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp];

    /// Media type the encoded bytes are labelled with.
    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Extension used for downloads.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WebP",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(format!(
                "unknown format '{other}' (expected jpeg, png or webp)"
            )),
        }
    }
}

/// Map a slider quality in `[0, 1]` to the value handed to the encoder.
///
/// JPEG and WebP take the slider value unchanged. PNG gets
/// `quality * 0.9`, which the backend reads as a compression-effort hint.
pub fn effective_quality(format: OutputFormat, slider: f32) -> Result<f32, ImagingError> {
    if !(0.0..=1.0).contains(&slider) {
        return Err(ImagingError::InvalidQuality(slider));
    }
    Ok(match format {
        OutputFormat::Jpeg | OutputFormat::Webp => slider,
        OutputFormat::Png => slider * PNG_QUALITY_SCALE,
    })
}

/// Full specification for one render + encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// Already passed through [`effective_quality`].
    pub quality: f32,
}

impl EncodeParams {
    /// One-line summary for logs, e.g. `2000x1500 JPEG q=0.80`.
    pub fn describe(&self) -> String {
        format!(
            "{}x{} {} q={:.2}",
            self.width,
            self.height,
            self.format.name(),
            self.quality
        )
    }
}
