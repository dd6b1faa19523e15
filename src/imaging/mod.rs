//! Image processing — decode, plan, render, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (content-sniffed) |
//! | **Plan** | [`plan_dimensions`]: max-width, aspect preserving, never upscales |
//! | **Render** | `resize_exact` with bilinear filtering |
//! | **Encode** | `image` JPEG/PNG encoders, `webp` for lossy WebP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and savings math (unit testable)
//! - **Parameters**: Output formats and the quality adapter
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Input checks and the one-shot compress pipeline

pub mod backend;
mod calculations;
mod error;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{Dimensions, ImageBackend};
pub use calculations::{clamp_max_width, plan_dimensions, savings_percent};
pub use error::ImagingError;
pub use operations::{DEFAULT_MAX_INPUT_BYTES, Encoded, compress_image, decode_source};
pub use params::{EncodeParams, OutputFormat, PNG_QUALITY_SCALE, effective_quality};
pub use rust_backend::{RustBackend, media_type_for_extension};
