//! Pure calculation functions for image dimensions and size deltas.
//!
//! All functions here are pure and testable without any I/O or images.

use super::error::ImagingError;

/// Plan output dimensions for a max-width constraint.
///
/// Never upscales: a `max_width` at or above the natural width returns the
/// natural dimensions unchanged. Otherwise the width becomes `max_width` and
/// the height follows the aspect ratio, rounded to the nearest pixel and
/// never below 1.
///
/// # Examples
/// ```
/// # use shrinkray::imaging::plan_dimensions;
/// assert_eq!(plan_dimensions((4000, 3000), 2000).unwrap(), (2000, 1500));
/// assert_eq!(plan_dimensions((800, 600), 1200).unwrap(), (800, 600));
/// assert!(plan_dimensions((800, 600), 0).is_err());
/// ```
pub fn plan_dimensions(natural: (u32, u32), max_width: u32) -> Result<(u32, u32), ImagingError> {
    if max_width == 0 {
        return Err(ImagingError::InvalidDimension(max_width));
    }

    let (nat_w, nat_h) = natural;
    if max_width >= nat_w {
        return Ok(natural);
    }

    let h = (nat_h as f64 * max_width as f64 / nat_w as f64).round() as u32;
    Ok((max_width, h.max(1)))
}

/// Clamp a requested max width into `[1, natural_width]`.
///
/// Returning `natural_width` is the "no downscale" sentinel.
pub fn clamp_max_width(requested: u32, natural_width: u32) -> u32 {
    requested.clamp(1, natural_width.max(1))
}

/// Percentage of bytes saved: `100 - output / original * 100`.
///
/// Negative when the output is larger than the original; not clamped.
/// An empty original yields `0.0` rather than a non-finite value.
pub fn savings_percent(original_bytes: u64, output_bytes: u64) -> f64 {
    if original_bytes == 0 {
        return 0.0;
    }
    100.0 - (output_bytes as f64 / original_bytes as f64 * 100.0)
}
