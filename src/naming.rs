//! Names and labels derived from compression state.
//!
//! ## Download Names
//!
//! Downloads are named after the moment they were requested, in UTC with
//! millisecond precision. Characters that are awkward in filenames (`:` and
//! `.`) become dashes:
//! - `2026-03-09T14:05:07.042Z` as JPEG → `compressed-2026-03-09T14-05-07-042Z.jpeg`
//!
//! ## Display Labels
//!
//! - Byte sizes: `512 B`, `1.50 KB`, `2.00 MB` (binary units, two decimals)
//! - Max width: `Original` at the natural width, otherwise `1200px`
//! - Quality badge: slider value as a whole percentage, `0.8` → `80%`
//! - Savings: one decimal, `60.0% saved` (negative values kept)

use crate::imaging::OutputFormat;
use chrono::{DateTime, SecondsFormat, Utc};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Build the download filename for a result encoded as `format`.
pub fn download_file_name(format: OutputFormat, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("compressed-{}.{}", stamp, format.extension())
}

/// Format a byte count for display.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    }
}

/// Label for the max-width control.
pub fn width_label(max_width: u32, natural_width: u32) -> String {
    if max_width >= natural_width {
        "Original".to_string()
    } else {
        format!("{}px", max_width)
    }
}

pub fn quality_badge(quality: f32) -> String {
    format!("{}%", (quality * 100.0).round() as i32)
}

pub fn savings_label(savings: f64) -> String {
    format!("{:.1}% saved", savings)
}
