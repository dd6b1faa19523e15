//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Inspect
//!
//! ```text
//! photo.jpg
//!     Type: image/jpeg
//!     Size: 2.41 MB
//!     Dimensions: 4000x3000
//! ```
//!
//! ## Compress
//!
//! ```text
//! photo.jpg → compressed-2026-03-09T14-05-07-042Z.jpeg
//!     Settings: JPEG 80%, 2000px
//!     Original: 2.41 MB (4000x3000)
//!     Compressed: 412.08 KB (2000x1500)
//!     Savings: 83.3% saved
//! ```
//!
//! Notifications render as a single tagged line, e.g. `[ok] Download started!`.
//!
//! # Architecture
//!
//! Each entity has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure —
//! no I/O, no side effects.

use crate::naming::{format_file_size, quality_badge, savings_label, width_label};
use crate::session::{
    CompressedResult, CompressionSettings, Notification, NotificationLevel, SourceImage,
};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn dimensions(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

/// Describe a loaded source under its display name.
pub fn format_source(name: &str, source: &SourceImage) -> Vec<String> {
    vec![
        name.to_string(),
        format!("{}Type: {}", indent(1), source.media_type),
        format!("{}Size: {}", indent(1), format_file_size(source.byte_size())),
        format!(
            "{}Dimensions: {}",
            indent(1),
            dimensions(source.width, source.height)
        ),
    ]
}

pub fn print_source(name: &str, source: &SourceImage) {
    for line in format_source(name, source) {
        println!("{}", line);
    }
}

/// Describe an applied result against its source.
pub fn format_result(
    name: &str,
    file_name: &str,
    source: &SourceImage,
    settings: &CompressionSettings,
    result: &CompressedResult,
) -> Vec<String> {
    vec![
        format!("{} → {}", name, file_name),
        format!(
            "{}Settings: {} {}, {}",
            indent(1),
            settings.format.name(),
            quality_badge(settings.quality),
            width_label(settings.max_width, source.width)
        ),
        format!(
            "{}Original: {} ({})",
            indent(1),
            format_file_size(result.original_bytes),
            dimensions(source.width, source.height)
        ),
        format!(
            "{}Compressed: {} ({})",
            indent(1),
            format_file_size(result.byte_size()),
            dimensions(result.width, result.height)
        ),
        format!(
            "{}Savings: {}",
            indent(1),
            savings_label(result.savings_percent())
        ),
    ]
}

pub fn print_result(
    name: &str,
    file_name: &str,
    source: &SourceImage,
    settings: &CompressionSettings,
    result: &CompressedResult,
) {
    for line in format_result(name, file_name, source, settings, result) {
        println!("{}", line);
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let tag = match notification.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    format!("[{}] {}", tag, notification.message)
}

pub fn print_notification(notification: &Notification) {
    match notification.level {
        NotificationLevel::Success => println!("{}", format_notification(notification)),
        NotificationLevel::Error => eprintln!("{}", format_notification(notification)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::OutputFormat;

    fn source() -> SourceImage {
        SourceImage {
            bytes: vec![0; 2048],
            media_type: "image/jpeg".to_string(),
            width: 4000,
            height: 3000,
        }
    }

    fn result(bytes: usize) -> CompressedResult {
        CompressedResult {
            bytes: vec![0; bytes],
            format: OutputFormat::Jpeg,
            width: 2000,
            height: 1500,
            original_bytes: 2048,
            run: 1,
        }
    }

    #[test]
    fn source_lines() {
        let lines = format_source("photo.jpg", &source());
        assert_eq!(
            lines,
            vec![
                "photo.jpg",
                "    Type: image/jpeg",
                "    Size: 2.00 KB",
                "    Dimensions: 4000x3000",
            ]
        );
    }

    #[test]
    fn result_lines_show_settings_and_savings() {
        let settings = CompressionSettings {
            format: OutputFormat::Jpeg,
            quality: 0.8,
            max_width: 2000,
        };
        let lines = format_result("photo.jpg", "out.jpeg", &source(), &settings, &result(512));
        assert_eq!(lines[0], "photo.jpg → out.jpeg");
        assert_eq!(lines[1], "    Settings: JPEG 80%, 2000px");
        assert_eq!(lines[2], "    Original: 2.00 KB (4000x3000)");
        assert_eq!(lines[3], "    Compressed: 512 B (2000x1500)");
        assert_eq!(lines[4], "    Savings: 75.0% saved");
    }

    #[test]
    fn result_at_natural_width_says_original() {
        let settings = CompressionSettings {
            format: OutputFormat::Webp,
            quality: 0.5,
            max_width: 4000,
        };
        let lines = format_result("a.png", "b.webp", &source(), &settings, &result(4096));
        assert_eq!(lines[1], "    Settings: WebP 50%, Original");
        assert_eq!(lines[4], "    Savings: -100.0% saved");
    }

    #[test]
    fn notification_tags() {
        assert_eq!(
            format_notification(&Notification::success("Download started!")),
            "[ok] Download started!"
        );
        assert_eq!(
            format_notification(&Notification::error("Error loading image")),
            "[error] Error loading image"
        );
    }
}
