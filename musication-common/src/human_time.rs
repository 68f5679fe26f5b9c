//! Human-readable formatting for durations, file sizes and matched segments
//!
//! Provides consistent display formatting for presentation collaborators.

use crate::models::MatchedSegment;

/// File size unit labels (base 1024)
const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format seconds as `M:SS`.
///
/// Fractional seconds are truncated. Negative or non-finite input renders as `0:00`.
///
/// # Examples
///
/// ```
/// use musication_common::human_time::format_duration;
///
/// assert_eq!(format_duration(0.0), "0:00");
/// assert_eq!(format_duration(65.9), "1:05");
/// assert_eq!(format_duration(754.0), "12:34");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a byte count with a base-1024 unit, up to two decimals.
///
/// # Examples
///
/// ```
/// use musication_common::human_time::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Summarize the first well-formed segment as `M:SS-M:SS ↔ M:SS-M:SS`.
///
/// Malformed segments are skipped. Returns `No specific segments` when none remain.
pub fn format_segment_summary(segments: &[MatchedSegment]) -> String {
    match segments.iter().find(|s| s.is_well_formed()) {
        Some(s) => format!(
            "{}-{} ↔ {}-{}",
            format_duration(s.start1),
            format_duration(s.end1),
            format_duration(s.start2),
            format_duration(s.end2)
        ),
        None => "No specific segments".to_string(),
    }
}

/// Format a processing time in seconds with two decimals (e.g. `12.35s`)
pub fn format_processing_time(seconds: f64) -> String {
    if seconds.is_finite() && seconds >= 0.0 {
        format!("{:.2}s", seconds)
    } else {
        "n/a".to_string()
    }
}
