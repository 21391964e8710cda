//! Date/time parsing utilities for protocol timestamps
//!
//! The service reports timestamps in two shapes: ISO 8601 with up to seven
//! fractional digits (`x-ms-file-*-time` headers, listing `*Time` elements)
//! and RFC 1123 (`Last-Modified`).

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// Text form used when rendering entries
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a protocol timestamp, `None` if it matches no known shape
pub fn parse_protocol_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc));
    }

    // ISO without an offset, assume UTC
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp truncated to the second
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.trunc_subsecs(0).format(DISPLAY_FORMAT).to_string()
}
