//!
//! Human readable sizes and durations
//!

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count using 1024 based units, e.g. `1.50 KB`
#[must_use]
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes.max(0.0);
    let mut unit = 0;

    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, BYTE_UNITS[unit])
}

/// Format seconds as seconds, minutes, hours or days, e.g. `2.08m`
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);

    if seconds < 60.0 {
        format!("{:.2}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.2}m", seconds / 60.0)
    } else if seconds < 86400.0 {
        format!("{:.2}h", seconds / 3600.0)
    } else {
        format!("{:.2}d", seconds / 86400.0)
    }
}
