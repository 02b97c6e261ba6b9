//! Human-readable sizes and timestamps.

use chrono::{DateTime, TimeZone, Utc};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Relative-time buckets, largest first.
const TIME_UNITS: [(i64, &str); 6] = [
    (31_536_000, "yr"),
    (2_592_000, "mo"),
    (604_800, "wk"),
    (86_400, "d"),
    (3_600, "h"),
    (60, "m"),
];

/// Formats a byte count with one decimal place.
///
/// The unit is chosen from the number of decimal digits rather than the
/// binary magnitude, so `1023` renders as `1.0 KB`. Values of zero or less
/// render as `0 B`.
///
/// ```rust
/// use devhome_core::stats::human_file_size;
///
/// assert_eq!(human_file_size(0), "0 B");
/// assert_eq!(human_file_size(512), "512.0 B");
/// assert_eq!(human_file_size(1536), "1.5 KB");
/// ```
pub fn human_file_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }

    let digits = bytes.to_string().len();
    let factor = ((digits - 1) / 3).min(SIZE_UNITS.len() - 1);
    let divisor = 1024_f64.powi(i32::try_from(factor).unwrap_or(0));
    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / divisor;

    format!("{} {}", format_decimal(value), SIZE_UNITS[factor])
}

/// Compact "time ago" label for an elapsed duration in seconds.
///
/// Negative durations (timestamps in the future) render as `just now`.
/// Anything under a minute renders in seconds, never below `1s ago`.
pub fn format_relative_time(elapsed_secs: i64) -> String {
    if elapsed_secs < 0 {
        return "just now".to_string();
    }
    for (seconds, label) in TIME_UNITS {
        if elapsed_secs >= seconds {
            return format!("{}{} ago", elapsed_secs / seconds, label);
        }
    }
    format!("{}s ago", elapsed_secs.max(1))
}

/// Relative label for `at` as seen from `now`; `unknown` for timestamps at
/// or before the Unix epoch.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let timestamp = at.timestamp();
    if timestamp <= 0 {
        return "unknown".to_string();
    }
    format_relative_time(now.timestamp() - timestamp)
}

/// Absolute label such as `Mar 5, 2024 14:07`.
pub fn format_absolute<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Inserts `,` every three digits: `1234567` becomes `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// One decimal place, half away from zero, with grouped thousands.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_decimal(value: f64) -> String {
    let tenths = (value * 10.0).round() as u64;
    format!("{}.{}", group_thousands(tenths / 10), tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_file_size_examples() {
        assert_eq!(human_file_size(0), "0 B");
        assert_eq!(human_file_size(-5), "0 B");
        assert_eq!(human_file_size(1), "1.0 B");
        assert_eq!(human_file_size(999), "999.0 B");
        assert_eq!(human_file_size(1023), "1.0 KB");
        assert_eq!(human_file_size(1536), "1.5 KB");
        assert_eq!(human_file_size(1_048_576), "1.0 MB");
        assert_eq!(human_file_size(5_368_709_120), "5.0 GB");
    }

    #[test]
    fn test_human_file_size_caps_at_terabytes() {
        // 17 digits would be petabytes; the unit table stops at TB.
        assert_eq!(human_file_size(10_995_116_277_760_000), "10,000.0 TB");
    }

    #[test]
    fn test_format_relative_time_thresholds() {
        assert_eq!(format_relative_time(-10), "just now");
        assert_eq!(format_relative_time(0), "1s ago");
        assert_eq!(format_relative_time(59), "59s ago");
        assert_eq!(format_relative_time(60), "1m ago");
        assert_eq!(format_relative_time(3_599), "59m ago");
        assert_eq!(format_relative_time(7_200), "2h ago");
        assert_eq!(format_relative_time(86_400), "1d ago");
        assert_eq!(format_relative_time(1_209_600), "2wk ago");
        assert_eq!(format_relative_time(2_592_000), "1mo ago");
        assert_eq!(format_relative_time(63_072_000), "2yr ago");
    }

    #[test]
    fn test_relative_time_unknown_for_epoch() {
        let now = Utc::now();
        assert_eq!(relative_time(DateTime::<Utc>::UNIX_EPOCH, now), "unknown");
        assert_eq!(
            relative_time(now - chrono::Duration::seconds(90), now),
            "1m ago"
        );
    }

    #[test]
    fn test_format_absolute() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_absolute(&at), "Mar 5, 2024 14:07");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
