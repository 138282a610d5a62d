//! Note timestamps: Unix seconds as a fixed-width, zero-padded decimal string.

use chrono::{DateTime, Utc};

/// Number of digits in an encoded timestamp.
pub const WIDTH: usize = 10;

/// Timestamp for the current moment.
#[must_use]
pub fn now() -> String {
    format_unix(Utc::now().timestamp())
}

/// Encode Unix seconds.
#[must_use]
pub fn format_unix(secs: i64) -> String {
    format!("{secs:0width$}", width = WIDTH)
}

/// Parse an encoded timestamp for display.
///
/// Leading spaces are accepted for compatibility with space-padded writers.
#[must_use]
pub fn to_datetime(value: &str) -> Option<DateTime<Utc>> {
    let secs = value.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unix_is_zero_padded() {
        assert_eq!(format_unix(200), "0000000200");
        assert_eq!(format_unix(1_700_000_000), "1700000000");
        assert_eq!(format_unix(200).len(), WIDTH);
    }

    #[test]
    fn test_now_has_fixed_width() {
        let ts = now();
        assert_eq!(ts.len(), WIDTH);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_to_datetime() {
        let dt = to_datetime("0000000200").unwrap();
        assert_eq!(dt.timestamp(), 200);
        assert_eq!(to_datetime("       200").unwrap().timestamp(), 200);
        assert!(to_datetime("yesterday").is_none());
    }
}
