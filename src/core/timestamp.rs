//! UTC ISO 8601 timestamps for run records.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format a wall-clock time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(t: SystemTime) -> String {
    // Manual conversion, no chrono dependency
    let dur = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = dur.as_secs();
    let millis = dur.subsec_millis();

    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;

    let (y, m, d) = civil_from_days(days);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        y, m, d, hours, minutes, seconds, millis
    )
}

/// Days since the epoch to (year, month, day).
fn civil_from_days(days: u64) -> (i64, usize, i64) {
    let mut y = 1970i64;
    let mut remaining = days as i64;
    loop {
        let year_days = if is_leap(y) { 366 } else { 365 };
        if remaining < year_days {
            break;
        }
        remaining -= year_days;
        y += 1;
    }
    let leap = is_leap(y);
    let month_days = [
        31,
        if leap { 29 } else { 28 },
        31,
        30,
        31,
        30,
        31,
        31,
        30,
        31,
        30,
        31,
    ];
    let mut m = 12;
    for (i, &md) in month_days.iter().enumerate() {
        if remaining < md {
            m = i + 1;
            break;
        }
        remaining -= md;
    }
    (y, m, remaining + 1)
}

fn is_leap(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_timestamp(UNIX_EPOCH), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_format_known_instant() {
        // 2024-02-29T13:45:30.250Z
        let t = UNIX_EPOCH + Duration::from_millis(1_709_214_330_250);
        assert_eq!(format_timestamp(t), "2024-02-29T13:45:30.250Z");
    }

    #[test]
    fn test_format_last_day_of_year() {
        // 2023-12-31T23:59:59Z
        let t = UNIX_EPOCH + Duration::from_secs(1_704_067_199);
        assert_eq!(format_timestamp(t), "2023-12-31T23:59:59.000Z");
    }

    #[test]
    fn test_now_shape() {
        let ts = format_timestamp(SystemTime::now());
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_is_leap() {
        assert!(is_leap(2000));
        assert!(!is_leap(1900));
        assert!(!is_leap(2100));
        assert!(is_leap(2024));
        assert!(!is_leap(2026));
    }
}
