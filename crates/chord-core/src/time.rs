//! Unix-second timestamps and their ISO-8601 rendering (no chrono dependency).

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// True when `then` lies no more than `window_secs` before `now`.
/// Timestamps from the future count as recent.
pub fn within_window(then: u64, now: u64, window_secs: u64) -> bool {
    now.saturating_sub(then) <= window_secs
}

/// Render Unix seconds as an ISO-8601 UTC string.
pub fn to_iso8601(secs: u64) -> String {
    let (days, rem) = ((secs / 86_400) as i64, secs % 86_400);
    let (y, m, d) = date_from_epoch_days(days);
    format!(
        "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 → (year, month, day), proleptic Gregorian.
fn date_from_epoch_days(days: i64) -> (i64, u64, u64) {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted.rem_euclid(146_097) as u64;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    };
    let year = year_of_era as i64 + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_renders() {
        assert_eq!(to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_known_instant_renders() {
        // 2026-02-21T13:05:09Z
        assert_eq!(to_iso8601(1_771_632_000 + 13 * 3600 + 5 * 60 + 9), "2026-02-21T13:05:09Z");
    }

    #[test]
    fn test_leap_day_renders() {
        // 2024-02-29T00:00:00Z
        assert_eq!(to_iso8601(1_709_164_800), "2024-02-29T00:00:00Z");
    }

    #[test]
    fn test_window_is_inclusive_and_tolerates_clock_skew() {
        assert!(within_window(100, 400, 300));
        assert!(!within_window(99, 400, 300));
        assert!(within_window(500, 400, 300));
    }
}
