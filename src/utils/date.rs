//! UTC datetime utilities without timezone dependencies.
//!
//! Provides a lightweight `DateTimeUtc` struct for converting the source
//! store's `"YYYY-MM-DD HH:MM:SS"` datetime text into the Unix epoch
//! integers the target store expects, plus the reverse conversion used for
//! upload-bucket fallbacks.
//!
//! # Examples
//!
//! ```ignore
//! let dt = DateTimeUtc::parse("2024-06-15 14:30:45").unwrap();
//! assert_eq!(dt.unix_timestamp(), 1718461845);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// UTC datetime without timezone complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeUtc {
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTimeUtc {
    pub const fn new(year: i64, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Parse from `"YYYY-MM-DD HH:MM:SS"` format.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() < 19 {
            return None;
        }

        let year = parse_num(&bytes[0..4])?;
        if bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let month = parse_num(&bytes[5..7])? as u8;
        let day = parse_num(&bytes[8..10])? as u8;

        // Source stores use a space separator; accept 'T' as well.
        if bytes[10] != b' ' && bytes[10] != b'T' {
            return None;
        }
        if bytes[13] != b':' || bytes[16] != b':' {
            return None;
        }
        let hour = parse_num(&bytes[11..13])? as u8;
        let minute = parse_num(&bytes[14..16])? as u8;
        let second = parse_num(&bytes[17..19])? as u8;

        let dt = Self::new(year, month, day, hour, minute, second);
        if dt.is_valid() {
            Some(dt)
        } else {
            None
        }
    }

    fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
    }

    /// Seconds since the Unix epoch, treating the datetime as UTC.
    pub fn unix_timestamp(&self) -> i64 {
        let days = days_from_civil(self.year, self.month, self.day);
        days * 86_400 + i64::from(self.hour) * 3_600 + i64::from(self.minute) * 60
            + i64::from(self.second)
    }

    /// Reconstruct a civil datetime from a Unix timestamp.
    pub fn from_unix(ts: i64) -> Self {
        let days = ts.div_euclid(86_400);
        let secs = ts.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        Self::new(
            year,
            month,
            day,
            (secs / 3_600) as u8,
            ((secs / 60) % 60) as u8,
            (secs % 60) as u8,
        )
    }
}

/// Current Unix timestamp in seconds.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Convert source datetime text to an epoch timestamp.
///
/// Empty strings, the zero-date placeholder and unparseable values all fall
/// back to the current time.
pub fn timestamp_or_now(s: &str) -> i64 {
    if s.is_empty() || s == "0000-00-00 00:00:00" {
        return now();
    }
    match DateTimeUtc::parse(s) {
        Some(dt) => dt.unix_timestamp(),
        None => now(),
    }
}

fn parse_num(bytes: &[u8]) -> Option<i64> {
    let mut n: i64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        n = n * 10 + i64::from(b - b'0');
    }
    Some(n)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a civil date (proleptic Gregorian).
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = i64::from(if month > 2 { month - 3 } else { month + 9 });
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for a number of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if month <= 2 { y + 1 } else { y };
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let dt = DateTimeUtc::parse("2024-01-01 12:00:00").unwrap();
        assert_eq!(dt, DateTimeUtc::new(2024, 1, 1, 12, 0, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DateTimeUtc::parse("not a date").is_none());
        assert!(DateTimeUtc::parse("2024-13-01 00:00:00").is_none());
        assert!(DateTimeUtc::parse("2024-02-30 00:00:00").is_none());
    }

    #[test]
    fn test_epoch_roundtrip() {
        let dt = DateTimeUtc::parse("2024-06-15 14:30:45").unwrap();
        let ts = dt.unix_timestamp();
        assert_eq!(DateTimeUtc::from_unix(ts), dt);
    }

    #[test]
    fn test_known_timestamps() {
        assert_eq!(
            DateTimeUtc::parse("1970-01-01 00:00:00").unwrap().unix_timestamp(),
            0
        );
        assert_eq!(
            DateTimeUtc::parse("2024-01-01 00:00:00").unwrap().unix_timestamp(),
            1_704_067_200
        );
    }

    #[test]
    fn test_leap_day() {
        let dt = DateTimeUtc::parse("2024-02-29 00:00:00").unwrap();
        assert_eq!(DateTimeUtc::from_unix(dt.unix_timestamp()), dt);
    }

    #[test]
    fn test_zero_date_falls_back_to_now() {
        let ts = timestamp_or_now("0000-00-00 00:00:00");
        assert!(ts > 1_500_000_000);
    }
}
