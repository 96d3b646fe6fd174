//! Timestamp parsing for feed payloads.
//!
//! The feed producer sends `datetime` as Python `isoformat()` output, but older
//! producers sent epoch seconds or milliseconds (as numbers or strings).

use chrono::{DateTime, NaiveDateTime, Utc};

/// Epoch values at or above this magnitude are treated as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e11;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp string: RFC 3339, naive ISO-8601 (read as UTC), or an
/// epoch number in seconds or milliseconds.
pub fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty timestamp".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    match s.parse::<f64>() {
        Ok(epoch) => parse_epoch(epoch),
        Err(_) => Err(format!("unrecognized timestamp `{}`", s)),
    }
}

/// Interpret an epoch number as seconds or milliseconds by magnitude.
pub fn parse_epoch(epoch: f64) -> Result<DateTime<Utc>, String> {
    if !epoch.is_finite() {
        return Err(format!("non-finite epoch `{}`", epoch));
    }

    let millis = if epoch.abs() >= MILLIS_THRESHOLD {
        epoch.round()
    } else {
        (epoch * 1000.0).round()
    };

    if millis.abs() > i64::MAX as f64 {
        return Err(format!("epoch out of range `{}`", epoch));
    }

    DateTime::<Utc>::from_timestamp_millis(millis as i64)
        .ok_or_else(|| format!("epoch out of range `{}`", epoch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let dt = parse_timestamp_str("2024-03-01T12:30:05.250000+00:00").unwrap();
        assert_eq!(dt.timestamp_millis(), utc(2024, 3, 1, 12, 30, 5).timestamp_millis() + 250);
    }

    #[test]
    fn test_rfc3339_non_utc_offset_normalized() {
        let dt = parse_timestamp_str("2024-03-01T14:30:05+02:00").unwrap();
        assert_eq!(dt, utc(2024, 3, 1, 12, 30, 5));
    }

    #[test]
    fn test_naive_iso_is_utc() {
        assert_eq!(
            parse_timestamp_str("2024-03-01T12:30:05").unwrap(),
            utc(2024, 3, 1, 12, 30, 5)
        );
        assert_eq!(
            parse_timestamp_str("2024-03-01 12:30:05.5").unwrap().timestamp_millis(),
            utc(2024, 3, 1, 12, 30, 5).timestamp_millis() + 500
        );
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        let expected = utc(2024, 1, 1, 0, 0, 0);
        assert_eq!(parse_timestamp_str("1704067200").unwrap(), expected);
        assert_eq!(parse_timestamp_str("1704067200000").unwrap(), expected);
        assert_eq!(parse_epoch(1704067200.0).unwrap(), expected);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_timestamp_str("bad").is_err());
        assert!(parse_timestamp_str("").is_err());
        assert!(parse_epoch(f64::NAN).is_err());
        assert!(parse_epoch(f64::INFINITY).is_err());
    }
}
