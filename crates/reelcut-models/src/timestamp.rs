//! Timestamp parsing and formatting.
//!
//! Model responses occasionally carry `MM:SS` strings where seconds were
//! requested; these helpers normalise both directions.

use thiserror::Error;

/// Longest source video the pipeline accepts (24 hours).
pub const MAX_VIDEO_DURATION_SECS: f64 = 86400.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("timestamp has too many components: {0}")]
    InvalidFormat(String),

    #[error("timestamp is negative")]
    Negative,
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` (each with optional fraction) into seconds.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    const UNITS: [(&str, f64); 3] = [("seconds", 1.0), ("minutes", 60.0), ("hours", 3600.0)];

    let mut total = 0.0;
    for (part, (name, scale)) in parts.iter().rev().zip(UNITS.iter()) {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(*name, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(*name, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total += value * scale;
    }
    Ok(total)
}

/// Format seconds as `HH:MM:SS`, or `HH:MM:SS.mmm` when there is a fraction.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
        assert_eq!(parse_timestamp(" 1:02.5 ").unwrap(), 62.5);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert_eq!(parse_timestamp(""), Err(TimestampError::Empty));
        assert_eq!(parse_timestamp("-5"), Err(TimestampError::Negative));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("ab:10"),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(5400.0), "01:30:00");
        assert_eq!(format_seconds(62.5), "00:01:02.500");
        assert_eq!(format_seconds(-3.0), "00:00:00");
    }
}
