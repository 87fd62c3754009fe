//! Time parsing and formatting utilities

use crate::error::{Video2PdfError, Video2PdfResult};

/// Grammar hint attached to every time format error
pub const TIME_FORMAT_HINT: &str =
    "expected seconds (90), MM:SS (01:30) or HH:MM:SS (1:02:03.5); the last part may be fractional";

/// Time parser for operator-supplied time expressions
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse a time expression into seconds.
    ///
    /// Blank input means "unspecified" and yields `Ok(None)`. Accepted shapes
    /// are `SS[.fff]`, `MM:SS[.fff]` and `HH:MM:SS[.fff]`. Negative values are
    /// not rejected here; range ordering is checked by [`TrimRange`].
    ///
    /// [`TrimRange`]: crate::domain::model::TrimRange
    pub fn parse_time(&self, field: &str, time_str: &str) -> Video2PdfResult<Option<f64>> {
        let time_str = time_str.trim();
        if time_str.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = time_str.split(':').collect();
        let seconds = match parts.as_slice() {
            [secs] => self.parse_seconds(field, time_str, secs)?,
            [minutes, secs] => {
                let minutes = self.parse_whole(field, time_str, minutes)?;
                minutes * 60.0 + self.parse_seconds(field, time_str, secs)?
            }
            [hours, minutes, secs] => {
                let hours = self.parse_whole(field, time_str, hours)?;
                let minutes = self.parse_whole(field, time_str, minutes)?;
                hours * 3600.0 + minutes * 60.0 + self.parse_seconds(field, time_str, secs)?
            }
            _ => return Err(format_error(field, time_str)),
        };

        Ok(Some(seconds))
    }

    /// Hours and minutes must be integers
    fn parse_whole(&self, field: &str, time_str: &str, part: &str) -> Video2PdfResult<f64> {
        part.trim()
            .parse::<i64>()
            .map(|value| value as f64)
            .map_err(|_| format_error(field, time_str))
    }

    /// The final component may carry a fraction
    fn parse_seconds(&self, field: &str, time_str: &str, part: &str) -> Video2PdfResult<f64> {
        match part.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(format_error(field, time_str)),
        }
    }

    /// Format seconds to HH:MM:SS.fff string
    pub fn format_time(&self, seconds: f64) -> String {
        let total_millis = (seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let secs = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, milliseconds)
    }
}

fn format_error(field: &str, time_str: &str) -> Video2PdfError {
    Video2PdfError::TimeFormat {
        field: field.to_string(),
        text: time_str.to_string(),
        hint: TIME_FORMAT_HINT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Video2PdfResult<Option<f64>> {
        TimeParser::new().parse_time("start", text)
    }

    #[test]
    fn test_blank_is_unspecified() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse("90").unwrap(), Some(90.0));
        assert_eq!(parse("12.5").unwrap(), Some(12.5));
    }

    #[test]
    fn test_parse_mm_ss() {
        assert_eq!(parse("01:30").unwrap(), Some(90.0));
        assert_eq!(parse("2:03.25").unwrap(), Some(123.25));
    }

    #[test]
    fn test_parse_hh_mm_ss() {
        assert_eq!(parse("1:02:03.5").unwrap(), Some(3723.5));
        assert_eq!(parse("00:00:07").unwrap(), Some(7.0));
    }

    #[test]
    fn test_fractional_minutes_rejected() {
        assert!(parse("1.5:30").is_err());
        assert!(parse("1:2.5:30").is_err());
    }

    #[test]
    fn test_invalid_shapes_carry_hint() {
        for text in ["1:2:3:4", "abc", "01:xx", "::", "inf"] {
            match parse(text) {
                Err(Video2PdfError::TimeFormat { field, text: got, hint }) => {
                    assert_eq!(field, "start");
                    assert_eq!(got, text);
                    assert_eq!(hint, TIME_FORMAT_HINT);
                }
                other => panic!("expected TimeFormat for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_negative_values_pass_through() {
        assert_eq!(parse("-5").unwrap(), Some(-5.0));
    }

    #[test]
    fn test_format_then_parse_is_stable() {
        let parser = TimeParser::new();
        for seconds in [0.0, 7.25, 90.0, 3599.999, 3723.5, 86_400.125] {
            let text = parser.format_time(seconds);
            let back = parser.parse_time("end", &text).unwrap().unwrap();
            assert!((back - seconds).abs() < 1e-3, "{} -> {} -> {}", seconds, text, back);
        }
    }
}
