use std::error::Error;
use std::fmt;

use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};

/// Parse a stored or user-supplied timestamp. Full RFC3339 is the
/// canonical form; a bare `YYYY-MM-DD` is accepted as midnight UTC for
/// CLI convenience.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, ParseTimestampError> {
    if let Ok(parsed) = OffsetDateTime::parse(raw.trim(), &Rfc3339) {
        return Ok(parsed);
    }
    parse_plain_date(raw.trim()).ok_or_else(|| ParseTimestampError {
        value: raw.to_string(),
    })
}

pub fn format_timestamp(moment: OffsetDateTime) -> String {
    moment
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

fn parse_plain_date(raw: &str) -> Option<OffsetDateTime> {
    let mut parts = raw.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;

    Date::from_calendar_date(year, Month::try_from(month).ok()?, day)
        .ok()?
        .with_hms(0, 0, 0)
        .ok()
        .map(|naive| naive.assume_utc())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimestampError {
    value: String,
}

impl fmt::Display for ParseTimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid timestamp '{}': use RFC3339 (2026-02-05T06:00:00Z) or YYYY-MM-DD",
            self.value
        )
    }
}

impl Error for ParseTimestampError {}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp};
    use time::Month;

    #[test]
    fn parses_rfc3339_round_trip() {
        let parsed = parse_timestamp("2026-02-05T06:30:00Z").expect("rfc3339 should parse");
        assert_eq!(parsed.hour(), 6);
        assert_eq!(format_timestamp(parsed), "2026-02-05T06:30:00Z");
    }

    #[test]
    fn parses_plain_date_as_midnight_utc() {
        let parsed = parse_timestamp("2026-02-05").expect("plain date should parse");
        assert_eq!(parsed.year(), 2026);
        assert_eq!(parsed.month(), Month::February);
        assert_eq!(parsed.day(), 5);
        assert_eq!(parsed.hour(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("next tuesday").is_err());
        assert!(parse_timestamp("2026-13-01").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
