//! Scalar coercers: raw text to timestamps and identifiers.
//!
//! Timestamps use the fixed RFC 2822 style layout the inthe.am API speaks,
//! `"%a, %d %b %Y %H:%M:%S %z"`. The week day token must be present and must
//! be a three-letter day abbreviation, but it is not checked against the
//! date: `"Tue, 22 Jun 2015"` parses even though that day was a Monday.
//! Fields are separated by exactly one space and years have four digits.
//! Already-typed inputs pass through untouched.

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::error::CoercionError;
use crate::schema::Datum;

/// Point in time with the UTC offset it was written with.
pub type Timestamp = DateTime<FixedOffset>;

/// Layout used for both parsing and rendering.
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

// Layout of the part after the week day token.
const DATE_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parse an RFC 2822 style timestamp, ignoring week day/date mismatches.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, CoercionError> {
    let (_, rest) = input
        .split_once(", ")
        .filter(|(weekday, _)| WEEKDAYS.iter().any(|day| day.eq_ignore_ascii_case(weekday)))
        .ok_or_else(|| CoercionError::MissingWeekday {
            input: input.to_string(),
        })?;

    // Single spaces between fields and a four-digit year.
    if !has_wire_layout(rest) {
        return Err(CoercionError::Layout {
            input: input.to_string(),
        });
    }

    DateTime::parse_from_str(rest, DATE_TIME_FORMAT).map_err(|source| CoercionError::Timestamp {
        input: input.to_string(),
        source,
    })
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// `D[D] Mon YYYY HH:MM:SS +HHMM`, single spaces between fields.
fn has_wire_layout(rest: &str) -> bool {
    let tokens: Vec<&str> = rest.split(' ').collect();
    let [day, month, year, time, offset] = tokens[..] else {
        return false;
    };
    let clock: Vec<&str> = time.split(':').collect();

    (1..=2).contains(&day.len())
        && all_digits(day)
        && month.len() == 3
        && month.bytes().all(|b| b.is_ascii_alphabetic())
        && year.len() == 4
        && all_digits(year)
        && clock.len() == 3
        && clock.iter().all(|part| part.len() == 2 && all_digits(part))
        && offset.len() == 5
        && offset.starts_with(['+', '-'])
        && all_digits(&offset[1..])
}

/// Render a timestamp in the canonical layout.
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp for `value`: strings are parsed, timestamps returned as is.
pub fn coerce_timestamp(value: &Datum) -> Result<Timestamp, CoercionError> {
    match value {
        Datum::Timestamp(timestamp) => Ok(*timestamp),
        Datum::Str(text) => parse_timestamp(text),
        other => Err(CoercionError::NotCoercible {
            target: "timestamp",
            found: other.kind(),
        }),
    }
}

/// Parse a UUID in hyphenated or compact hex form, any case.
pub fn parse_identifier(input: &str) -> Result<Uuid, CoercionError> {
    Uuid::parse_str(input).map_err(|source| CoercionError::Identifier {
        input: input.to_string(),
        source,
    })
}

/// Identifier for `value`: strings are parsed, identifiers returned as is.
pub fn coerce_identifier(value: &Datum) -> Result<Uuid, CoercionError> {
    match value {
        Datum::Identifier(id) => Ok(*id),
        Datum::Str(text) => parse_identifier(text),
        other => Err(CoercionError::NotCoercible {
            target: "identifier",
            found: other.kind(),
        }),
    }
}

/// Source of "now" for entities that default a timestamp field.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock, expressed in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().fixed_offset()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DATES: [&str; 2] = [
        "Mon, 22 Jun 2015 22:26:00 +0100",
        "Thu, 11 May 2983 19:35:45 -0230",
    ];

    const INVALID_DATES: [&str; 11] = [
        "",
        "Blargh",
        "22 Jun 2015",
        "00:45",
        "12:32:23",
        "Mon 22 Jun 2015 22:26:00 +0100",
        "Mon, 22 Jun 2015 45:90:00 +0100",
        "Mon, 22Jun2015 22:26:00 +0100",
        "Mon, 22 Jun 2015 22:26:00+0100",
        "Mon, 22 Jun 15 22:26:00 +0100",
        "Monday, 22 Jun 2015 22:26:00 +0100",
    ];

    const VALID_UUIDS: [&str; 4] = [
        "5c2ddc84-bf99-47d2-a0da-3882b9d788ed",
        "5C2DDC84-BF99-47D2-A0DA-3882B9D788ED",
        "5c2ddc84bf9947d2a0da3882b9d788ed",
        "5C2DDC84BF9947D2A0DA3882B9D788ED",
    ];

    #[test]
    fn parses_valid_dates() {
        for date in VALID_DATES {
            assert!(parse_timestamp(date).is_ok(), "{date}");
        }
    }

    #[test]
    fn keeps_the_written_offset() {
        let ts = parse_timestamp("Thu, 11 May 2983 19:35:45 -0230").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), -(2 * 3600 + 30 * 60));
    }

    #[test]
    fn rejects_invalid_dates() {
        for date in INVALID_DATES {
            assert!(parse_timestamp(date).is_err(), "{date:?} should not parse");
        }
    }

    #[test]
    fn week_day_is_not_checked_against_the_date() {
        // 22 June 2015 was a Monday.
        let lenient = parse_timestamp("Tue, 22 Jun 2015 22:26:00 +0100").unwrap();
        let exact = parse_timestamp("Mon, 22 Jun 2015 22:26:00 +0100").unwrap();
        assert_eq!(lenient, exact);
    }

    #[test]
    fn week_day_token_must_name_a_day() {
        let err = parse_timestamp("Xyz, 22 Jun 2015 22:26:00 +0100").unwrap_err();
        assert!(matches!(err, CoercionError::MissingWeekday { .. }));
    }

    #[test]
    fn full_week_day_names_are_rejected() {
        let err = parse_timestamp("Monday, 22 Jun 2015 22:26:00 +0100").unwrap_err();
        assert!(matches!(err, CoercionError::MissingWeekday { .. }));
    }

    #[test]
    fn week_day_case_is_ignored() {
        assert!(parse_timestamp("MON, 22 Jun 2015 22:26:00 +0100").is_ok());
    }

    #[test]
    fn malformed_layouts_are_rejected() {
        for date in [
            "Mon, 22Jun2015 22:26:00 +0100",
            "Mon, 22 Jun 2015 22:26:00+0100",
            "Mon, 22 Jun 15 22:26:00 +0100",
            "Mon, 22  Jun 2015 22:26:00 +0100",
            "Mon, 22 June 2015 22:26:00 +0100",
            "Mon, 22 Jun 2015 22:26 +0100",
        ] {
            let err = parse_timestamp(date).unwrap_err();
            assert!(matches!(err, CoercionError::Layout { .. }), "{date:?}: {err}");
        }
    }

    #[test]
    fn single_digit_day_is_accepted() {
        let ts = parse_timestamp("Mon, 1 Jun 2015 22:26:00 +0100").unwrap();
        assert_eq!(format_timestamp(&ts), "Mon, 01 Jun 2015 22:26:00 +0100");
    }

    #[test]
    fn timestamp_passes_through_untouched() {
        let now = SystemClock.now();
        assert_eq!(coerce_timestamp(&Datum::Timestamp(now)).unwrap(), now);
    }

    #[test]
    fn coercing_twice_is_idempotent() {
        for date in VALID_DATES {
            let once = coerce_timestamp(&Datum::from(date)).unwrap();
            let twice = coerce_timestamp(&Datum::Timestamp(once)).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn formats_in_canonical_layout() {
        let ts = parse_timestamp("Mon, 22 Jun 2015 00:00:00 +0000").unwrap();
        assert_eq!(format_timestamp(&ts), "Mon, 22 Jun 2015 00:00:00 +0000");
    }

    #[test]
    fn non_text_is_not_a_timestamp() {
        let err = coerce_timestamp(&Datum::Int(3)).unwrap_err();
        assert_eq!(
            err,
            CoercionError::NotCoercible {
                target: "timestamp",
                found: "integer"
            }
        );
    }

    #[test]
    fn parses_valid_uuids_to_the_same_value() {
        let expected = parse_identifier(VALID_UUIDS[0]).unwrap();
        for u in VALID_UUIDS {
            assert_eq!(parse_identifier(u).unwrap(), expected, "{u}");
        }
        assert_eq!(expected.to_string(), VALID_UUIDS[0]);
    }

    #[test]
    fn rejects_invalid_uuids() {
        for u in ["", "blargh", "AFCEDEFSDSDS", "5c2ddc84-bf99-47d2-a0da-3882b9d788eg"] {
            assert!(parse_identifier(u).is_err(), "{u:?} should not parse");
        }
    }

    #[test]
    fn identifier_passes_through_untouched() {
        let id = Uuid::new_v4();
        assert_eq!(coerce_identifier(&Datum::Identifier(id)).unwrap(), id);
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let at = parse_timestamp("Mon, 22 Jun 2015 00:00:00 +0000").unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }
}
