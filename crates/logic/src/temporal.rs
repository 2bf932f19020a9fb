//! Date/time parsing, formatting and calendar arithmetic.
//!
//! Parsing is strict: either a bare `YYYY-MM-DD` date (midnight UTC) or a
//! full `YYYY-MM-DDThh:mm:ss[.fraction][Z|±hh[:mm]]` timestamp. A missing
//! offset means UTC. Anything else is an `InvalidTime` error.

use std::sync::LazyLock;

use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::coerce;
use crate::error::EvalError;
use crate::value::Value;

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?(Z|[+-]\d{2}(?::\d{2})?)?)?$",
    )
    .expect("timestamp pattern is valid")
});

pub const MILLIS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;
pub const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;

// Far beyond any representable date; keeps the nanosecond conversion in range.
const MAX_SHIFT_MILLIS: f64 = 1e17;

/// Unit accepted by `plusTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Year,
    Month,
    Day,
    Hour,
}

impl TimeUnit {
    pub fn parse(unit: &str) -> Result<Self, EvalError> {
        match unit {
            "year" => Ok(TimeUnit::Year),
            "month" => Ok(TimeUnit::Month),
            "day" => Ok(TimeUnit::Day),
            "hour" => Ok(TimeUnit::Hour),
            other => Err(EvalError::InvalidTimeUnit {
                unit: other.to_string(),
            }),
        }
    }
}

// ──────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────

/// Interpret a value as an instant.
///
/// Instants pass through; everything else is coerced to a string and
/// parsed with [`parse_time_str`].
pub fn parse_time(value: &Value) -> Result<OffsetDateTime, EvalError> {
    match value {
        Value::Instant(dt) => Ok(*dt),
        other => parse_time_str(&coerce::to_string(other)),
    }
}

pub fn parse_time_str(input: &str) -> Result<OffsetDateTime, EvalError> {
    let invalid = || EvalError::InvalidTime {
        input: input.to_string(),
    };
    let caps = TIMESTAMP.captures(input).ok_or_else(invalid)?;

    let field = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };

    let year = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = field(2)
        .and_then(|m| u8::try_from(m).ok())
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(invalid)?;
    let day = field(3).and_then(|d| u8::try_from(d).ok()).ok_or_else(invalid)?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;

    if caps.get(4).is_none() {
        return Ok(date.midnight().assume_utc());
    }

    let hour = field(4).and_then(|v| u8::try_from(v).ok()).ok_or_else(invalid)?;
    let minute = field(5).and_then(|v| u8::try_from(v).ok()).ok_or_else(invalid)?;
    let second = field(6).and_then(|v| u8::try_from(v).ok()).ok_or_else(invalid)?;
    let nanos = match caps.get(7) {
        Some(m) => fraction_to_nanos(m.as_str()),
        None => 0,
    };
    let time = Time::from_hms_nano(hour, minute, second, nanos).map_err(|_| invalid())?;

    let offset = match caps.get(8).map(|m| m.as_str()) {
        None | Some("Z") => UtcOffset::UTC,
        Some(tz) => parse_offset(tz).ok_or_else(invalid)?,
    };

    Ok(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

fn fraction_to_nanos(digits: &str) -> u32 {
    let mut nanos = 0u32;
    let mut scale = 100_000_000u32;
    for d in digits.bytes().take(9) {
        nanos += u32::from(d - b'0') * scale;
        scale /= 10;
    }
    nanos
}

fn parse_offset(tz: &str) -> Option<UtcOffset> {
    let sign: i8 = if tz.starts_with('-') { -1 } else { 1 };
    let digits: String = tz[1..].chars().filter(|c| *c != ':').collect();
    let hours: i8 = digits.get(0..2)?.parse().ok()?;
    let minutes: i8 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

// ──────────────────────────────────────────────
// Formatting
// ──────────────────────────────────────────────

/// RFC 3339 text, accepted back by [`parse_time_str`].
pub fn format_time(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

/// RFC 1123 text in GMT, the string form of an instant under `cat` and
/// friends.
pub fn format_http_date(dt: &OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    dt.to_offset(UtcOffset::UTC)
        .format(&fmt)
        .unwrap_or_else(|_| dt.to_string())
}

/// Milliseconds since the Unix epoch.
pub fn to_millis(dt: &OffsetDateTime) -> f64 {
    dt.unix_timestamp_nanos() as f64 / 1_000_000.0
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

/// Add `amount` units to an instant.
///
/// Years and months are calendar arithmetic on the integral part of
/// `amount`; days and hours are fixed durations and may be fractional.
pub fn plus_time(
    dt: OffsetDateTime,
    amount: &Value,
    unit: TimeUnit,
) -> Result<OffsetDateTime, EvalError> {
    match unit {
        TimeUnit::Year => add_months(dt, to_int(amount).saturating_mul(12)),
        TimeUnit::Month => add_months(dt, to_int(amount)),
        TimeUnit::Day => add_millis(dt, coerce::to_number(amount) * MILLIS_PER_DAY),
        TimeUnit::Hour => add_millis(dt, coerce::to_number(amount) * MILLIS_PER_HOUR),
    }
}

/// Integral part of a coerced number; NaN counts as zero.
pub(crate) fn to_int(value: &Value) -> i64 {
    let n = coerce::to_number(value);
    if n.is_nan() {
        0
    } else {
        n.trunc() as i64
    }
}

fn out_of_range(dt: &OffsetDateTime) -> EvalError {
    EvalError::TimeOutOfRange {
        message: format!("arithmetic on {} overflowed", format_time(dt)),
    }
}

fn add_millis(dt: OffsetDateTime, millis: f64) -> Result<OffsetDateTime, EvalError> {
    if !millis.is_finite() || millis.abs() > MAX_SHIFT_MILLIS {
        return Err(out_of_range(&dt));
    }
    let delta = Duration::nanoseconds_i128((millis * 1_000_000.0).round() as i128);
    dt.checked_add(delta).ok_or_else(|| out_of_range(&dt))
}

fn add_months(dt: OffsetDateTime, months: i64) -> Result<OffsetDateTime, EvalError> {
    let total = (i64::from(dt.year()) * 12 + i64::from(u8::from(dt.month()) - 1))
        .checked_add(months)
        .ok_or_else(|| out_of_range(&dt))?;
    let year = i32::try_from(total.div_euclid(12)).map_err(|_| out_of_range(&dt))?;
    let month = u8::try_from(total.rem_euclid(12) + 1)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| out_of_range(&dt))?;

    // Days past the end of the target month spill into the next one.
    let first = Date::from_calendar_date(year, month, 1).map_err(|_| out_of_range(&dt))?;
    let date = first
        .checked_add(Duration::days(i64::from(dt.day()) - 1))
        .ok_or_else(|| out_of_range(&dt))?;
    Ok(dt.replace_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_bare_date_as_midnight_utc() {
        let dt = parse_time_str("2021-05-04").ok();
        assert_eq!(dt, Some(datetime!(2021-05-04 00:00:00 UTC)));
    }

    #[test]
    fn parses_timestamp_with_offset_and_fraction() {
        let dt = parse_time_str("2021-05-04T13:37:42.125+02:00").ok();
        assert_eq!(dt, Some(datetime!(2021-05-04 13:37:42.125 +02:00)));
    }

    #[test]
    fn missing_offset_defaults_to_utc() {
        let dt = parse_time_str("2021-05-04T13:37:42").ok();
        assert_eq!(dt, Some(datetime!(2021-05-04 13:37:42 UTC)));
    }

    #[test]
    fn rejects_lenient_forms() {
        for input in [
            "2021-5-4",
            "2021-05-04 13:37:42",
            "2021-02-30",
            "04.05.2021",
            "2021-05-04T25:00:00Z",
            "2021-05-04T13:37:42z",
            "2021-05-04T13:37:42+0200",
            "2021-05-04T13:37:42+02:0",
            "",
        ] {
            assert!(
                matches!(parse_time_str(input), Err(EvalError::InvalidTime { .. })),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn format_then_parse_is_identity() {
        let dt = datetime!(2020-02-29 23:59:59.001 -05:30);
        let back = parse_time_str(&format_time(&dt)).ok();
        assert_eq!(back, Some(dt));
    }

    #[test]
    fn http_date_is_in_gmt() {
        let dt = datetime!(2021-06-01 14:00:00 +02:00);
        assert_eq!(format_http_date(&dt), "Tue, 01 Jun 2021 12:00:00 GMT");
    }

    #[test]
    fn millis_since_epoch() {
        assert_eq!(to_millis(&datetime!(1970-01-02 00:00:00 UTC)), MILLIS_PER_DAY);
    }

    #[test]
    fn month_overflow_carries_into_year() {
        let dt = datetime!(2021-11-15 08:00:00 UTC);
        let r = plus_time(dt, &Value::Number(3.0), TimeUnit::Month).ok();
        assert_eq!(r, Some(datetime!(2022-02-15 08:00:00 UTC)));
        let r = plus_time(dt, &Value::Number(-11.0), TimeUnit::Month).ok();
        assert_eq!(r, Some(datetime!(2020-12-15 08:00:00 UTC)));
    }

    #[test]
    fn day_of_month_overflow_carries_into_next_month() {
        let dt = datetime!(2021-01-31 00:00:00 UTC);
        let r = plus_time(dt, &Value::Number(1.0), TimeUnit::Month).ok();
        assert_eq!(r, Some(datetime!(2021-03-03 00:00:00 UTC)));
    }

    #[test]
    fn twelve_months_equal_one_year() {
        let start = datetime!(2019-08-21 10:30:00 +01:00);
        let mut stepped = start;
        for _ in 0..12 {
            stepped = plus_time(stepped, &Value::Number(1.0), TimeUnit::Month)
                .unwrap_or(stepped);
        }
        let yearly = plus_time(start, &Value::Number(1.0), TimeUnit::Year).ok();
        assert_eq!(Some(stepped), yearly);
    }

    #[test]
    fn days_and_hours_are_fixed_durations() {
        let dt = datetime!(2021-03-27 12:00:00 UTC);
        let r = plus_time(dt, &Value::Number(1.5), TimeUnit::Day).ok();
        assert_eq!(r, Some(datetime!(2021-03-29 00:00:00 UTC)));
        let r = plus_time(dt, &Value::Number(-36.0), TimeUnit::Hour).ok();
        assert_eq!(r, Some(datetime!(2021-03-26 00:00:00 UTC)));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        assert!(matches!(
            TimeUnit::parse("week"),
            Err(EvalError::InvalidTimeUnit { .. })
        ));
    }
}
