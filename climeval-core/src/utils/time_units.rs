//! Decoding of CF-style numeric time axes
//!
//! Time coordinates in gridded files are stored as offsets from a base date, described by a
//! units attribute of the form `"<unit> since <base date>"`, e.g. `"days since 1900-01-01"`.
//!
//! The base date is parsed by trying each pattern of [`TIME_BASE_FORMATS`] in order and keeping
//! the first that matches the whole string. The order matters for ambiguous strings and is part
//! of the public contract.
//!
//! ```rust
//! use climeval_core::utils::time_units::{decode_time_values, parse_time_units, TimeUnit};
//!
//! assert_eq!(parse_time_units("hours since 2000-01-01 00:00:00").unwrap(), TimeUnit::Hours);
//!
//! let times = decode_time_values(&[0.0, 1.0], "months since 2000-01-31").unwrap();
//! assert_eq!(times[1].to_string(), "2000-02-29 00:00:00");
//! ```

use crate::errors::{EvalError, EvalResult};
use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate base-date patterns, tried in order
pub const TIME_BASE_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%d %H-%M-%S",
    "%Y/%m/%d %H/%M/%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y%m%d %H:%M:%S",
    "%Y%m%d%H%M%S",
    "%Y-%m-%d-%H-%M-%S",
    "%Y/%m/%d/%H/%M/%S",
    "%Y:%m:%d:%H:%M:%S",
    "%Y-%m-%d-%H:%M:%S",
    "%Y/%m/%d%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y:%m:%d %H:%M",
    "%Y%m%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y:%m:%d",
    "%Y%m%d",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H",
];

/// Unit of a numeric time axis
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    /// Length of one unit in seconds, `None` for calendar units
    fn seconds(&self) -> Option<f64> {
        match self {
            TimeUnit::Seconds => Some(1.0),
            TimeUnit::Minutes => Some(60.0),
            TimeUnit::Hours => Some(3600.0),
            TimeUnit::Days => Some(86400.0),
            TimeUnit::Months | TimeUnit::Years => None,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        };
        write!(f, "{}", name)
    }
}

fn time_parse_error(units: &str, reason: impl Into<String>) -> EvalError {
    EvalError::TimeParse {
        units: units.to_string(),
        reason: reason.into(),
    }
}

fn split_units(units: &str) -> EvalResult<(&str, &str)> {
    let lower = units.to_ascii_lowercase();
    let index = lower
        .find(" since ")
        .ok_or_else(|| time_parse_error(units, "expected '<unit> since <base date>'"))?;
    Ok((units[..index].trim(), units[index + " since ".len()..].trim()))
}

/// Parse the unit token of `"<unit> since <base date>"`
///
/// Singular forms are accepted and matching is case-insensitive.
pub fn parse_time_units(units: &str) -> EvalResult<TimeUnit> {
    let (token, _) = split_units(units)?;
    let token = token.to_lowercase();
    let singular = token.strip_suffix('s').unwrap_or(&token);
    match singular {
        "second" | "sec" => Ok(TimeUnit::Seconds),
        "minute" | "min" => Ok(TimeUnit::Minutes),
        "hour" => Ok(TimeUnit::Hours),
        "day" => Ok(TimeUnit::Days),
        "month" => Ok(TimeUnit::Months),
        "year" => Ok(TimeUnit::Years),
        _ => Err(time_parse_error(
            units,
            format!("unrecognised time unit '{}'", token),
        )),
    }
}

fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    if !format.contains("%H") {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    } else if !format.contains("%M") {
        NaiveDateTime::parse_from_str(&format!("{}:00", value), &format!("{}:%M", format)).ok()
    } else {
        NaiveDateTime::parse_from_str(value, format).ok()
    }
}

/// Parse the base date of `"<unit> since <base date>"`
pub fn parse_time_base(units: &str) -> EvalResult<NaiveDateTime> {
    let (_, base) = split_units(units)?;
    TIME_BASE_FORMATS
        .iter()
        .find_map(|format| parse_with_format(base, format))
        .ok_or_else(|| time_parse_error(units, format!("unable to parse base date '{}'", base)))
}

/// Convert numeric offsets into timestamps
///
/// Second to day units are exact durations and accept fractional offsets. Month and year
/// offsets are calendar additions, truncated to whole months, that clamp the day of month.
pub fn decode_time_values(values: &[f64], units: &str) -> EvalResult<Vec<NaiveDateTime>> {
    let unit = parse_time_units(units)?;
    let base = parse_time_base(units)?;

    values
        .iter()
        .map(|value| {
            if !value.is_finite() {
                return Err(time_parse_error(
                    units,
                    format!("non-finite time value {}", value),
                ));
            }
            let decoded = match unit.seconds() {
                Some(seconds) => {
                    let micros = (value * seconds * 1e6).round();
                    if micros.abs() >= i64::MAX as f64 {
                        None
                    } else {
                        base.checked_add_signed(TimeDelta::microseconds(micros as i64))
                    }
                }
                None => {
                    let months = match unit {
                        TimeUnit::Years => value.trunc() * 12.0,
                        _ => value.trunc(),
                    };
                    if months.abs() > u32::MAX as f64 {
                        None
                    } else if months >= 0.0 {
                        base.checked_add_months(Months::new(months as u32))
                    } else {
                        base.checked_sub_months(Months::new((-months) as u32))
                    }
                }
            };
            decoded.ok_or_else(|| {
                time_parse_error(units, format!("time value {} is out of range", value))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn datetime(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    #[test]
    fn unit_tokens() {
        assert_eq!(parse_time_units("seconds since 1970-01-01").unwrap(), TimeUnit::Seconds);
        assert_eq!(parse_time_units("Minutes since 1970-01-01").unwrap(), TimeUnit::Minutes);
        assert_eq!(parse_time_units("hour since 1970-01-01").unwrap(), TimeUnit::Hours);
        assert_eq!(parse_time_units("days since 1970-01-01").unwrap(), TimeUnit::Days);
        assert_eq!(parse_time_units("months since 1970-01-01").unwrap(), TimeUnit::Months);
        assert_eq!(parse_time_units("years since 1970-01-01").unwrap(), TimeUnit::Years);
    }

    #[test]
    fn invalid_units() {
        assert!(matches!(
            parse_time_units("fortnights since 1970-01-01"),
            Err(EvalError::TimeParse { .. })
        ));
        assert!(matches!(
            parse_time_units("days"),
            Err(EvalError::TimeParse { .. })
        ));
        assert!(matches!(
            parse_time_base("days since the beginning"),
            Err(EvalError::TimeParse { .. })
        ));
    }

    #[test]
    fn formats_are_unique() {
        let unique: HashSet<_> = TIME_BASE_FORMATS.iter().collect();
        assert_eq!(unique.len(), TIME_BASE_FORMATS.len());
    }

    #[test]
    fn format_order_is_stable() {
        assert_eq!(TIME_BASE_FORMATS[0], "%Y:%m:%d %H:%M:%S");
        assert_eq!(TIME_BASE_FORMATS[3], "%Y-%m-%d %H:%M:%S");
        assert_eq!(TIME_BASE_FORMATS[16], "%Y-%m-%d");
        assert_eq!(TIME_BASE_FORMATS.last(), Some(&"%Y-%m-%d %H"));
    }

    #[test]
    fn base_dates() {
        let cases = [
            ("days since 1900:01:01 06:30:15", datetime(1900, 1, 1, 6, 30, 15)),
            ("days since 1900-01-01 06-30-15", datetime(1900, 1, 1, 6, 30, 15)),
            ("days since 1900/01/01 06:30:15", datetime(1900, 1, 1, 6, 30, 15)),
            ("days since 19000101063015", datetime(1900, 1, 1, 6, 30, 15)),
            ("days since 1900-01-01-06:30:15", datetime(1900, 1, 1, 6, 30, 15)),
            ("days since 1900-01-01 06:30", datetime(1900, 1, 1, 6, 30, 0)),
            ("days since 19000101 06:30", datetime(1900, 1, 1, 6, 30, 0)),
            ("days since 1900-01-01", datetime(1900, 1, 1, 0, 0, 0)),
            ("days since 1900/01/01", datetime(1900, 1, 1, 0, 0, 0)),
            ("days since 19000101", datetime(1900, 1, 1, 0, 0, 0)),
            ("days since 1900-01-01 06", datetime(1900, 1, 1, 6, 0, 0)),
        ];
        for (units, expected) in cases {
            assert_eq!(parse_time_base(units).unwrap(), expected, "{}", units);
        }
    }

    #[test]
    fn fractional_seconds() {
        let base = parse_time_base("seconds since 1900-01-01 00:00:00.5").unwrap();
        assert_eq!(base, datetime(1900, 1, 1, 0, 0, 0) + TimeDelta::milliseconds(500));
    }

    #[test]
    fn decode_exact_units() {
        let times = decode_time_values(&[0.0, 1.5, 31.0], "days since 2000-01-01").unwrap();
        assert_eq!(
            times,
            vec![
                datetime(2000, 1, 1, 0, 0, 0),
                datetime(2000, 1, 2, 12, 0, 0),
                datetime(2000, 2, 1, 0, 0, 0),
            ]
        );
        let hours = decode_time_values(&[-6.0], "hours since 2000-01-01").unwrap();
        assert_eq!(hours, vec![datetime(1999, 12, 31, 18, 0, 0)]);
    }

    #[test]
    fn decode_calendar_units() {
        let months = decode_time_values(&[0.0, 1.0, 13.0, -1.0], "months since 2000-01-15").unwrap();
        assert_eq!(
            months,
            vec![
                datetime(2000, 1, 15, 0, 0, 0),
                datetime(2000, 2, 15, 0, 0, 0),
                datetime(2001, 2, 15, 0, 0, 0),
                datetime(1999, 12, 15, 0, 0, 0),
            ]
        );
        let years = decode_time_values(&[2.0], "years since 2000-02-29").unwrap();
        assert_eq!(years, vec![datetime(2002, 2, 28, 0, 0, 0)]);
    }

    #[test]
    fn non_finite_offsets_fail() {
        assert!(decode_time_values(&[f64::NAN], "days since 2000-01-01").is_err());
    }
}
