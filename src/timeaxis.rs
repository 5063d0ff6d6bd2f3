//! # Time Axis Decoding
//!
//! NetCDF files store time as numbers relative to a reference instant described by a
//! CF `units` attribute such as `"hours since 1970-01-01 00:00:00"`, interpreted in the
//! calendar named by the `calendar` attribute. This module turns those numbers into
//! calendar timestamps for frame labelling.
//!
//! Dates are converted through a per-calendar day count, so month lengths, leap years
//! and the 1582 Julian/Gregorian switch of the `standard` calendar all come out of the
//! same arithmetic:
//!
//! ```rust
//! use nc2gif::timeaxis::decode_time_axis;
//!
//! let times = decode_time_axis(&[0.0, 24.0, 48.0], "hours since 2024-02-28", None)?;
//! assert_eq!(times[1].to_string(), "2024-02-29 00:00:00");
//! assert_eq!(times[2].to_string(), "2024-03-01 00:00:00");
//! # Ok::<(), nc2gif::timeaxis::TimeAxisError>(())
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::{self, Write};
use thiserror::Error;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Julian day number of 1582-10-15, the first Gregorian day of the `standard` calendar.
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Julian day number of 1970-01-01 (proleptic Gregorian).
const UNIX_EPOCH_JDN: i64 = 2_440_588;

const CUMULATIVE_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const CUMULATIVE_DAYS_LEAP: [i64; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Errors raised while interpreting a time axis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeAxisError {
    #[error("malformed units string '{0}' (expected '<unit> since <reference date>')")]
    MalformedUnits(String),

    #[error("unsupported time unit '{0}'")]
    UnsupportedUnit(String),

    #[error("unit '{unit}' is only defined for the 360_day calendar, not {calendar}")]
    AmbiguousUnit { unit: String, calendar: String },

    #[error("unsupported calendar '{0}'")]
    UnsupportedCalendar(String),

    #[error("invalid reference date '{0}'")]
    InvalidReference(String),

    #[error("non-finite time value at index {0}")]
    NonFinite(usize),

    #[error("time value {0} is outside the representable range")]
    Overflow(f64),

    #[error("time axis is not strictly increasing at index {index} ({previous} -> {current})")]
    NotIncreasing {
        index: usize,
        previous: String,
        current: String,
    },
}

/// CF calendars understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Calendar {
    /// Mixed Julian/Gregorian calendar (`standard`, `gregorian`)
    Standard,
    ProlepticGregorian,
    Julian,
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`: twelve months of thirty days
    Day360,
}

impl Calendar {
    /// Parses a CF `calendar` attribute value (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, TimeAxisError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            _ => Err(TimeAxisError::UnsupportedCalendar(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    fn is_leap_year(&self, year: i64) -> bool {
        match self {
            Calendar::ProlepticGregorian => gregorian_leap(year),
            Calendar::Julian => year.rem_euclid(4) == 0,
            // Leap rule follows whichever half of the calendar the year falls in
            Calendar::Standard => {
                if year > 1582 {
                    gregorian_leap(year)
                } else {
                    year.rem_euclid(4) == 0
                }
            }
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
        }
    }

    /// Number of days in `month` (1-12) of `year`.
    pub fn days_in_month(&self, year: i64, month: u32) -> u32 {
        match (self, month) {
            (Calendar::Day360, _) => 30,
            (_, 2) => {
                if self.is_leap_year(year) {
                    29
                } else {
                    28
                }
            }
            (_, 4 | 6 | 9 | 11) => 30,
            _ => 31,
        }
    }

    fn validate_date(&self, year: i64, month: u32, day: u32) -> bool {
        if !(1..=12).contains(&month) || day == 0 || day > self.days_in_month(year, month) {
            return false;
        }
        // 1582-10-05 ..= 1582-10-14 were skipped by the reform
        !(*self == Calendar::Standard && year == 1582 && month == 10 && (5..15).contains(&day))
    }

    /// Day count of a civil date. The epoch is calendar specific; only differences
    /// within one calendar are meaningful.
    fn day_number(&self, year: i64, month: u32, day: u32) -> i64 {
        match self {
            Calendar::ProlepticGregorian => gregorian_to_jdn(year, month, day),
            Calendar::Julian => julian_to_jdn(year, month, day),
            Calendar::Standard => {
                if (year, month, day) >= (1582, 10, 15) {
                    gregorian_to_jdn(year, month, day)
                } else {
                    julian_to_jdn(year, month, day)
                }
            }
            Calendar::NoLeap => {
                year * 365 + CUMULATIVE_DAYS[(month - 1) as usize] + (day as i64 - 1)
            }
            Calendar::AllLeap => {
                year * 366 + CUMULATIVE_DAYS_LEAP[(month - 1) as usize] + (day as i64 - 1)
            }
            Calendar::Day360 => year * 360 + (month as i64 - 1) * 30 + (day as i64 - 1),
        }
    }

    /// Inverse of [`Calendar::day_number`].
    fn civil_from_day_number(&self, n: i64) -> (i64, u32, u32) {
        match self {
            Calendar::ProlepticGregorian => jdn_to_gregorian(n),
            Calendar::Julian => jdn_to_julian(n),
            Calendar::Standard => {
                if n >= GREGORIAN_REFORM_JDN {
                    jdn_to_gregorian(n)
                } else {
                    jdn_to_julian(n)
                }
            }
            Calendar::NoLeap => split_fixed_year(n, 365, &CUMULATIVE_DAYS),
            Calendar::AllLeap => split_fixed_year(n, 366, &CUMULATIVE_DAYS_LEAP),
            Calendar::Day360 => {
                let year = n.div_euclid(360);
                let day_of_year = n.rem_euclid(360);
                (year, (day_of_year / 30) as u32 + 1, (day_of_year % 30) as u32 + 1)
            }
        }
    }
}

fn gregorian_leap(year: i64) -> bool {
    (year.rem_euclid(4) == 0 && year.rem_euclid(100) != 0) || year.rem_euclid(400) == 0
}

// Days-from-civil in the proleptic Gregorian calendar, shifted to a Julian day number.
fn gregorian_to_jdn(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468 + UNIX_EPOCH_JDN
}

fn jdn_to_gregorian(jdn: i64) -> (i64, u32, u32) {
    let z = jdn - UNIX_EPOCH_JDN + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

fn julian_to_jdn(year: i64, month: u32, day: u32) -> i64 {
    let a = (14 - month as i64) / 12;
    let y = year + 4800 - a;
    let m = month as i64 + 12 * a - 3;
    day as i64 + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32_083
}

fn jdn_to_julian(jdn: i64) -> (i64, u32, u32) {
    let c = jdn + 32_082;
    let d = (4 * c + 3).div_euclid(1_461);
    let e = c - (1_461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = (e - (153 * m + 2) / 5 + 1) as u32;
    let month = (m + 3 - 12 * (m / 10)) as u32;
    let year = d - 4800 + m / 10;
    (year, month, day)
}

fn split_fixed_year(n: i64, year_len: i64, cumulative: &[i64; 12]) -> (i64, u32, u32) {
    let year = n.div_euclid(year_len);
    let day_of_year = n.rem_euclid(year_len);
    let month_index = cumulative
        .iter()
        .rposition(|&start| start <= day_of_year)
        .unwrap_or(0);
    let day = day_of_year - cumulative[month_index] + 1;
    (year, month_index as u32 + 1, day as u32)
}

/// Unit of the numeric offsets on a time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    /// Thirty days; only meaningful with the 360_day calendar
    Months,
    /// 360 days; only meaningful with the 360_day calendar
    Years,
}

impl TimeUnit {
    fn parse(token: &str) -> Result<Self, TimeAxisError> {
        match token.to_ascii_lowercase().as_str() {
            "microseconds" | "microsecond" | "us" | "usec" | "usecs" => Ok(TimeUnit::Microseconds),
            "milliseconds" | "millisecond" | "ms" | "msec" | "msecs" => Ok(TimeUnit::Milliseconds),
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "minute" | "mins" | "min" => Ok(TimeUnit::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(TimeUnit::Hours),
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            "weeks" | "week" => Ok(TimeUnit::Weeks),
            "months" | "month" => Ok(TimeUnit::Months),
            "years" | "year" | "yr" => Ok(TimeUnit::Years),
            _ => Err(TimeAxisError::UnsupportedUnit(token.to_string())),
        }
    }

    fn micros(&self, calendar: Calendar) -> Result<i64, TimeAxisError> {
        let micros = match self {
            TimeUnit::Microseconds => 1,
            TimeUnit::Milliseconds => 1_000,
            TimeUnit::Seconds => MICROS_PER_SECOND,
            TimeUnit::Minutes => 60 * MICROS_PER_SECOND,
            TimeUnit::Hours => 3_600 * MICROS_PER_SECOND,
            TimeUnit::Days => MICROS_PER_DAY,
            TimeUnit::Weeks => 7 * MICROS_PER_DAY,
            TimeUnit::Months | TimeUnit::Years if calendar != Calendar::Day360 => {
                return Err(TimeAxisError::AmbiguousUnit {
                    unit: format!("{:?}", self).to_lowercase(),
                    calendar: calendar.name().to_string(),
                });
            }
            TimeUnit::Months => 30 * MICROS_PER_DAY,
            TimeUnit::Years => 360 * MICROS_PER_DAY,
        };
        Ok(micros)
    }
}

/// A decoded timestamp in a CF calendar, always expressed in UTC.
///
/// Kept separate from chrono types because non-standard calendars contain dates
/// (such as 30 February in `360_day`) that chrono cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfDateTime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
    pub calendar: Calendar,
}

impl CfDateTime {
    fn from_micros(total: i64, calendar: Calendar) -> Self {
        let day_number = total.div_euclid(MICROS_PER_DAY);
        let within_day = total.rem_euclid(MICROS_PER_DAY);
        let (year, month, day) = calendar.civil_from_day_number(day_number);
        let seconds = within_day / MICROS_PER_SECOND;
        CfDateTime {
            year,
            month,
            day,
            hour: (seconds / 3_600) as u32,
            minute: (seconds % 3_600 / 60) as u32,
            second: (seconds % 60) as u32,
            microsecond: (within_day % MICROS_PER_SECOND) as u32,
            calendar,
        }
    }

    /// The same wall-clock date as a chrono value, when it exists in the Gregorian calendar.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let year = i32::try_from(self.year).ok()?;
        NaiveDate::from_ymd_opt(year, self.month, self.day)?.and_hms_micro_opt(
            self.hour,
            self.minute,
            self.second,
            self.microsecond,
        )
    }

    /// Formats with a chrono strftime pattern, falling back to `YYYY-MM-DD` for
    /// dates chrono cannot hold or patterns it rejects.
    pub fn format(&self, pattern: &str) -> String {
        if let Some(naive) = self.to_naive() {
            let mut out = String::new();
            if write!(out, "{}", naive.format(pattern)).is_ok() {
                return out;
            }
        }
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for CfDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// A parsed CF units string: `<unit> since <reference>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub year: i64,
    pub month: u32,
    pub day: u32,
    /// Reference time of day in microseconds, already shifted to UTC
    pub time_of_day_us: i64,
}

impl TimeUnits {
    /// Parses strings such as `days since 2023-1-1`, `hours since 1970-01-01 00:00:00`,
    /// `seconds since 2000-01-01T12:00:00Z` or `minutes since 2010-06-01 06:00 +05:30`.
    pub fn parse(units: &str) -> Result<Self, TimeAxisError> {
        let malformed = || TimeAxisError::MalformedUnits(units.to_string());

        let mut tokens = units.split_whitespace();
        let unit = TimeUnit::parse(tokens.next().ok_or_else(malformed)?)?;
        match tokens.next() {
            Some(word) if word.eq_ignore_ascii_case("since") => {}
            _ => return Err(malformed()),
        }
        let reference: Vec<&str> = tokens.collect();
        if reference.is_empty() {
            return Err(malformed());
        }

        let invalid = || TimeAxisError::InvalidReference(reference.join(" "));

        // "2000-01-01T12:00:00Z" arrives as one token
        let (date_part, mut rest): (&str, Vec<&str>) = match reference[0].split_once('T') {
            Some((date, time)) => (
                date,
                std::iter::once(time)
                    .chain(reference[1..].iter().copied())
                    .collect(),
            ),
            None => (reference[0], reference[1..].to_vec()),
        };

        let (year, month, day) = parse_date(date_part).ok_or_else(invalid)?;

        let mut time_of_day_us = 0;
        let mut offset_minutes = 0;
        if let Some(first) = rest.first().copied() {
            if first.contains(':') || first.chars().all(|c| c.is_ascii_digit() || c == '.') {
                let (clock, attached_zone) = split_attached_zone(first);
                time_of_day_us = parse_clock(clock).ok_or_else(invalid)?;
                rest.remove(0);
                if let Some(zone) = attached_zone {
                    rest.insert(0, zone);
                }
            }
        }
        if let Some(zone) = rest.first() {
            offset_minutes = parse_zone(zone).ok_or_else(invalid)?;
            if rest.len() > 1 {
                return Err(invalid());
            }
        }

        if !(1..=12).contains(&month) || day == 0 || day > 31 {
            return Err(invalid());
        }

        Ok(TimeUnits {
            unit,
            year,
            month,
            day,
            time_of_day_us: time_of_day_us - offset_minutes * 60 * MICROS_PER_SECOND,
        })
    }

    /// Microsecond count of the reference instant in `calendar`'s day numbering.
    fn reference_micros(&self, calendar: Calendar) -> Result<i64, TimeAxisError> {
        if !calendar.validate_date(self.year, self.month, self.day) {
            return Err(TimeAxisError::InvalidReference(format!(
                "{:04}-{:02}-{:02} does not exist in the {} calendar",
                self.year,
                self.month,
                self.day,
                calendar.name()
            )));
        }
        let days = calendar.day_number(self.year, self.month, self.day);
        days.checked_mul(MICROS_PER_DAY)
            .and_then(|us| us.checked_add(self.time_of_day_us))
            .ok_or(TimeAxisError::Overflow(days as f64))
    }

    fn decode_from(&self, reference: i64, value: f64, calendar: Calendar) -> Result<CfDateTime, TimeAxisError> {
        let offset = value * self.unit.micros(calendar)? as f64;
        if !offset.is_finite() || offset.abs() > i64::MAX as f64 / 2.0 {
            return Err(TimeAxisError::Overflow(value));
        }
        let total = reference
            .checked_add(offset.round() as i64)
            .ok_or(TimeAxisError::Overflow(value))?;
        Ok(CfDateTime::from_micros(total, calendar))
    }
}

fn parse_date(text: &str) -> Option<(i64, u32, u32)> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(stripped) => (true, stripped),
        None => (false, text),
    };
    let mut parts = body.split('-');
    let year: i64 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next().map_or(Some(1), |m| m.parse().ok())?;
    let day: u32 = parts.next().map_or(Some(1), |d| d.parse().ok())?;
    if parts.next().is_some() {
        return None;
    }
    Some((if negative { -year } else { year }, month, day))
}

// "00:00:00+05:30" -> ("00:00:00", Some("+05:30")), "12:00:00Z" -> ("12:00:00", Some("Z"))
fn split_attached_zone(token: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = token.strip_suffix('Z') {
        return (stripped, Some("Z"));
    }
    match token.find(['+', '-']) {
        Some(pos) if pos > 0 => (&token[..pos], Some(&token[pos..])),
        _ => (token, None),
    }
}

fn parse_clock(text: &str) -> Option<i64> {
    let mut parts = text.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next().map_or(Some(0), |m| m.parse().ok())?;
    let seconds: f64 = parts.next().map_or(Some(0.0), |s| s.parse().ok())?;
    if parts.next().is_some() || hours > 24 || minutes > 59 || !(0.0..61.0).contains(&seconds) {
        return None;
    }
    Some((hours * 3_600 + minutes * 60) * MICROS_PER_SECOND + (seconds * MICROS_PER_SECOND as f64).round() as i64)
}

/// Returns the zone offset east of UTC in minutes.
fn parse_zone(text: &str) -> Option<i64> {
    if matches!(text.to_ascii_uppercase().as_str(), "Z" | "UTC" | "GMT") {
        return Some(0);
    }
    let (sign, body) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => (1, text),
    };
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<i64>().ok()?, m.parse::<i64>().ok()?),
        None if body.len() == 4 => (body[..2].parse().ok()?, body[2..].parse().ok()?),
        None => (body.parse().ok()?, 0),
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

/// Decodes every value of a time axis.
///
/// `calendar` is the raw `calendar` attribute; `None` means `standard`, as in CF.
pub fn decode_time_axis(
    values: &[f64],
    units: &str,
    calendar: Option<&str>,
) -> Result<Vec<CfDateTime>, TimeAxisError> {
    let calendar = calendar.map(Calendar::parse).transpose()?.unwrap_or(Calendar::Standard);
    let units = TimeUnits::parse(units)?;
    let reference = units.reference_micros(calendar)?;

    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if !value.is_finite() {
                return Err(TimeAxisError::NonFinite(index));
            }
            units.decode_from(reference, value, calendar)
        })
        .collect()
}

/// Fails on the first timestamp that does not come strictly after its predecessor.
pub fn ensure_strictly_increasing(times: &[CfDateTime]) -> Result<(), TimeAxisError> {
    for (index, pair) in times.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(TimeAxisError::NotIncreasing {
                index: index + 1,
                previous: pair[0].to_string(),
                current: pair[1].to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(t: &CfDateTime) -> (i64, u32, u32) {
        (t.year, t.month, t.day)
    }

    #[test]
    fn test_hours_since_epoch_across_leap_day() {
        // 2024-02-28 00:00 UTC is 473 256 hours after the Unix epoch
        let base = 473_256.0;
        let times = decode_time_axis(
            &[base, base + 24.0, base + 48.0],
            "hours since 1970-01-01 00:00:00",
            Some("gregorian"),
        )
        .unwrap();
        assert_eq!(ymd(&times[0]), (2024, 2, 28));
        assert_eq!(ymd(&times[1]), (2024, 2, 29));
        assert_eq!(ymd(&times[2]), (2024, 3, 1));
    }

    #[test]
    fn test_non_leap_year_february() {
        let times = decode_time_axis(&[58.0, 59.0], "days since 2023-1-1", None).unwrap();
        assert_eq!(ymd(&times[0]), (2023, 2, 28));
        assert_eq!(ymd(&times[1]), (2023, 3, 1));
    }

    #[test]
    fn test_century_leap_rules() {
        // 1900 is not a Gregorian leap year, 2000 is
        let t = decode_time_axis(&[59.0], "days since 1900-01-01", None).unwrap();
        assert_eq!(ymd(&t[0]), (1900, 3, 1));
        let t = decode_time_axis(&[59.0], "days since 2000-01-01", None).unwrap();
        assert_eq!(ymd(&t[0]), (2000, 2, 29));
    }

    #[test]
    fn test_known_reference_conversions() {
        let t = decode_time_axis(&[1_700_000_000.0], "seconds since 1970-01-01T00:00:00Z", None).unwrap();
        assert_eq!(t[0].to_string(), "2023-11-14 22:13:20");

        let t = decode_time_axis(&[45_000.0], "days since 1900-01-01", Some("standard")).unwrap();
        assert_eq!(ymd(&t[0]), (2023, 3, 17));
    }

    #[test]
    fn test_fractional_values() {
        let t = decode_time_axis(&[1.5], "days since 2023-06-01 00:00:00", None).unwrap();
        assert_eq!(t[0].to_string(), "2023-06-02 12:00:00");

        let t = decode_time_axis(&[0.25], "hours since 2023-06-01", None).unwrap();
        assert_eq!((t[0].hour, t[0].minute), (0, 15));
    }

    #[test]
    fn test_negative_offsets() {
        let t = decode_time_axis(&[-1.0], "days since 2024-03-01", None).unwrap();
        assert_eq!(ymd(&t[0]), (2024, 2, 29));
    }

    #[test]
    fn test_timezone_in_reference() {
        let t = decode_time_axis(&[0.0], "hours since 2023-07-15 05:30:00 +05:30", None).unwrap();
        assert_eq!(t[0].to_string(), "2023-07-15 00:00:00");

        let t = decode_time_axis(&[0.0], "hours since 2023-07-15T00:00:00-02:00", None).unwrap();
        assert_eq!(t[0].to_string(), "2023-07-15 02:00:00");
    }

    #[test]
    fn test_standard_calendar_reform_gap() {
        // The day after 1582-10-04 (Julian) is 1582-10-15 (Gregorian)
        let t = decode_time_axis(&[1.0], "days since 1582-10-04", Some("standard")).unwrap();
        assert_eq!(ymd(&t[0]), (1582, 10, 15));

        // The proleptic Gregorian calendar has no gap
        let t = decode_time_axis(&[1.0], "days since 1582-10-04", Some("proleptic_gregorian")).unwrap();
        assert_eq!(ymd(&t[0]), (1582, 10, 5));

        assert!(decode_time_axis(&[0.0], "days since 1582-10-10", Some("standard")).is_err());
    }

    #[test]
    fn test_julian_calendar() {
        // 1900 is a leap year in the Julian calendar
        let t = decode_time_axis(&[59.0], "days since 1900-01-01", Some("julian")).unwrap();
        assert_eq!(ymd(&t[0]), (1900, 2, 29));
    }

    #[test]
    fn test_noleap_and_all_leap_calendars() {
        let t = decode_time_axis(&[59.0, 365.0], "days since 2024-01-01", Some("noleap")).unwrap();
        assert_eq!(ymd(&t[0]), (2024, 3, 1));
        assert_eq!(ymd(&t[1]), (2025, 1, 1));

        let t = decode_time_axis(&[59.0], "days since 2023-01-01", Some("366_day")).unwrap();
        assert_eq!(ymd(&t[0]), (2023, 2, 29));
    }

    #[test]
    fn test_360_day_calendar() {
        let t = decode_time_axis(&[59.0, 360.0], "days since 2000-01-01", Some("360_day")).unwrap();
        assert_eq!(ymd(&t[0]), (2000, 2, 30));
        assert_eq!(ymd(&t[1]), (2001, 1, 1));
        // 30 February has no chrono equivalent, formatting falls back to ISO
        assert!(t[0].to_naive().is_none());
        assert_eq!(t[0].format("%d %B %Y"), "2000-02-30");

        let t = decode_time_axis(&[2.0], "months since 2000-01-01", Some("360_day")).unwrap();
        assert_eq!(ymd(&t[0]), (2000, 3, 1));
    }

    #[test]
    fn test_months_rejected_outside_360_day() {
        let err = decode_time_axis(&[1.0], "months since 2000-01-01", None).unwrap_err();
        assert!(matches!(err, TimeAxisError::AmbiguousUnit { .. }));
    }

    #[test]
    fn test_malformed_units() {
        assert!(matches!(
            TimeUnits::parse("hours"),
            Err(TimeAxisError::MalformedUnits(_))
        ));
        assert!(matches!(
            TimeUnits::parse("hours after 2000-01-01"),
            Err(TimeAxisError::MalformedUnits(_))
        ));
        assert!(matches!(
            TimeUnits::parse("fortnights since 2000-01-01"),
            Err(TimeAxisError::UnsupportedUnit(_))
        ));
        assert!(matches!(
            TimeUnits::parse("days since 2000-13-01"),
            Err(TimeAxisError::InvalidReference(_))
        ));
        assert!(matches!(
            Calendar::parse("martian"),
            Err(TimeAxisError::UnsupportedCalendar(_))
        ));
    }

    #[test]
    fn test_non_finite_value() {
        let err = decode_time_axis(&[0.0, f64::NAN], "days since 2000-01-01", None).unwrap_err();
        assert_eq!(err, TimeAxisError::NonFinite(1));
    }

    #[test]
    fn test_format_patterns() {
        let t = decode_time_axis(&[195.0], "days since 2023-01-01", None).unwrap();
        assert_eq!(t[0].format("%d %B %Y"), "15 July 2023");
        assert_eq!(t[0].format("%Y-%m-%d"), "2023-07-15");
    }

    #[test]
    fn test_strictly_increasing() {
        let times = decode_time_axis(&[0.0, 1.0, 2.0], "days since 2023-07-01", None).unwrap();
        assert!(ensure_strictly_increasing(&times).is_ok());

        let times = decode_time_axis(&[0.0, 2.0, 2.0], "days since 2023-07-01", None).unwrap();
        let err = ensure_strictly_increasing(&times).unwrap_err();
        assert!(matches!(err, TimeAxisError::NotIncreasing { index: 2, .. }));
    }

    #[test]
    fn test_day_number_roundtrip_all_calendars() {
        let calendars = [
            Calendar::Standard,
            Calendar::ProlepticGregorian,
            Calendar::Julian,
            Calendar::NoLeap,
            Calendar::AllLeap,
            Calendar::Day360,
        ];
        for calendar in calendars {
            for (y, m, d) in [(1, 1, 1), (1600, 2, 28), (1999, 12, 30), (2024, 2, 28), (2100, 11, 30)] {
                let n = calendar.day_number(y, m, d);
                assert_eq!(calendar.civil_from_day_number(n), (y, m, d), "{:?}", calendar);
            }
        }
    }
}
