//! CF time units and Modified Julian Day conversion.
//!
//! Exchange items carry their times as MJD. Files carry them as offsets in a
//! CF unit such as `days since 1970-01-01`. This module converts between the
//! two and recognises which units strings are time units at all.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// MJD of 1970-01-01T00:00:00Z
pub const MJD_OF_UNIX_EPOCH: f64 = 40587.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn millis_to_mjd(millis: i64) -> f64 {
    millis as f64 / MILLIS_PER_DAY + MJD_OF_UNIX_EPOCH
}

pub fn mjd_to_millis(mjd: f64) -> i64 {
    ((mjd - MJD_OF_UNIX_EPOCH) * MILLIS_PER_DAY).round() as i64
}

pub fn datetime_to_mjd(time: &DateTime<Utc>) -> f64 {
    millis_to_mjd(time.timestamp_millis())
}

pub fn mjd_to_datetime(mjd: f64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(mjd_to_millis(mjd))
}

/// Step of a CF time unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeStep {
    /// Convert a number of steps to days
    pub fn to_days(&self, steps: f64) -> f64 {
        match self {
            TimeStep::Milliseconds => steps / MILLIS_PER_DAY,
            TimeStep::Seconds => steps / 86_400.0,
            TimeStep::Minutes => steps / 1_440.0,
            TimeStep::Hours => steps / 24.0,
            TimeStep::Days => steps,
            TimeStep::Weeks => steps * 7.0,
        }
    }

    /// Convert a number of days to steps
    pub fn from_days(&self, days: f64) -> f64 {
        match self {
            TimeStep::Milliseconds => days * MILLIS_PER_DAY,
            TimeStep::Seconds => days * 86_400.0,
            TimeStep::Minutes => days * 1_440.0,
            TimeStep::Hours => days * 24.0,
            TimeStep::Days => days,
            TimeStep::Weeks => days / 7.0,
        }
    }

    fn parse(word: &str) -> Option<Self> {
        match word {
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Some(TimeStep::Milliseconds),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeStep::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeStep::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeStep::Hours),
            "d" | "day" | "days" => Some(TimeStep::Days),
            "week" | "weeks" => Some(TimeStep::Weeks),
            _ => None,
        }
    }
}

/// A parsed `<step> since <reference>` units string
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnit {
    pub step: TimeStep,
    pub reference: DateTime<Utc>,
}

impl TimeUnit {
    /// Parse a CF time units string such as
    /// `minutes since 1970-01-01 00:00:00.0 +0000`.
    pub fn parse(units: &str) -> Result<Self> {
        let invalid = || BridgeError::InvalidTimeUnit {
            unit: units.to_string(),
        };

        let (step, reference) = units.trim().split_once(" since ").ok_or_else(invalid)?;
        let step = TimeStep::parse(&step.trim().to_lowercase()).ok_or_else(invalid)?;
        let reference = parse_reference(reference).ok_or_else(invalid)?;

        Ok(Self { step, reference })
    }

    /// Whether a units string is a valid CF time unit
    pub fn is_time_unit(units: &str) -> bool {
        Self::parse(units).is_ok()
    }

    pub fn reference_mjd(&self) -> f64 {
        datetime_to_mjd(&self.reference)
    }

    /// Convert a stored value in this unit to MJD
    pub fn to_mjd(&self, value: f64) -> f64 {
        self.reference_mjd() + self.step.to_days(value)
    }

    /// Convert MJD to a stored value in this unit
    pub fn from_mjd(&self, mjd: f64) -> f64 {
        self.step.from_days(mjd - self.reference_mjd())
    }
}

impl FromStr for TimeUnit {
    type Err = BridgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TimeUnit::parse(s)
    }
}

/// Reference time layouts, tried in order. A zone offset such as `+0000`,
/// `+00:00` or `-01` may follow any of the layouts with a time of day.
const REFERENCE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the reference time of a units string, e.g. `1970-01-01`,
/// `1970-01-01T00:00:00Z` or `1970-01-01 00:00:00.0 +0000`.
fn parse_reference(reference: &str) -> Option<DateTime<Utc>> {
    let reference = strip_utc_designator(reference.trim());

    for format in REFERENCE_FORMATS {
        if let Ok(time) = NaiveDateTime::parse_from_str(reference, format) {
            return Some(time.and_utc());
        }
        if let Ok(time) = DateTime::parse_from_str(reference, &format!("{} %#z", format)) {
            return Some(time.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Drop a trailing `Z`, `UTC` or `GMT`
fn strip_utc_designator(reference: &str) -> &str {
    for designator in ["UTC", "GMT", "Z"] {
        let split = reference.len().saturating_sub(designator.len());
        let matches = reference
            .get(split..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(designator));
        if matches {
            return reference[..split].trim_end();
        }
    }
    reference
}

/// Render a reference time the way written time units carry it:
/// `1970-01-01 00:00:00.0 +0000`
pub fn format_reference_time(reference: &DateTime<Utc>) -> String {
    format!(
        "{}.{} {}",
        reference.format("%Y-%m-%d %H:%M:%S"),
        reference.timestamp_subsec_millis() / 100,
        reference.format("%z")
    )
}

/// Units string written on every time variable the bridge creates
pub fn create_time_unit_string() -> String {
    format!(
        "minutes since {}",
        format_reference_time(&DateTime::<Utc>::UNIX_EPOCH)
    )
}

/// Index of the time closest to `time`, if it lies within `tolerance`.
///
/// The tolerance is widened by a few ulps of the operands, since MJD values
/// around 1e4..1e5 cannot represent offsets of 1e-5 exactly.
pub fn find_matching_time_index(times: &[f64], time: f64, tolerance: f64) -> Option<usize> {
    let (index, candidate, distance) = times
        .iter()
        .enumerate()
        .map(|(i, &t)| (i, t, (t - time).abs()))
        .filter(|(_, _, distance)| !distance.is_nan())
        .min_by(|a, b| a.2.total_cmp(&b.2))?;

    let slack = 8.0 * f64::EPSILON * candidate.abs().max(time.abs());
    if distance <= tolerance + slack {
        Some(index)
    } else {
        None
    }
}
