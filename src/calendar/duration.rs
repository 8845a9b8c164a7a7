//! Duration unit arithmetic.
//!
//! Duration-mode calendars store event length as a number of seconds,
//! minutes, hours, or days in a dedicated field. Durations are always
//! recomputed from absolute timestamps rather than adjusted by deltas,
//! so repeated edits cannot drift.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Value;

/// Comparison tolerance for float-typed duration fields. Differences
/// below this are rounding noise, not edits.
pub const DURATION_EPSILON: f64 = 1e-9;

/// Unit a duration field is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    #[default]
    Hours,
    Days,
}

impl DurationUnit {
    pub fn seconds_per_unit(&self) -> i64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3600,
            DurationUnit::Days => 86400,
        }
    }
}

/// Duration between two timestamps in the given unit. Integer-typed
/// targets truncate toward zero; float targets keep the fraction.
pub fn to_duration(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    unit: DurationUnit,
    is_float: bool,
) -> f64 {
    let raw =
        (end - start).num_milliseconds() as f64 / 1000.0 / unit.seconds_per_unit() as f64;
    if is_float {
        raw
    } else {
        raw.trunc()
    }
}

/// Whether a recomputed duration differs from the stored value. Exact
/// comparison for integers, epsilon comparison for floats. A missing or
/// non-numeric stored value counts as changed.
pub fn duration_changed(stored: Option<&Value>, computed: f64, is_float: bool) -> bool {
    if is_float {
        match stored.and_then(Value::as_f64) {
            Some(current) => (current - computed).abs() >= DURATION_EPSILON,
            None => true,
        }
    } else {
        match stored.and_then(Value::as_i64) {
            Some(current) => current != computed as i64,
            None => true,
        }
    }
}

/// Typed store value for a computed duration.
pub fn duration_value(computed: f64, is_float: bool) -> Value {
    if is_float {
        Value::Float(computed)
    } else {
        Value::Int(computed as i64)
    }
}

/// End timestamp implied by a start and a stored duration, rounded to
/// whole milliseconds.
pub fn end_from_duration(start: DateTime<Utc>, duration: f64, unit: DurationUnit) -> DateTime<Utc> {
    let millis = (duration * unit.seconds_per_unit() as f64 * 1000.0).round() as i64;
    start + Duration::milliseconds(millis)
}
