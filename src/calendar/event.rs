//! Event descriptors and client mutation requests.
//!
//! An `EventDescriptor` is derived from a row on every render or update
//! and never persisted. A `MutationRequest` is what the client sends
//! back after a drag, resize, or all-day toggle; it is consumed exactly
//! once by the reconciler.

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::config::ViewTarget;
use crate::calendar::forward::ForwardedState;
use crate::store::Value;

/// Calendar event derived from one row.
///
/// Invariants: when `all_day` is set, `start` and `end` carry no
/// time-of-day component; `start <= end` whenever both are defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Record id.
    pub id: i64,
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Origin table and view, for round-trip routing of merged events.
    pub source_table: String,
    pub source_table_id: i64,
    pub source_view: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_target: Option<ViewTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_target: Option<ViewTarget>,
    /// Rich per-event render override reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_override: Option<String>,
    #[serde(default, skip_serializing_if = "ForwardedState::is_empty")]
    pub forwarded_state: ForwardedState,
}

impl EventDescriptor {
    /// The no-op mutation a client would echo back unchanged: zero
    /// delta, same timestamps, same all-day flag.
    pub fn as_mutation(&self) -> MutationRequest {
        MutationRequest {
            record_id: self.id,
            table_id: self.source_table_id,
            delta: MutationDelta::default(),
            all_day: Some(self.all_day),
            start: Some(self.start.to_rfc3339()),
            end: self.end.map(|e| e.to_rfc3339()),
        }
    }
}

/// Calendar-aware offset a drag reports: whole years/months/days plus
/// a millisecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationDelta {
    pub years: i32,
    pub months: i32,
    pub days: i64,
    pub milliseconds: i64,
}

impl MutationDelta {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    /// Shift a timestamp by this delta. Month arithmetic clamps to the
    /// target month's last day; calendar overflow saturates to the
    /// input rather than failing.
    pub fn apply_to(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let months = self.years * 12 + self.months;
        let shifted = if months >= 0 {
            instant.checked_add_months(Months::new(months as u32))
        } else {
            instant.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        let shifted = shifted.unwrap_or(instant);
        let shifted = if self.days >= 0 {
            shifted.checked_add_days(Days::new(self.days as u64))
        } else {
            shifted.checked_sub_days(Days::new(self.days.unsigned_abs()))
        }
        .unwrap_or(shifted);
        shifted + Duration::milliseconds(self.milliseconds)
    }
}

/// Client-originated mutation of one event. Unparseable timestamp
/// strings are treated as absent, never as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub record_id: i64,
    pub table_id: i64,
    #[serde(default)]
    pub delta: MutationDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl MutationRequest {
    pub fn parsed_start(&self) -> Option<DateTime<Utc>> {
        self.start.as_deref().and_then(Value::parse_date)
    }

    pub fn parsed_end(&self) -> Option<DateTime<Utc>> {
        self.end.as_deref().and_then(Value::parse_date)
    }
}

/// Midnight truncation used for all-day normalization.
pub(crate) fn truncate_to_midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or(instant)
}
