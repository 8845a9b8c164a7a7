//! Row→event mapping.
//!
//! A pure transform from one stored row to one event descriptor; all
//! store reads happen in the caller. A row with no usable start is a
//! data-integrity violation and surfaces as an error rather than being
//! silently defaulted.

use tracing::debug;

use crate::calendar::color::resolve_color;
use crate::calendar::config::{AllDayBinding, CalendarViewConfig, FieldRoles};
use crate::calendar::duration::end_from_duration;
use crate::calendar::event::{truncate_to_midnight, EventDescriptor};
use crate::calendar::forward::ForwardedState;
use crate::error::{MapError, Result};
use crate::store::{Row, Table, Value};

/// Map one row to its event descriptor under a view's resolved roles.
pub fn map_row(
    row: &Row,
    table: &Table,
    view_name: &str,
    config: &CalendarViewConfig,
    roles: &FieldRoles,
    forwarded_state: ForwardedState,
) -> Result<EventDescriptor> {
    let title = row
        .get(&roles.title)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let all_day = match &roles.all_day {
        AllDayBinding::Always => true,
        AllDayBinding::Field(name) => row.get(name).and_then(Value::as_bool).unwrap_or(false),
        AllDayBinding::None => false,
    };

    let start_value = row.get(&roles.start).unwrap_or(&Value::Null);
    let mut start = match start_value {
        Value::Null => {
            return Err(MapError::MissingStart {
                field: roles.start.clone(),
                row_id: row.id,
            }
            .into())
        }
        Value::Date(d) => *d,
        _ => {
            return Err(MapError::NotADate {
                field: roles.start.clone(),
            }
            .into())
        }
    };

    let mut end = if let Some(duration) = &roles.duration {
        match row.get(&duration.field).unwrap_or(&Value::Null) {
            Value::Null => None,
            value => match value.as_f64() {
                Some(length) => Some(end_from_duration(start, length, duration.unit)),
                None => {
                    debug!(field = %duration.field, row_id = row.id,
                        "non-numeric duration value, treating as unset");
                    None
                }
            },
        }
    } else if let Some(end_field) = &roles.end {
        match row.get(end_field).unwrap_or(&Value::Null) {
            Value::Null => None,
            Value::Date(d) => Some(*d),
            _ => {
                return Err(MapError::NotADate {
                    field: end_field.clone(),
                }
                .into())
            }
        }
    } else {
        None
    };

    if all_day {
        start = truncate_to_midnight(start);
        end = end.map(truncate_to_midnight);
    }
    if let Some(e) = end {
        if e < start {
            debug!(row_id = row.id, "end precedes start, dropping end");
            end = None;
        }
    }

    Ok(EventDescriptor {
        id: row.id,
        title,
        start,
        end,
        all_day,
        color: resolve_color(roles.color.as_deref(), row),
        source_table: table.name.clone(),
        source_table_id: table.id,
        source_view: view_name.to_string(),
        expand_target: config.expand_target(),
        create_target: config.create_target(),
        render_override: config.event_view.clone(),
        forwarded_state,
    })
}
