//! Ambient state forwarding and filtering.
//!
//! The ambient state is the view's current filter context, carried as a
//! flat key/value map (in the HTTP surface, query parameters). Rendered
//! rows are restricted by it, and destination views receive it minus the
//! temporal fields so they can derive their own date context.

use std::collections::HashMap;

use tracing::debug;

use crate::calendar::config::CalendarViewConfig;
use crate::store::{Field, RowFilter, Value};

/// Current filter context of a view.
pub type AmbientState = HashMap<String, Value>;

/// Ambient state passed on to destination views.
pub type ForwardedState = HashMap<String, Value>;

/// Copy the ambient state for a destination view, dropping the start
/// field and the end field (when one is configured) so a stale date
/// filter is never inherited.
pub fn forward_state(config: &CalendarViewConfig, ambient: &AmbientState) -> ForwardedState {
    ambient
        .iter()
        .filter(|(key, _)| {
            **key != config.start_field && Some(key.as_str()) != config.end_field.as_deref()
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Equality filter over the ambient keys that name real fields. Values
/// are coerced to the declared field type; unknown keys and uncoercible
/// values are skipped.
pub fn state_filter(fields: &[Field], ambient: &AmbientState) -> RowFilter {
    let mut filter = RowFilter::new();
    for (key, value) in ambient {
        let Some(field) = fields.iter().find(|f| f.name == *key) else {
            continue;
        };
        match value.coerce_to(&field.field_type) {
            Some(coerced) => {
                filter = filter.add_eq(key.clone(), coerced);
            }
            None => {
                debug!(field = %key, "ambient value does not fit the field type, skipping");
            }
        }
    }
    filter
}
