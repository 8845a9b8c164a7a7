//! Multi-calendar merge.
//!
//! A calendar view can overlay the events of sibling calendar views
//! onto its own. The caller computes the explicit sibling list once;
//! the merge fetches each enabled sibling's rows under the same ambient
//! state and maps them with the sibling's own role config, tagging
//! every event with its source for round-trip routing.

use tracing::warn;

use crate::calendar::color::color_join_spec;
use crate::calendar::config::CalendarViewConfig;
use crate::calendar::event::EventDescriptor;
use crate::calendar::forward::{forward_state, state_filter, AmbientState};
use crate::calendar::mapper::map_row;
use crate::error::Result;
use crate::store::RecordStore;

/// One sibling calendar view, with its participation flag already
/// derived from the ambient state.
#[derive(Debug, Clone)]
pub struct SiblingCalendar {
    pub view_name: String,
    pub table_id: i64,
    pub config: CalendarViewConfig,
    pub enabled: bool,
}

/// Append the events of every enabled sibling to the primary event set,
/// in declaration order. The renderer sorts by start; no cross-calendar
/// ordering happens here.
///
/// A sibling whose config does not resolve is skipped whole; a sibling
/// row that fails to map is skipped alone. Store failures propagate.
pub async fn merge_calendars<S>(
    primary: Vec<EventDescriptor>,
    siblings: &[SiblingCalendar],
    ambient: &AmbientState,
    store: &S,
) -> Result<Vec<EventDescriptor>>
where
    S: RecordStore + ?Sized,
{
    let mut events = primary;
    for sibling in siblings.iter().filter(|s| s.enabled) {
        let Some(table) = store.find_table(sibling.table_id).await? else {
            warn!(view = %sibling.view_name, table_id = sibling.table_id,
                "sibling calendar's table is gone, skipping");
            continue;
        };
        let fields = store.get_fields(table.id).await?;
        let roles = match sibling.config.resolve_roles(&fields) {
            Ok(roles) => roles,
            Err(err) => {
                warn!(view = %sibling.view_name, error = %err,
                    "sibling calendar misconfigured, skipping");
                continue;
            }
        };
        let filter = state_filter(&fields, ambient);
        let rows = match color_join_spec(roles.color.as_deref()) {
            Some(join) => store.get_joined_rows(table.id, &filter, &[join]).await?,
            None => store.get_rows(table.id, &filter).await?,
        };
        let forwarded = forward_state(&sibling.config, ambient);
        for row in &rows {
            match map_row(
                row,
                &table,
                &sibling.view_name,
                &sibling.config,
                &roles,
                forwarded.clone(),
            ) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(view = %sibling.view_name, row_id = row.id, error = %err,
                        "skipping unmappable sibling row");
                }
            }
        }
    }
    Ok(events)
}
