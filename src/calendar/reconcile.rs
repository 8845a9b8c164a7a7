//! Event→row reconciliation.
//!
//! Turns a client mutation (drag, resize, all-day toggle) into a
//! minimal write against the underlying record: authorize, diff the
//! request against a single row snapshot, write only the staged fields,
//! then re-map and return the fresh descriptor. No retries, no partial
//! writes; an empty diff skips the write entirely so a client echoing
//! an event back causes no store traffic.

use tracing::debug;

use crate::auth::{CallerIdentity, RoleId};
use crate::calendar::color::color_join_spec;
use crate::calendar::config::{AllDayBinding, CalendarViewConfig, FieldRoles};
use crate::calendar::duration::{duration_changed, duration_value, to_duration};
use crate::calendar::event::{EventDescriptor, MutationRequest};
use crate::calendar::forward::ForwardedState;
use crate::calendar::mapper::map_row;
use crate::error::{ReconcileError, Result, StoreError};
use crate::store::{RecordStore, Row, RowFilter, RowPatch, Table, Value};

// ============================================================================
// Diffing
// ============================================================================

/// Diff a mutation request against a row snapshot, staging only the
/// fields that actually change.
///
/// Precedence is fixed: the all-day flag, then start, then exactly one
/// of {duration recompute, absolute end, delta-shifted end} selected by
/// the view's configuration. An explicit parseable `end` always wins
/// over the delta; unparseable timestamps are ignored.
pub fn stage_changes(roles: &FieldRoles, row: &Row, request: &MutationRequest) -> RowPatch {
    let mut patch = RowPatch::new();

    if let AllDayBinding::Field(name) = &roles.all_day {
        if let Some(requested) = request.all_day {
            let stored = row.get(name).and_then(Value::as_bool).unwrap_or(false);
            if requested != stored {
                patch.set(name.clone(), Value::Bool(requested));
            }
        }
    }

    let parsed_start = request.parsed_start();
    if request.start.is_some() && parsed_start.is_none() {
        debug!(row_id = row.id, "unparseable start timestamp, ignoring");
    }
    if let Some(new_start) = parsed_start {
        let stored = row.get(&roles.start).and_then(Value::as_date);
        if stored != Some(new_start) {
            patch.set(roles.start.clone(), Value::Date(new_start));
        }
    }

    let parsed_end = request.parsed_end();
    if request.end.is_some() && parsed_end.is_none() {
        debug!(row_id = row.id, "unparseable end timestamp, ignoring");
    }

    if let Some(duration) = &roles.duration {
        // Durations are recomputed from absolute timestamps, never
        // adjusted incrementally; that needs both ends of the interval.
        if let (Some(new_start), Some(new_end)) = (parsed_start, parsed_end) {
            let computed = to_duration(new_start, new_end, duration.unit, duration.is_float);
            if duration_changed(row.get(&duration.field), computed, duration.is_float) {
                patch.set(
                    duration.field.clone(),
                    duration_value(computed, duration.is_float),
                );
            }
        }
    } else if let Some(end_field) = &roles.end {
        if let Some(new_end) = parsed_end {
            let stored = row.get(end_field).and_then(Value::as_date);
            if stored != Some(new_end) {
                patch.set(end_field.clone(), Value::Date(new_end));
            }
        } else if request.all_day.is_some() && !request.delta.is_zero() {
            // All-day drags report no explicit end, only a delta; shift
            // the stored end by it to keep the event's length.
            if let Some(stored_end) = row.get(end_field).and_then(Value::as_date) {
                patch.set(
                    end_field.clone(),
                    Value::Date(request.delta.apply_to(stored_end)),
                );
            }
        }
    }

    patch
}

// ============================================================================
// Reconciler
// ============================================================================

/// One reconciliation cycle over one view and table. Phases run
/// sequentially per request over a single snapshot; terminal at the
/// response.
pub struct Reconciler<'a, S>
where
    S: RecordStore + ?Sized,
{
    store: &'a S,
    table: &'a Table,
    view_name: &'a str,
    config: &'a CalendarViewConfig,
    public_role: RoleId,
}

impl<'a, S> Reconciler<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        table: &'a Table,
        view_name: &'a str,
        config: &'a CalendarViewConfig,
        public_role: RoleId,
    ) -> Self {
        Self {
            store,
            table,
            view_name,
            config,
            public_role,
        }
    }

    /// Authorize, diff, write, and respond with the re-mapped event.
    pub async fn run(
        &self,
        request: &MutationRequest,
        caller: &CallerIdentity,
    ) -> Result<EventDescriptor> {
        let role = caller.acting_role(self.public_role);
        if role > self.table.min_role_write {
            return Err(ReconcileError::NotAuthorized {
                role,
                min_role_write: self.table.min_role_write,
            }
            .into());
        }

        let fields = self.store.get_fields(self.table.id).await?;
        let roles = self.config.resolve_roles(&fields)?;

        let row = self
            .store
            .get_row(self.table.id, request.record_id)
            .await?
            .ok_or(StoreError::RowNotFound {
                table: self.table.id,
                row: request.record_id,
            })?;

        let patch = stage_changes(&roles, &row, request);
        if patch.is_empty() {
            debug!(
                table_id = self.table.id,
                record_id = request.record_id,
                "mutation is a no-op, skipping write"
            );
        } else {
            debug!(
                table_id = self.table.id,
                record_id = request.record_id,
                fields = ?patch.field_names(),
                "staging row update"
            );
            self.store
                .update_row(self.table.id, request.record_id, patch, caller)
                .await?;
        }

        let row = self.fetch_event_row(&roles, request.record_id).await?;
        map_row(
            &row,
            self.table,
            self.view_name,
            self.config,
            &roles,
            ForwardedState::new(),
        )
    }

    /// Single-row fetch for mapping, joined when the color selector
    /// needs it.
    pub(crate) async fn fetch_event_row(&self, roles: &FieldRoles, row_id: i64) -> Result<Row> {
        let row = match color_join_spec(roles.color.as_deref()) {
            Some(join) => self
                .store
                .get_joined_rows(self.table.id, &RowFilter::by_id(row_id), &[join])
                .await?
                .into_iter()
                .next(),
            None => self.store.get_row(self.table.id, row_id).await?,
        };
        row.ok_or_else(|| {
            StoreError::RowNotFound {
                table: self.table.id,
                row: row_id,
            }
            .into()
        })
    }
}
