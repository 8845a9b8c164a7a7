//! Service facade over the calendar engine.
//!
//! Holds the record store and the registered calendar views, and
//! exposes the request-level operations the HTTP surface calls: render,
//! reconcile, single-event refresh, and destination discovery. In a
//! production embedding the host's view system is the source of truth;
//! the registry here is the explicit value routing and merging consume.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{CallerIdentity, RoleId, PUBLIC_ROLE};
use crate::calendar::color::color_join_spec;
use crate::calendar::config::{CalendarViewConfig, DisplayMode};
use crate::calendar::event::{EventDescriptor, MutationRequest};
use crate::calendar::forward::{forward_state, state_filter, AmbientState, ForwardedState};
use crate::calendar::mapper::map_row;
use crate::calendar::merge::{merge_calendars, SiblingCalendar};
use crate::calendar::reconcile::Reconciler;
use crate::error::{CalviewError, ConfigError, Result, StoreError};
use crate::store::{RecordStore, Value};

/// A registered calendar view: a name, the table it renders, and its
/// field role config.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarView {
    pub name: String,
    pub table_id: i64,
    pub config: CalendarViewConfig,
}

/// Destination views reachable from a calendar and its siblings,
/// split by how they open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedDestinations {
    pub linked_views: Vec<String>,
    pub embedded_views: Vec<String>,
    pub tables: Vec<String>,
    pub forwarded_state: ForwardedState,
}

/// The calendar engine behind the HTTP surface.
pub struct CalendarService {
    store: Arc<dyn RecordStore>,
    public_role: RoleId,
    views: RwLock<Vec<CalendarView>>,
}

impl CalendarService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            public_role: PUBLIC_ROLE,
            views: RwLock::new(Vec::new()),
        }
    }

    /// Override the role anonymous callers act with.
    pub fn with_public_role(mut self, role: RoleId) -> Self {
        self.public_role = role;
        self
    }

    /// Register a calendar view. Names are unique; registration order
    /// decides routing precedence between views over the same table.
    pub fn register_view(&self, view: CalendarView) -> Result<()> {
        view.config.validate()?;
        let mut views = self.views.write().unwrap();
        if views.iter().any(|v| v.name == view.name) {
            return Err(ConfigError::Invalid(format!(
                "calendar view '{}' is already registered",
                view.name
            ))
            .into());
        }
        debug!(view = %view.name, table_id = view.table_id, "registered calendar view");
        views.push(view);
        Ok(())
    }

    pub fn view(&self, name: &str) -> Option<CalendarView> {
        self.views
            .read()
            .unwrap()
            .iter()
            .find(|v| v.name == name)
            .cloned()
    }

    pub fn views(&self) -> Vec<CalendarView> {
        self.views.read().unwrap().clone()
    }

    fn require_view(&self, name: &str) -> Result<CalendarView> {
        self.view(name)
            .ok_or_else(|| CalviewError::UnknownView(name.to_string()))
    }

    /// Every other registered calendar view, with its participation
    /// flag read from the ambient state under the sibling's own name.
    pub fn siblings_of(&self, view_name: &str, ambient: &AmbientState) -> Vec<SiblingCalendar> {
        self.views
            .read()
            .unwrap()
            .iter()
            .filter(|v| v.name != view_name)
            .map(|v| SiblingCalendar {
                enabled: ambient.get(&v.name).is_some_and(Value::is_truthy),
                view_name: v.name.clone(),
                table_id: v.table_id,
                config: v.config.clone(),
            })
            .collect()
    }

    /// Resolve which view's config handles a mutation against a table:
    /// the entry view when the table matches, otherwise the first
    /// registered view for that table.
    fn route_for_table(&self, entry: &CalendarView, table_id: i64) -> Result<CalendarView> {
        if entry.table_id == table_id {
            return Ok(entry.clone());
        }
        self.views
            .read()
            .unwrap()
            .iter()
            .find(|v| v.table_id == table_id)
            .cloned()
            .ok_or(CalviewError::UnknownTable(table_id))
    }

    /// Render the full event set for a view: its own rows under the
    /// ambient filter, merged with every enabled sibling calendar.
    pub async fn render(
        &self,
        view_name: &str,
        ambient: &AmbientState,
    ) -> Result<Vec<EventDescriptor>> {
        let view = self.require_view(view_name)?;
        let siblings = self.siblings_of(view_name, ambient);

        let table = self
            .store
            .find_table(view.table_id)
            .await?
            .ok_or(StoreError::TableNotFound(view.table_id))?;
        let fields = self.store.get_fields(table.id).await?;
        let roles = view.config.resolve_roles(&fields)?;
        let filter = state_filter(&fields, ambient);
        let rows = match color_join_spec(roles.color.as_deref()) {
            Some(join) => {
                self.store
                    .get_joined_rows(table.id, &filter, &[join])
                    .await?
            }
            None => self.store.get_rows(table.id, &filter).await?,
        };
        let forwarded = forward_state(&view.config, ambient);
        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(map_row(
                row,
                &table,
                &view.name,
                &view.config,
                &roles,
                forwarded.clone(),
            )?);
        }
        merge_calendars(events, &siblings, ambient, &*self.store).await
    }

    /// Apply a client mutation and return the fresh descriptor. The
    /// request is routed by its table id, so mutations of merged
    /// sibling events land on the sibling's own config.
    pub async fn reconcile(
        &self,
        view_name: &str,
        request: &MutationRequest,
        caller: &CallerIdentity,
    ) -> Result<EventDescriptor> {
        let entry = self.require_view(view_name)?;
        let routed = self.route_for_table(&entry, request.table_id)?;
        let table = self
            .store
            .find_table(request.table_id)
            .await?
            .ok_or(StoreError::TableNotFound(request.table_id))?;
        let reconciler = Reconciler::new(
            &*self.store,
            &table,
            &routed.name,
            &routed.config,
            self.public_role,
        );
        reconciler.run(request, caller).await
    }

    /// Re-read and re-map one event without a full render. A read:
    /// no role gate, routed like a mutation.
    pub async fn refresh_event(
        &self,
        view_name: &str,
        table_id: i64,
        record_id: i64,
        caller: &CallerIdentity,
    ) -> Result<EventDescriptor> {
        let entry = self.require_view(view_name)?;
        let routed = self.route_for_table(&entry, table_id)?;
        let table = self
            .store
            .find_table(table_id)
            .await?
            .ok_or(StoreError::TableNotFound(table_id))?;
        let fields = self.store.get_fields(table.id).await?;
        let roles = routed.config.resolve_roles(&fields)?;
        debug!(
            view = %routed.name,
            record_id,
            user = caller.user_id.as_deref().unwrap_or("anonymous"),
            "refreshing single event"
        );
        let reconciler = Reconciler::new(
            &*self.store,
            &table,
            &routed.name,
            &routed.config,
            self.public_role,
        );
        let row = reconciler.fetch_event_row(&roles, record_id).await?;
        map_row(
            &row,
            &table,
            &routed.name,
            &routed.config,
            &roles,
            ForwardedState::new(),
        )
    }

    /// Destination views reachable from this calendar and all of its
    /// registered siblings, plus the tables involved. The ambient state
    /// only feeds the forwarded context handed to destinations.
    pub async fn connected_destinations(
        &self,
        view_name: &str,
        ambient: &AmbientState,
    ) -> Result<ConnectedDestinations> {
        let view = self.require_view(view_name)?;
        let siblings = self.siblings_of(view_name, ambient);

        let mut linked_views = Vec::new();
        let mut embedded_views = Vec::new();
        let mut tables = Vec::new();

        let mut collect = |config: &CalendarViewConfig| {
            if let Some(event_view) = &config.event_view {
                push_unique(&mut embedded_views, event_view.clone());
            }
            for target in [config.expand_target(), config.create_target()]
                .into_iter()
                .flatten()
            {
                match target.display_mode {
                    DisplayMode::Link => push_unique(&mut linked_views, target.view),
                    DisplayMode::Popup => push_unique(&mut embedded_views, target.view),
                }
            }
        };

        collect(&view.config);
        for sibling in &siblings {
            collect(&sibling.config);
        }

        if let Some(table) = self.store.find_table(view.table_id).await? {
            push_unique(&mut tables, table.name);
        }
        for sibling in &siblings {
            if let Some(table) = self.store.find_table(sibling.table_id).await? {
                push_unique(&mut tables, table.name);
            }
        }

        Ok(ConnectedDestinations {
            linked_views,
            embedded_views,
            tables,
            forwarded_state: forward_state(&view.config, ambient),
        })
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
