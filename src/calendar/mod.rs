//! Row↔event calendar engine.
//!
//! Renders stored records as calendar events and keeps the two in sync
//! under direct manipulation. The leaf modules are pure (duration
//! arithmetic, color resolution, row→event mapping, diffing); the
//! reconciler and service compose them over the record store.

pub mod color;
pub mod config;
pub mod duration;
pub mod event;
pub mod forward;
pub mod mapper;
pub mod merge;
pub mod reconcile;
pub mod service;

pub use config::{
    AllDayBinding, AllDayRole, CalendarViewConfig, DisplayMode, DurationRole, FieldRoles,
    ViewTarget,
};
pub use duration::{DurationUnit, DURATION_EPSILON};
pub use event::{EventDescriptor, MutationDelta, MutationRequest};
pub use forward::{forward_state, state_filter, AmbientState, ForwardedState};
pub use mapper::map_row;
pub use merge::{merge_calendars, SiblingCalendar};
pub use reconcile::{stage_changes, Reconciler};
pub use service::{CalendarService, CalendarView, ConnectedDestinations};
