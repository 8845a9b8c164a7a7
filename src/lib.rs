//! # calview
//!
//! Calendar view engine for tabular records: renders stored rows as
//! calendar events and keeps the two representations synchronized under
//! direct manipulation (drag, resize, all-day toggle).
//!
//! The core is the row↔event reconciliation engine: a pure projection
//! from rows to event descriptors, and an update protocol that turns a
//! client mutation into a minimal, authorized write against the
//! underlying record. Field semantics (date, duration, boolean, color,
//! foreign key) are honored throughout; durations are recomputed from
//! absolute timestamps so repeated edits cannot drift.
//!
//! Storage is abstracted behind [`store::RecordStore`]; the bundled
//! [`store::MemoryRecordStore`] backs tests and single-process
//! deployments. The HTTP surface in [`api`] exposes render, update,
//! single-event refresh, and destination discovery endpoints.

pub mod api;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod fixture;
pub mod store;

pub use auth::{CallerIdentity, RoleId, PUBLIC_ROLE};
pub use calendar::{
    CalendarService, CalendarView, CalendarViewConfig, EventDescriptor, MutationDelta,
    MutationRequest,
};
pub use error::{CalviewError, Result};
pub use store::{MemoryRecordStore, RecordStore};
