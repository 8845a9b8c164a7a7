//! Per-view field role configuration.
//!
//! A calendar view binds field names on its table to calendar roles
//! (title, start, end or duration, all-day flag, color) plus the
//! destinations opened on click/create. The config is owned by the
//! enclosing view and immutable per render; role lookups are resolved
//! once into a `FieldRoles` and never re-derived ad hoc.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::duration::DurationUnit;
use crate::error::{ConfigError, ReconcileError, Result};
use crate::store::{Field, FieldType};

// ============================================================================
// Configuration types
// ============================================================================

/// How a destination view opens from the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "pop-up")]
    Popup,
}

/// A destination view tagged with how it opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTarget {
    pub view: String,
    pub display_mode: DisplayMode,
}

/// All-day role: a literal sentinel or the name of a Bool field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AllDayRole {
    /// Every event on this calendar is all-day.
    Always,
    /// Per-row Bool field.
    Field(String),
}

impl From<String> for AllDayRole {
    fn from(raw: String) -> Self {
        if raw == "Always" {
            AllDayRole::Always
        } else {
            AllDayRole::Field(raw)
        }
    }
}

impl From<AllDayRole> for String {
    fn from(role: AllDayRole) -> Self {
        match role {
            AllDayRole::Always => "Always".to_string(),
            AllDayRole::Field(name) => name,
        }
    }
}

/// Field role bindings and client behavior flags for one calendar view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarViewConfig {
    /// String field shown as the event name.
    pub title_field: String,
    /// Date field every event starts at.
    pub start_field: String,
    /// Date field the event ends at; used when duration mode is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_field: Option<String>,
    /// Int or Float field holding the event length; duration mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_field: Option<String>,
    /// Unit the duration field is denominated in.
    #[serde(default)]
    pub duration_units: DurationUnit,
    /// Selects duration mode over absolute-end mode.
    #[serde(default)]
    pub switch_to_duration: bool,
    /// All-day role, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allday_field: Option<AllDayRole>,
    /// Color selector: a Color field name, or `fk_field.color_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_color: Option<String>,
    /// View opened when an event is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_view: Option<String>,
    #[serde(default)]
    pub expand_display_mode: DisplayMode,
    /// View opened to create a new event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_to_create: Option<String>,
    #[serde(default)]
    pub create_display_mode: DisplayMode,
    /// Per-event rich render override reference, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_view: Option<String>,
    /// Client behavior flags, stored and forwarded but never acted on.
    #[serde(default)]
    pub reload_on_drag_resize: bool,
    #[serde(default)]
    pub reload_on_edit_in_pop_up: bool,
}

impl CalendarViewConfig {
    pub fn new(title_field: impl Into<String>, start_field: impl Into<String>) -> Self {
        Self {
            title_field: title_field.into(),
            start_field: start_field.into(),
            end_field: None,
            duration_field: None,
            duration_units: DurationUnit::default(),
            switch_to_duration: false,
            allday_field: None,
            event_color: None,
            expand_view: None,
            expand_display_mode: DisplayMode::default(),
            view_to_create: None,
            create_display_mode: DisplayMode::default(),
            event_view: None,
            reload_on_drag_resize: false,
            reload_on_edit_in_pop_up: false,
        }
    }

    pub fn with_end_field(mut self, field: impl Into<String>) -> Self {
        self.end_field = Some(field.into());
        self
    }

    /// Switches the view to duration mode over the given field.
    pub fn with_duration_field(mut self, field: impl Into<String>, units: DurationUnit) -> Self {
        self.duration_field = Some(field.into());
        self.duration_units = units;
        self.switch_to_duration = true;
        self
    }

    pub fn with_allday(mut self, role: AllDayRole) -> Self {
        self.allday_field = Some(role);
        self
    }

    pub fn with_event_color(mut self, selector: impl Into<String>) -> Self {
        self.event_color = Some(selector.into());
        self
    }

    pub fn with_expand_view(mut self, view: impl Into<String>, mode: DisplayMode) -> Self {
        self.expand_view = Some(view.into());
        self.expand_display_mode = mode;
        self
    }

    pub fn with_create_view(mut self, view: impl Into<String>, mode: DisplayMode) -> Self {
        self.view_to_create = Some(view.into());
        self.create_display_mode = mode;
        self
    }

    pub fn with_event_view(mut self, view: impl Into<String>) -> Self {
        self.event_view = Some(view.into());
        self
    }

    /// Destination opened on event click, if configured.
    pub fn expand_target(&self) -> Option<ViewTarget> {
        self.expand_view.as_ref().map(|view| ViewTarget {
            view: view.clone(),
            display_mode: self.expand_display_mode,
        })
    }

    /// Destination for creating a new event, if configured.
    pub fn create_target(&self) -> Option<ViewTarget> {
        self.view_to_create.as_ref().map(|view| ViewTarget {
            view: view.clone(),
            display_mode: self.create_display_mode,
        })
    }

    /// Internal consistency checks, run at view registration. Field
    /// existence is deliberately not checked here: a duration field
    /// missing from the table surfaces per request as
    /// `DurationFieldMissing`.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.title_field.is_empty() {
            return Err(ConfigError::Invalid("title_field must be set".to_string()));
        }
        if self.start_field.is_empty() {
            return Err(ConfigError::Invalid("start_field must be set".to_string()));
        }
        if self.switch_to_duration && self.duration_field.is_none() {
            return Err(ConfigError::Invalid(
                "switch_to_duration requires duration_field".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the configured field names against a table's declared
    /// fields. Done once per request or render; downstream logic reads
    /// roles, never raw config strings.
    pub fn resolve_roles(&self, fields: &[Field]) -> Result<FieldRoles> {
        let duration = if self.switch_to_duration {
            let name = self.duration_field.as_deref().ok_or_else(|| {
                ConfigError::Invalid("switch_to_duration requires duration_field".to_string())
            })?;
            let field = fields.iter().find(|f| f.name == name).ok_or_else(|| {
                ReconcileError::DurationFieldMissing {
                    field: name.to_string(),
                }
            })?;
            let is_float = match field.field_type {
                FieldType::Float => true,
                FieldType::Int => false,
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "duration field '{name}' must be int or float"
                    ))
                    .into())
                }
            };
            Some(DurationRole {
                field: name.to_string(),
                unit: self.duration_units,
                is_float,
            })
        } else {
            None
        };

        let end = if self.switch_to_duration {
            None
        } else {
            self.end_field.clone()
        };

        let all_day = match &self.allday_field {
            None => AllDayBinding::None,
            Some(AllDayRole::Always) => AllDayBinding::Always,
            Some(AllDayRole::Field(name)) => {
                let bound = fields
                    .iter()
                    .any(|f| f.name == *name && f.field_type == FieldType::Bool);
                if bound {
                    AllDayBinding::Field(name.clone())
                } else {
                    debug!(field = %name, "all-day field absent or not bool, ignoring");
                    AllDayBinding::None
                }
            }
        };

        Ok(FieldRoles {
            title: self.title_field.clone(),
            start: self.start_field.clone(),
            end,
            duration,
            all_day,
            color: self.event_color.clone(),
        })
    }
}

// ============================================================================
// Resolved roles
// ============================================================================

/// Duration role resolved against the table: field, unit, and whether
/// the field keeps fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationRole {
    pub field: String,
    pub unit: DurationUnit,
    pub is_float: bool,
}

/// Resolved all-day binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllDayBinding {
    None,
    Always,
    Field(String),
}

/// Field roles resolved once per request. Exactly one of `end` and
/// `duration` is populated, selected by the duration mode flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRoles {
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub duration: Option<DurationRole>,
    pub all_day: AllDayBinding,
    pub color: Option<String>,
}
