//! JSON seed data for the memory store.
//!
//! A fixture file declares tables (with fields and rows) and the
//! calendar views over them, so the server binary can come up with
//! something to render. Row values are coerced against the declared
//! field types on insert.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::PUBLIC_ROLE;
use crate::calendar::{CalendarView, CalendarViewConfig};
use crate::error::{ConfigError, Result};
use crate::store::{Field, MemoryRecordStore, Value};

/// A complete seed: tables plus the calendar views over them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub tables: Vec<FixtureTable>,
    #[serde(default)]
    pub views: Vec<FixtureView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTable {
    pub name: String,
    #[serde(default = "default_min_role_write")]
    pub min_role_write: i32,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub rows: Vec<HashMap<String, Value>>,
}

fn default_min_role_write() -> i32 {
    PUBLIC_ROLE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureView {
    pub name: String,
    /// Table referenced by name; resolved to an id while seeding.
    pub table: String,
    pub config: CalendarViewConfig,
}

impl Fixture {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Seed a memory store and return the calendar views to register.
    pub fn seed(&self, store: &MemoryRecordStore) -> Result<Vec<CalendarView>> {
        let mut table_ids = HashMap::new();
        for fixture_table in &self.tables {
            let table = store.create_table(fixture_table.name.as_str(), fixture_table.min_role_write);
            store.set_fields(table.id, fixture_table.fields.clone())?;
            for row in &fixture_table.rows {
                store.insert_row(table.id, row.clone())?;
            }
            table_ids.insert(fixture_table.name.clone(), table.id);
        }

        let mut views = Vec::with_capacity(self.views.len());
        for fixture_view in &self.views {
            let table_id = table_ids
                .get(&fixture_view.table)
                .copied()
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "view '{}' references unknown table '{}'",
                        fixture_view.name, fixture_view.table
                    ))
                })?;
            views.push(CalendarView {
                name: fixture_view.name.clone(),
                table_id,
                config: fixture_view.config.clone(),
            });
        }
        info!(
            tables = self.tables.len(),
            views = views.len(),
            "seeded fixture data"
        );
        Ok(views)
    }
}
