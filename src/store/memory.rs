//! In-memory record store.
//!
//! Backs tests and single-process deployments: typed tables, equality
//! filtering, one-hop key joins, partial updates. Not durable.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::auth::CallerIdentity;
use crate::error::{Result, StoreError};
use crate::store::traits::RecordStore;
use crate::store::types::{
    type_expectation, Field, JoinSpec, Row, RowFilter, RowPatch, Table, Value,
};

/// Thread-safe in-memory store over `RwLock`ed maps.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<i64, Table>>,
    fields: RwLock<HashMap<i64, Vec<Field>>>,
    rows: RwLock<HashMap<i64, BTreeMap<i64, Row>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table and return it with its assigned id.
    pub fn create_table(&self, name: impl Into<String>, min_role_write: i32) -> Table {
        let mut tables = self.tables.write().unwrap();
        let id = tables.keys().max().copied().unwrap_or(0) + 1;
        let table = Table {
            id,
            name: name.into(),
            min_role_write,
        };
        tables.insert(id, table.clone());
        self.rows.write().unwrap().insert(id, BTreeMap::new());
        table
    }

    /// Replace the declared fields of a table.
    pub fn set_fields(&self, table_id: i64, fields: Vec<Field>) -> Result<()> {
        if !self.tables.read().unwrap().contains_key(&table_id) {
            return Err(StoreError::TableNotFound(table_id).into());
        }
        self.fields.write().unwrap().insert(table_id, fields);
        Ok(())
    }

    /// Insert a row, coercing values against the declared field types.
    /// Returns the assigned row id.
    pub fn insert_row(&self, table_id: i64, values: HashMap<String, Value>) -> Result<i64> {
        if !self.tables.read().unwrap().contains_key(&table_id) {
            return Err(StoreError::TableNotFound(table_id).into());
        }
        let fields = self
            .fields
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .unwrap_or_default();
        let mut coerced = HashMap::with_capacity(values.len());
        for (name, value) in values {
            let field = fields.iter().find(|f| f.name == name).ok_or_else(|| {
                StoreError::FieldNotFound {
                    table: table_id,
                    field: name.clone(),
                }
            })?;
            let value = value.coerce_to(&field.field_type).ok_or_else(|| {
                StoreError::TypeMismatch {
                    field: name.clone(),
                    expected: type_expectation(field),
                }
            })?;
            coerced.insert(name, value);
        }
        let mut rows = self.rows.write().unwrap();
        let table_rows = rows.entry(table_id).or_default();
        let id = table_rows.keys().max().copied().unwrap_or(0) + 1;
        table_rows.insert(
            id,
            Row {
                id,
                values: coerced,
            },
        );
        Ok(id)
    }

    fn require_table(&self, table_id: i64) -> Result<Table> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(table_id).into())
    }

    fn fields_of(&self, table_id: i64) -> Vec<Field> {
        self.fields
            .read()
            .unwrap()
            .get(&table_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Materialize joined values for one row under dotted keys.
    fn apply_joins(&self, table_id: i64, row: &mut Row, joins: &[JoinSpec]) {
        let fields = self.fields_of(table_id);
        for join in joins {
            let Some(field) = fields.iter().find(|f| f.name == join.key_field) else {
                debug!(field = %join.key_field, "join spec names an unknown field, skipping");
                continue;
            };
            let Some(ref_table) = field.field_type.referenced_table() else {
                debug!(field = %join.key_field, "join spec names a non-key field, skipping");
                continue;
            };
            let ref_table_id = {
                let tables = self.tables.read().unwrap();
                tables.values().find(|t| t.name == ref_table).map(|t| t.id)
            };
            let Some(ref_table_id) = ref_table_id else {
                continue;
            };
            let Some(key) = row.get(&join.key_field).and_then(Value::as_i64) else {
                continue;
            };
            let rows = self.rows.read().unwrap();
            let Some(ref_row) = rows.get(&ref_table_id).and_then(|t| t.get(&key)) else {
                continue;
            };
            for name in &join.fields {
                if let Some(value) = ref_row.get(name) {
                    row.values
                        .insert(format!("{}.{}", join.key_field, name), value.clone());
                }
            }
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_table(&self, id: i64) -> Result<Option<Table>> {
        Ok(self.tables.read().unwrap().get(&id).cloned())
    }

    async fn find_table_by_name(&self, name: &str) -> Result<Option<Table>> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn get_fields(&self, table_id: i64) -> Result<Vec<Field>> {
        self.require_table(table_id)?;
        Ok(self.fields_of(table_id))
    }

    async fn get_row(&self, table_id: i64, row_id: i64) -> Result<Option<Row>> {
        self.require_table(table_id)?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .get(&table_id)
            .and_then(|t| t.get(&row_id))
            .cloned())
    }

    async fn get_rows(&self, table_id: i64, filter: &RowFilter) -> Result<Vec<Row>> {
        self.require_table(table_id)?;
        let rows = self.rows.read().unwrap();
        Ok(rows
            .get(&table_id)
            .map(|t| t.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_joined_rows(
        &self,
        table_id: i64,
        filter: &RowFilter,
        joins: &[JoinSpec],
    ) -> Result<Vec<Row>> {
        let mut rows = self.get_rows(table_id, filter).await?;
        for row in &mut rows {
            self.apply_joins(table_id, row, joins);
        }
        Ok(rows)
    }

    async fn update_row(
        &self,
        table_id: i64,
        row_id: i64,
        patch: RowPatch,
        acting_user: &CallerIdentity,
    ) -> Result<()> {
        self.require_table(table_id)?;
        let fields = self.fields_of(table_id);
        let mut coerced = Vec::with_capacity(patch.len());
        for (name, value) in patch.iter() {
            let field = fields.iter().find(|f| f.name == *name).ok_or_else(|| {
                StoreError::FieldNotFound {
                    table: table_id,
                    field: name.clone(),
                }
            })?;
            if value.is_null() && field.required {
                return Err(StoreError::TypeMismatch {
                    field: name.clone(),
                    expected: type_expectation(field),
                }
                .into());
            }
            let value = value.coerce_to(&field.field_type).ok_or_else(|| {
                StoreError::TypeMismatch {
                    field: name.clone(),
                    expected: type_expectation(field),
                }
            })?;
            coerced.push((name.clone(), value));
        }
        let mut rows = self.rows.write().unwrap();
        let row = rows
            .get_mut(&table_id)
            .and_then(|t| t.get_mut(&row_id))
            .ok_or(StoreError::RowNotFound {
                table: table_id,
                row: row_id,
            })?;
        debug!(
            table_id,
            row_id,
            fields = ?patch.field_names(),
            user = acting_user.user_id.as_deref().unwrap_or("anonymous"),
            "updating row"
        );
        for (name, value) in coerced {
            row.values.insert(name, value);
        }
        Ok(())
    }
}
