//! Record store abstraction.
//!
//! The engine never talks to a concrete backend: every read and write
//! goes through this trait, so tests and simple deployments run on the
//! in-memory store while a production embedding supplies its own.

use async_trait::async_trait;

use crate::auth::CallerIdentity;
use crate::error::Result;
use crate::store::types::{Field, JoinSpec, Row, RowFilter, RowPatch, Table};

/// Backend-agnostic access to tables, fields, and rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a table by id.
    async fn find_table(&self, id: i64) -> Result<Option<Table>>;

    /// Look up a table by name (used to chase `Key` field references).
    async fn find_table_by_name(&self, name: &str) -> Result<Option<Table>>;

    /// Declared fields of a table.
    async fn get_fields(&self, table_id: i64) -> Result<Vec<Field>>;

    /// Fetch a single row by id.
    async fn get_row(&self, table_id: i64, row_id: i64) -> Result<Option<Row>>;

    /// Fetch rows matching a filter, ordered by row id.
    async fn get_rows(&self, table_id: i64, filter: &RowFilter) -> Result<Vec<Row>>;

    /// Fetch rows with referenced-table values materialized under dotted
    /// keys per the join specs.
    async fn get_joined_rows(
        &self,
        table_id: i64,
        filter: &RowFilter,
        joins: &[JoinSpec],
    ) -> Result<Vec<Row>>;

    /// Apply a partial update to one row, attributed to the acting user.
    async fn update_row(
        &self,
        table_id: i64,
        row_id: i64,
        patch: RowPatch,
        acting_user: &CallerIdentity,
    ) -> Result<()>;
}
