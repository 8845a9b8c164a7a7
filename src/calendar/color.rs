//! Event color resolution.
//!
//! A color selector is either the name of a Color field on the primary
//! table or a dotted `fk_field.color_field` path into a referenced
//! table. Dotted selectors rely on the store materializing the joined
//! value under the dotted key; resolution itself never fails.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::store::{Field, JoinSpec, RecordStore, Row};

/// Every valid color selector for a table: its own Color fields plus,
/// for each Key field, the referenced table's Color fields as
/// `key_field.color_field`.
pub fn color_options(
    fields: &[Field],
    referenced_fields: &HashMap<String, Vec<Field>>,
) -> Vec<String> {
    let mut options: Vec<String> = fields
        .iter()
        .filter(|f| f.field_type.is_color())
        .map(|f| f.name.clone())
        .collect();
    for field in fields {
        let Some(table) = field.field_type.referenced_table() else {
            continue;
        };
        let Some(ref_fields) = referenced_fields.get(table) else {
            continue;
        };
        for ref_field in ref_fields.iter().filter(|f| f.field_type.is_color()) {
            options.push(format!("{}.{}", field.name, ref_field.name));
        }
    }
    options
}

/// `color_options` with the referenced tables' fields gathered from the
/// store. Key fields pointing at unknown tables contribute nothing.
pub async fn color_options_for_table<S>(store: &S, table_id: i64) -> Result<Vec<String>>
where
    S: RecordStore + ?Sized,
{
    let fields = store.get_fields(table_id).await?;
    let mut referenced = HashMap::new();
    for field in &fields {
        let Some(table) = field.field_type.referenced_table() else {
            continue;
        };
        if referenced.contains_key(table) {
            continue;
        }
        match store.find_table_by_name(table).await? {
            Some(ref_table) => {
                referenced.insert(table.to_string(), store.get_fields(ref_table.id).await?);
            }
            None => {
                debug!(table = %table, "key field references an unknown table");
            }
        }
    }
    Ok(color_options(&fields, &referenced))
}

/// Resolve a selector against one row. Unset or unresolved yields
/// `None`.
pub fn resolve_color(selector: Option<&str>, row: &Row) -> Option<String> {
    let selector = selector?;
    row.get(selector)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Join needed to materialize a dotted selector, if any.
pub fn color_join_spec(selector: Option<&str>) -> Option<JoinSpec> {
    let (key_field, color_field) = selector?.split_once('.')?;
    Some(JoinSpec::new(key_field, vec![color_field.to_string()]))
}
