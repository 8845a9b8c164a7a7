//! Data model for the record store: typed fields, values, rows, filters.
//!
//! Values are a small typed union over what a calendar cares about. The
//! untagged serde representation keeps wire payloads plain JSON; `Color`
//! and `Key` are never produced by deserialization directly and instead
//! come from coercion against a declared field type.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::RoleId;

// ============================================================================
// Field types
// ============================================================================

/// Declared type of a table field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Date,
    Color,
    /// Foreign key into another table, referenced by name.
    Key {
        table: String,
    },
}

impl FieldType {
    pub fn is_color(&self) -> bool {
        matches!(self, FieldType::Color)
    }

    pub fn is_key(&self) -> bool {
        matches!(self, FieldType::Key { .. })
    }

    /// Name of the referenced table for `Key` fields.
    pub fn referenced_table(&self) -> Option<&str> {
        match self {
            FieldType::Key { table } => Some(table),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Color => "color",
            FieldType::Key { .. } => "key",
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A field value. Untagged: wire payloads are plain JSON scalars.
///
/// Variant order matters for deserialization: RFC 3339 strings become
/// `Date`, everything else stringy becomes `String`. `Color` and `Key`
/// only appear after coercion against a field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(DateTime<Utc>),
    String(String),
    Color(String),
    Key(i64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) | Value::Key(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; widens `Int` to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Color(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Truthiness for enablement flags carried in ambient state.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Date(_) => true,
            Value::String(s) => !s.is_empty() && s != "false" && s != "0",
            Value::Color(_) => true,
            Value::Key(_) => true,
        }
    }

    /// Parse a timestamp string in the formats clients send: RFC 3339,
    /// a bare date (midnight UTC), or a zoneless date-time (taken as UTC).
    pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Some(Utc.from_utc_datetime(&dt));
        }
        None
    }

    /// Coerce this value into the stored representation for a field type.
    ///
    /// Stringly inputs (query params, fixtures) become typed values;
    /// `None` means the input cannot represent the declared type. `Null`
    /// passes through for every type.
    pub fn coerce_to(&self, field_type: &FieldType) -> Option<Value> {
        if self.is_null() {
            return Some(Value::Null);
        }
        match field_type {
            FieldType::String => self.as_str().map(|s| Value::String(s.to_string())),
            FieldType::Int => match self {
                Value::Int(i) => Some(Value::Int(*i)),
                Value::String(s) => s.parse::<i64>().ok().map(Value::Int),
                _ => None,
            },
            FieldType::Float => match self {
                Value::Float(f) => Some(Value::Float(*f)),
                Value::Int(i) => Some(Value::Float(*i as f64)),
                Value::String(s) => s.parse::<f64>().ok().map(Value::Float),
                _ => None,
            },
            FieldType::Bool => match self {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::String(s) => match s.as_str() {
                    "true" | "1" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "off" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldType::Date => match self {
                Value::Date(d) => Some(Value::Date(*d)),
                Value::String(s) => Self::parse_date(s).map(Value::Date),
                _ => None,
            },
            FieldType::Color => match self {
                Value::Color(s) | Value::String(s) => Some(Value::Color(s.clone())),
                _ => None,
            },
            FieldType::Key { .. } => match self {
                Value::Key(i) | Value::Int(i) => Some(Value::Key(*i)),
                Value::String(s) => s.parse::<i64>().ok().map(Value::Key),
                _ => None,
            },
        }
    }
}

// ============================================================================
// Fields, tables, rows
// ============================================================================

/// A field declared on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    /// Required fields reject null writes.
    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            required: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A table in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub name: String,
    /// Least-privileged role (largest id) allowed to write rows.
    pub min_role_write: RoleId,
}

/// A stored record. Joined values appear under dotted keys
/// (`fk_field.color_field`) when fetched with a join spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub values: HashMap<String, Value>,
}

impl Row {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

// ============================================================================
// Filters, patches, joins
// ============================================================================

/// Conjunctive equality filter over rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    pub id: Option<i64>,
    pub eq: Vec<(String, Value)>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            eq: Vec::new(),
        }
    }

    pub fn add_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.eq.push((field.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.eq.is_empty()
    }

    /// Whether a row satisfies every condition. Missing values compare
    /// as `Null`.
    pub fn matches(&self, row: &Row) -> bool {
        if let Some(id) = self.id {
            if row.id != id {
                return false;
            }
        }
        self.eq
            .iter()
            .all(|(field, value)| row.get(field).unwrap_or(&Value::Null) == value)
    }
}

/// Partial update: only the named fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    values: HashMap<String, Value>,
}

impl RowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

/// Request to materialize referenced-table values under dotted keys.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    /// Key field on the primary table.
    pub key_field: String,
    /// Fields to pull from the referenced table.
    pub fields: Vec<String>,
}

impl JoinSpec {
    pub fn new(key_field: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key_field: key_field.into(),
            fields,
        }
    }
}

/// Expected-type description for write validation errors.
pub(crate) fn type_expectation(field: &Field) -> String {
    if field.required {
        format!("non-null {}", field.field_type.name())
    } else {
        field.field_type.name().to_string()
    }
}
