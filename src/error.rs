//! Error types for the calview engine.

use thiserror::Error;

/// Main error type for calview operations.
#[derive(Error, Debug)]
pub enum CalviewError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Mapping error: {0}")]
    Map(#[from] MapError),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("No calendar view registered for table {0}")]
    UnknownTable(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Record-store errors.
///
/// The store is an external collaborator; its failures propagate
/// unchanged to the caller and are never retried here.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Row {row} not found in table {table}")]
    RowNotFound { table: i64, row: i64 },

    #[error("Field '{field}' not found on table {table}")]
    FieldNotFound { table: i64, field: String },

    #[error("Field '{field}' holds a value that is not {expected}")]
    TypeMismatch { field: String, expected: String },
}

/// Errors raised while reconciling a client mutation into a row update.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The acting role is too weak to write the target table. Roles are
    /// numeric bands where smaller ids carry more privilege.
    #[error("Not authorized: role {role} exceeds minimum write role {min_role_write}")]
    NotAuthorized { role: i32, min_role_write: i32 },

    /// Duration mode is configured but the duration field is absent from
    /// the table. Indicates misconfiguration; reported before any write.
    #[error("Configured duration field '{field}' does not exist on the table")]
    DurationFieldMissing { field: String },
}

/// Errors raised while projecting a row onto an event descriptor.
#[derive(Error, Debug)]
pub enum MapError {
    /// The start field is null or missing. A data-integrity violation
    /// upstream; surfaced rather than silently defaulted.
    #[error("Row {row_id} has no value for start field '{field}'")]
    MissingStart { field: String, row_id: i64 },

    /// A field playing the start or end role resolved to a non-date value.
    #[error("Field '{field}' does not hold a date")]
    NotADate { field: String },
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for calview operations.
pub type Result<T> = std::result::Result<T, CalviewError>;
