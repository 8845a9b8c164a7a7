//! Record storage: data model, access trait, in-memory backend.

pub mod memory;
pub mod traits;
pub mod types;

pub use memory::MemoryRecordStore;
pub use traits::RecordStore;
pub use types::{Field, FieldType, JoinSpec, Row, RowFilter, RowPatch, Table, Value};
