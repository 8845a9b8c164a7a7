//! Configuration loading and validation.

pub mod settings;

pub use settings::{CalendarConfig, Config, ServerConfig};
