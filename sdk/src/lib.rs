//! Catalog SDK
//!
//! Shared data model and error taxonomy for the catalog engine.

/// Error types and handling
pub mod errors;

/// Course records and queryable field names
pub mod types;

// Re-export commonly used types
pub use errors::{CatalogErrorExt, EngineError};
pub use types::{CourseRecord, FieldKey};
