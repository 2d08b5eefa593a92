//! Query resolution
//!
//! - [`canonicalize`] resolves fuzzy instructor names and subject titles
//! - [`FilterBuilder`] turns the model's field map into a store predicate
//! - [`project`] renders query hits as text for the model

pub mod canonicalize;
pub mod filter;
pub mod projector;

pub use canonicalize::{canonicalize, ReferenceKind};
pub use filter::{pad_single_clause, FieldMap, FilterBuilder};
pub use projector::project;
