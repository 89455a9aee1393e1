//! Metadata describing persistent fields and their owning classes
//!
//! Built by the caller before enhancement starts and treated as immutable input.

pub mod class;
pub mod field;
pub mod types;

pub use class::ClassMeta;
pub use field::{FieldMeta, ReadStrategy, Visibility};
pub use types::{JavaType, ManagedKind};
