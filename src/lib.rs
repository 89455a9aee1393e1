//! Property getter enhancer for persistence-capable JVM classes
//!
//! Rewrites the `getXXX` accessor of a persistent property so every read is
//! routed through the JDO state manager.
//!
//! ## Architecture
//!
//! - **meta**: field and class metadata the enhancement is driven by
//! - **codegen**: method visitor model, recorded method nodes and a bytecode
//!   assembler for the generated `Code` attribute
//! - **enhance**: the getter adapter and the replacement body synthesizer
//! - **verify**: structural checks over generated methods
//! - **common**: configuration, errors and the message catalog
//!
//! ## Rewrite Flow
//!
//! ```text
//! getXXX (original) ──► PropertyGetterAdapter ──► jdoGetXXX (original body)
//!                               │
//!                               └── visit_end ──► getXXX (generated body)
//! ```

pub mod codegen;
pub mod common;
pub mod enhance;
pub mod meta;
pub mod verify;

pub use common::{Config, Error, Result};
pub use enhance::{generate_get_method, rewrite_getter, EnhanceContext, PropertyGetterAdapter, RewrittenGetter};
pub use meta::{ClassMeta, FieldMeta, JavaType, ReadStrategy, Visibility};
