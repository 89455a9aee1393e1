//! Property getter enhancement
//!
//! [`PropertyGetterAdapter`] sits between a class reader and writer for one
//! `getXXX` method; [`GetterBody`] generates the replacement body. For callers
//! that hold a recorded method, [`rewrite_getter`] runs the whole rewrite.

pub mod context;
pub mod emit;
pub mod getter_adapter;
pub mod getter_body;
pub mod namer;

pub use context::EnhanceContext;
pub use getter_adapter::PropertyGetterAdapter;
pub use getter_body::{generate_get_method, GetterBody};
pub use namer::{EnhancementNamer, JdoNamer};

use crate::codegen::node::{ClassNode, MethodNode};
use crate::common::error::Result;
use crate::meta::FieldMeta;
use crate::verify::check_method;

/// Output of rewriting one getter
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenGetter {
    /// The original body under its new name
    pub relocated: MethodNode,
    /// The generated body under the original name
    pub replacement: MethodNode,
}

/// Rewrite a recorded getter of `field` in the class described by `ctx`.
///
/// Both resulting methods are structurally checked; an abstract property whose
/// getter carries code, for instance, is reported as [`Error::Verify`](crate::Error::Verify).
pub fn rewrite_getter(original: &MethodNode, field: &FieldMeta, ctx: &EnhanceContext) -> Result<RewrittenGetter> {
    let mut class = ClassNode::new(&ctx.class.internal_name);
    let mut target = MethodNode::new(original.access, &original.name, &original.descriptor);
    target.signature = original.signature.clone();
    target.exceptions = original.exceptions.clone();

    let mut adapter =
        PropertyGetterAdapter::new(target, ctx, &original.name, &original.descriptor, field, &mut class)?;
    original.accept(&mut adapter);
    let (replacement, relocated) = adapter.into_inner();
    let relocated = relocated.snapshot();
    check_method(&relocated)?;
    check_method(&replacement)?;
    Ok(RewrittenGetter { relocated, replacement })
}
