//! Bytecode emission layer
//!
//! Methods are produced as streams of [`visitor::MethodVisitor`] events. A
//! stream can be recorded into a [`node::MethodNode`], printed with the
//! [`textifier`], or lowered to a `Code` attribute by the
//! [`assembler::CodeAssembler`].

pub mod assembler;
pub mod attribute;
pub mod constpool;
pub mod descriptor;
pub mod error;
pub mod flag;
pub mod frame;
pub mod node;
pub mod opcodes;
pub mod textifier;
pub mod visitor;

// Re-export commonly used types
pub use assembler::CodeAssembler;
pub use attribute::CodeAttribute;
pub use constpool::{Constant, ConstantPool};
pub use error::{AssembleError, AssembleResult};
pub use node::{ClassNode, MethodNode};
pub use visitor::{ClassVisitor, Frame, FrameValue, Label, LdcValue, MethodVisitor};

use crate::common::error::Result;

/// Assemble a recorded method into a `Code` attribute using `constant_pool`
pub fn assemble_method(method: &MethodNode, constant_pool: &mut ConstantPool, emit_frames: bool) -> Result<CodeAttribute> {
    let mut assembler = CodeAssembler::new(constant_pool).with_frames(emit_frames);
    method.accept(&mut assembler);
    Ok(assembler.finish()?)
}
