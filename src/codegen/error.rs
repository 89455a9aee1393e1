//! Error types for code assembly

use thiserror::Error;

/// Errors that can occur while assembling a method body into a `Code` attribute
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssembleError {
    #[error("Constant pool is out of space")]
    ConstantPoolOverflow,
    #[error("Label {label} is referenced but never placed")]
    UnresolvedLabel { label: u32 },
    #[error("Label {label} is placed twice")]
    DuplicateLabel { label: u32 },
    #[error("Branch target too far: {offset}")]
    BranchTooFar { offset: i32 },
    #[error("Invalid opcode {opcode:#04x} for {event}")]
    InvalidOpcode { opcode: u8, event: &'static str },
    #[error("Invalid descriptor: {descriptor}")]
    InvalidDescriptor { descriptor: String },
    #[error("Method code too large: {size} bytes")]
    CodeTooLarge { size: usize },
    #[error("Frame cannot be encoded: {reason}")]
    InvalidFrame { reason: String },
    #[error("Frame at offset {offset} follows a frame at the same offset")]
    DuplicateFrame { offset: usize },
}

pub type AssembleResult<T> = Result<T, AssembleError>;
