use std::collections::HashSet;

use super::method_access_flags;
use crate::codegen::descriptor::parse_method_descriptor;
use crate::codegen::flag::access_flags;
use crate::codegen::node::{Insn, MethodNode};
use crate::codegen::opcodes;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodVerifyError {
    #[error("Invalid method access flags: 0x{0:04x}")]
    InvalidMethodAccessFlags(u16),
    #[error("Invalid method descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Method must have code unless abstract or native")]
    MissingCode,
    #[error("Abstract or native method must not have code")]
    ForbiddenCode,
    #[error("Method was never closed")]
    NotEnded,
    #[error("Label {0} is placed more than once")]
    DuplicateLabel(u32),
    #[error("Label {0} is referenced but never placed")]
    UnplacedLabel(u32),
    #[error("Frame at instruction {0} does not follow a label")]
    FrameWithoutLabel(usize),
    #[error("Code can fall off the end of the method")]
    FallsOffEnd,
    #[error("Return opcode does not match descriptor: expected {expected}, found {found}")]
    ReturnMismatch { expected: &'static str, found: String },
}

pub type Result<T> = std::result::Result<T, MethodVerifyError>;

/// Structural checks of a recorded method
pub fn check_method(method: &MethodNode) -> Result<()> {
    if method_access_flags::verify(method.access).is_err() {
        return Err(MethodVerifyError::InvalidMethodAccessFlags(method.access));
    }
    let (_, return_type) = parse_method_descriptor(&method.descriptor)
        .ok_or_else(|| MethodVerifyError::InvalidDescriptor(method.descriptor.clone()))?;
    if !method.ended {
        return Err(MethodVerifyError::NotEnded);
    }

    let bodiless = method.access & (access_flags::ACC_ABSTRACT | access_flags::ACC_NATIVE) != 0;
    match (bodiless, method.has_code) {
        (true, true) => return Err(MethodVerifyError::ForbiddenCode),
        (false, false) => return Err(MethodVerifyError::MissingCode),
        (true, false) => return Ok(()),
        (false, true) => {}
    }

    verify_labels(method)?;
    verify_frames(method)?;

    let expected = return_type.return_opcode();
    for opcode in method.opcodes() {
        if opcodes::is_return(opcode) && opcode != expected {
            return Err(MethodVerifyError::ReturnMismatch {
                expected: opcodes::mnemonic(expected).unwrap_or("?"),
                found: opcodes::mnemonic(opcode).unwrap_or("?").to_string(),
            });
        }
    }

    match method.opcodes().last() {
        Some(last) if opcodes::is_terminal(*last) => Ok(()),
        _ => Err(MethodVerifyError::FallsOffEnd),
    }
}

fn verify_labels(method: &MethodNode) -> Result<()> {
    let mut placed = HashSet::new();
    for insn in &method.instructions {
        if let Insn::Label(label) = insn {
            if !placed.insert(*label) {
                return Err(MethodVerifyError::DuplicateLabel(label.id()));
            }
        }
    }

    let referenced = method
        .instructions
        .iter()
        .flat_map(Insn::referenced_labels)
        .chain(
            method
                .try_catch_blocks
                .iter()
                .flat_map(|block| [block.start, block.end, block.handler]),
        )
        .chain(method.local_variables.iter().flat_map(|local| [local.start, local.end]));
    for label in referenced {
        if !placed.contains(&label) {
            return Err(MethodVerifyError::UnplacedLabel(label.id()));
        }
    }
    Ok(())
}

fn verify_frames(method: &MethodNode) -> Result<()> {
    for (i, insn) in method.instructions.iter().enumerate() {
        if let Insn::Frame(_) = insn {
            let after_label = i
                .checked_sub(1)
                .and_then(|prev| method.instructions.get(prev))
                .map_or(false, |prev| matches!(prev, Insn::Label(_)));
            if !after_label {
                return Err(MethodVerifyError::FrameWithoutLabel(i));
            }
        }
    }
    Ok(())
}
