//! StackMapTable frames (JVMS 4.7.4)

use std::collections::HashMap;

use super::constpool::ConstantPool;
use super::error::{AssembleError, AssembleResult};
use super::visitor::{Frame, FrameValue, Label};

/// VerificationTypeInfo as defined in JVMS 4.7.4
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object(u16),        // cpool index to CONSTANT_Class
    Uninitialized(u16), // offset
}

impl VerificationType {
    /// Resolve a visitor frame value against the pool and placed labels
    pub fn from_frame_value(
        value: &FrameValue,
        constant_pool: &mut ConstantPool,
        labels: &HashMap<Label, usize>,
    ) -> AssembleResult<Self> {
        Ok(match value {
            FrameValue::Top => VerificationType::Top,
            FrameValue::Integer => VerificationType::Integer,
            FrameValue::Float => VerificationType::Float,
            FrameValue::Double => VerificationType::Double,
            FrameValue::Long => VerificationType::Long,
            FrameValue::Null => VerificationType::Null,
            FrameValue::UninitializedThis => VerificationType::UninitializedThis,
            FrameValue::Object(name) => VerificationType::Object(constant_pool.add_class(name)?),
            FrameValue::Uninitialized(label) => {
                let offset = labels
                    .get(label)
                    .ok_or(AssembleError::UnresolvedLabel { label: label.id() })?;
                VerificationType::Uninitialized(*offset as u16)
            }
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            VerificationType::Top => bytes.push(0),
            VerificationType::Integer => bytes.push(1),
            VerificationType::Float => bytes.push(2),
            VerificationType::Double => bytes.push(3),
            VerificationType::Long => bytes.push(4),
            VerificationType::Null => bytes.push(5),
            VerificationType::UninitializedThis => bytes.push(6),
            VerificationType::Object(cp_index) => {
                bytes.push(7);
                bytes.extend_from_slice(&cp_index.to_be_bytes());
            }
            VerificationType::Uninitialized(offset) => {
                bytes.push(8);
                bytes.extend_from_slice(&offset.to_be_bytes());
            }
        }
        bytes
    }
}

/// StackMapFrame variants as defined in JVMS 4.7.4
///
/// The short and extended encodings of `Same` and `SameLocals1StackItem` are
/// chosen from `offset_delta` when serialising.
#[derive(Debug, Clone, PartialEq)]
pub enum StackMapFrame {
    Same { offset_delta: u16 },
    SameLocals1StackItem { offset_delta: u16, stack: VerificationType },
    Chop { k: u8, offset_delta: u16 }, // k in {1,2,3}
    Append { offset_delta: u16, locals: Vec<VerificationType> }, // 1 to 3 locals
    Full { offset_delta: u16, locals: Vec<VerificationType>, stack: Vec<VerificationType> },
}

impl StackMapFrame {
    /// Convert a visited frame placed `offset_delta` after the previous one
    pub fn from_frame(
        frame: &Frame,
        offset_delta: u16,
        constant_pool: &mut ConstantPool,
        labels: &HashMap<Label, usize>,
    ) -> AssembleResult<Self> {
        let mut resolve = |values: &[FrameValue]| -> AssembleResult<Vec<VerificationType>> {
            values
                .iter()
                .map(|v| VerificationType::from_frame_value(v, constant_pool, labels))
                .collect()
        };
        Ok(match frame {
            Frame::Same => StackMapFrame::Same { offset_delta },
            Frame::Same1(value) => {
                let mut stack = resolve(std::slice::from_ref(value))?;
                StackMapFrame::SameLocals1StackItem { offset_delta, stack: stack.remove(0) }
            }
            Frame::Append(locals) if (1..=3).contains(&locals.len()) => {
                StackMapFrame::Append { offset_delta, locals: resolve(locals)? }
            }
            Frame::Append(locals) => {
                return Err(AssembleError::InvalidFrame {
                    reason: format!("append frame adds {} locals, expected 1 to 3", locals.len()),
                })
            }
            Frame::Chop(k) if (1..=3).contains(k) => StackMapFrame::Chop { k: *k, offset_delta },
            Frame::Chop(k) => {
                return Err(AssembleError::InvalidFrame {
                    reason: format!("chop frame removes {} locals, expected 1 to 3", k),
                })
            }
            Frame::Full { locals, stack } => StackMapFrame::Full {
                offset_delta,
                locals: resolve(locals)?,
                stack: resolve(stack)?,
            },
        })
    }

    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            StackMapFrame::Same { offset_delta } => {
                if *offset_delta <= 63 {
                    bytes.push(*offset_delta as u8);
                } else {
                    bytes.push(251); // same_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
            }
            StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
                if *offset_delta <= 63 {
                    bytes.push(64 + *offset_delta as u8);
                } else {
                    bytes.push(247); // same_locals_1_stack_item_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
                bytes.extend_from_slice(&stack.to_bytes());
            }
            StackMapFrame::Chop { k, offset_delta } => {
                bytes.push(251 - *k);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
            }
            StackMapFrame::Append { offset_delta, locals } => {
                bytes.push(251 + locals.len() as u8);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                for l in locals {
                    bytes.extend_from_slice(&l.to_bytes());
                }
            }
            StackMapFrame::Full { offset_delta, locals, stack } => {
                bytes.push(255);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                bytes.extend_from_slice(&(locals.len() as u16).to_be_bytes());
                for l in locals {
                    bytes.extend_from_slice(&l.to_bytes());
                }
                bytes.extend_from_slice(&(stack.len() as u16).to_be_bytes());
                for s in stack {
                    bytes.extend_from_slice(&s.to_bytes());
                }
            }
        }
        bytes
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StackMapTable {
    pub frames: Vec<StackMapFrame>,
}

impl StackMapTable {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Absolute bytecode offset of every frame
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.frames.len());
        let mut previous: Option<usize> = None;
        for frame in &self.frames {
            let delta = frame.offset_delta() as usize;
            let offset = match previous {
                None => delta,
                Some(p) => p + delta + 1,
            };
            offsets.push(offset);
            previous = Some(offset);
        }
        offsets
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.frames.len() as u16).to_be_bytes());
        for f in &self.frames {
            bytes.extend_from_slice(&f.to_bytes());
        }
        bytes
    }
}

/// `offset_delta` for a frame at `offset`, given the previous frame's offset
pub fn offset_delta(previous: Option<usize>, offset: usize) -> AssembleResult<u16> {
    let delta = match previous {
        None => offset,
        Some(p) if offset > p => offset - p - 1,
        Some(_) => return Err(AssembleError::DuplicateFrame { offset }),
    };
    u16::try_from(delta).map_err(|_| AssembleError::CodeTooLarge { size: offset })
}

/// Produce human-readable descriptions of frames with absolute bytecode offsets
pub fn describe_stack_map_frames(table: &StackMapTable) -> Vec<String> {
    table
        .frames
        .iter()
        .zip(table.offsets())
        .map(|(frame, pc)| match frame {
            StackMapFrame::Same { offset_delta } => format!("@{:>4} SAME (delta={})", pc, offset_delta),
            StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
                format!("@{:>4} SAME_LOCALS_1 (delta={}, stack={:?})", pc, offset_delta, stack)
            }
            StackMapFrame::Chop { k, offset_delta } => format!("@{:>4} CHOP{} (delta={})", pc, k, offset_delta),
            StackMapFrame::Append { offset_delta, locals } => {
                format!("@{:>4} APPEND{} (delta={}, locals={:?})", pc, locals.len(), offset_delta, locals)
            }
            StackMapFrame::Full { offset_delta, locals, stack } => format!(
                "@{:>4} FULL (delta={}, locals={:?}, stack={:?})",
                pc, offset_delta, locals, stack
            ),
        })
        .collect()
}
