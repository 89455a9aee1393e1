//! Lower visitor events to a `Code` attribute
//!
//! [`CodeAssembler`] is the terminal visitor of a method chain. Branches are
//! written with placeholder offsets and patched in [`CodeAssembler::finish`]
//! once every label has a position. Visitor events cannot fail, so the first
//! error is kept and reported by `finish`.

use std::collections::HashMap;

use super::attribute::{CodeAttribute, ExceptionTableEntry, LineNumberEntry, LocalVariableEntry};
use super::constpool::ConstantPool;
use super::descriptor::argument_slots;
use super::error::{AssembleError, AssembleResult};
use super::frame::{offset_delta, StackMapFrame};
use super::opcodes::{self, *};
use super::visitor::{Frame, Label, LdcValue, MethodVisitor};

/// Largest method body the class file format allows
pub const MAX_CODE_LENGTH: usize = 65535;

#[derive(Debug)]
struct Fixup {
    /// Offset of the instruction the branch is relative to
    base: usize,
    /// Offset of the operand to patch
    at: usize,
    wide: bool,
    label: Label,
}

#[derive(Debug)]
struct PendingLocal {
    name: String,
    descriptor: String,
    start: Label,
    end: Label,
    index: u16,
}

pub struct CodeAssembler<'a> {
    constant_pool: &'a mut ConstantPool,
    code: Vec<u8>,
    labels: HashMap<Label, usize>,
    fixups: Vec<Fixup>,
    frames: Vec<(usize, Frame)>,
    try_catch_blocks: Vec<(Label, Label, Label, Option<String>)>,
    line_numbers: Vec<(u16, Label)>,
    locals: Vec<PendingLocal>,
    max_stack: u16,
    max_locals: u16,
    emit_frames: bool,
    error: Option<AssembleError>,
}

impl<'a> CodeAssembler<'a> {
    pub fn new(constant_pool: &'a mut ConstantPool) -> Self {
        Self {
            constant_pool,
            code: Vec::with_capacity(64),
            labels: HashMap::new(),
            fixups: Vec::new(),
            frames: Vec::new(),
            try_catch_blocks: Vec::new(),
            line_numbers: Vec::new(),
            locals: Vec::new(),
            max_stack: 0,
            max_locals: 0,
            emit_frames: true,
            error: None,
        }
    }

    /// Drop visited frames instead of writing a StackMapTable (pre-Java 7 targets)
    pub fn with_frames(mut self, emit_frames: bool) -> Self {
        self.emit_frames = emit_frames;
        self
    }

    fn fail(&mut self, error: AssembleError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn check<T>(&mut self, result: AssembleResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    fn emit1(&mut self, od: u8) {
        self.code.push(od);
    }

    fn emit2(&mut self, od: u16) {
        self.code.extend_from_slice(&od.to_be_bytes());
    }

    fn emit4(&mut self, od: i32) {
        self.code.extend_from_slice(&od.to_be_bytes());
    }

    fn emitop2(&mut self, op: u8, od: u16) {
        self.emit1(op);
        self.emit2(od);
    }

    fn emit_branch_offset(&mut self, base: usize, wide: bool, label: Label) {
        let at = self.code.len();
        self.fixups.push(Fixup { base, at, wide, label });
        if wide {
            self.emit4(0);
        } else {
            self.emit2(0);
        }
    }

    /// Padding after a switch opcode so its operands start on a 4-byte boundary
    fn align_switch(&mut self) {
        while self.code.len() % 4 != 0 {
            self.emit1(0);
        }
    }

    fn invalid(&mut self, opcode: u8, event: &'static str) {
        self.fail(AssembleError::InvalidOpcode { opcode, event });
    }

    /// Resolve labels, patch branches and build the attribute
    pub fn finish(self) -> AssembleResult<CodeAttribute> {
        let CodeAssembler {
            constant_pool,
            mut code,
            labels,
            fixups,
            frames,
            try_catch_blocks,
            line_numbers,
            locals,
            max_stack,
            max_locals,
            emit_frames,
            error,
        } = self;
        if let Some(error) = error {
            return Err(error);
        }
        if code.len() > MAX_CODE_LENGTH {
            return Err(AssembleError::CodeTooLarge { size: code.len() });
        }
        let resolve = |label: Label| -> AssembleResult<usize> {
            labels
                .get(&label)
                .copied()
                .ok_or(AssembleError::UnresolvedLabel { label: label.id() })
        };

        for fixup in &fixups {
            let offset = resolve(fixup.label)? as i32 - fixup.base as i32;
            if fixup.wide {
                code[fixup.at..fixup.at + 4].copy_from_slice(&offset.to_be_bytes());
            } else {
                let narrow = i16::try_from(offset).map_err(|_| AssembleError::BranchTooFar { offset })?;
                code[fixup.at..fixup.at + 2].copy_from_slice(&narrow.to_be_bytes());
            }
        }

        let mut attribute = CodeAttribute::new(max_stack, max_locals, code);

        for (start, end, handler, exception_type) in &try_catch_blocks {
            let catch_type = match exception_type {
                Some(name) => constant_pool.add_class(name)?,
                None => 0,
            };
            attribute.exception_table.push(ExceptionTableEntry {
                start_pc: resolve(*start)? as u16,
                end_pc: resolve(*end)? as u16,
                handler_pc: resolve(*handler)? as u16,
                catch_type,
            });
        }

        for (line_number, start) in &line_numbers {
            attribute.line_numbers.push(LineNumberEntry {
                start_pc: resolve(*start)? as u16,
                line_number: *line_number,
            });
        }

        for local in &locals {
            let start = resolve(local.start)?;
            let end = resolve(local.end)?;
            attribute.local_variables.push(LocalVariableEntry {
                start_pc: start as u16,
                length: end.saturating_sub(start) as u16,
                name_index: constant_pool.add_utf8(&local.name)?,
                descriptor_index: constant_pool.add_utf8(&local.descriptor)?,
                index: local.index,
            });
        }

        if emit_frames {
            let mut previous = None;
            for (offset, frame) in &frames {
                let delta = offset_delta(previous, *offset)?;
                let converted = StackMapFrame::from_frame(frame, delta, constant_pool, &labels)?;
                attribute.stack_map_table.frames.push(converted);
                previous = Some(*offset);
            }
        }

        attribute.seal(constant_pool)?;
        Ok(attribute)
    }
}

impl MethodVisitor for CodeAssembler<'_> {
    fn visit_frame(&mut self, frame: &Frame) {
        if self.emit_frames {
            self.frames.push((self.code.len(), frame.clone()));
        }
    }

    fn visit_insn(&mut self, opcode: u8) {
        if opcodes::mnemonic(opcode).is_none() {
            return self.invalid(opcode, "visit_insn");
        }
        self.emit1(opcode);
    }

    fn visit_int_insn(&mut self, opcode: u8, operand: i32) {
        match opcode {
            BIPUSH | NEWARRAY => {
                self.emit1(opcode);
                self.emit1(operand as u8);
            }
            SIPUSH => self.emitop2(opcode, operand as i16 as u16),
            _ => self.invalid(opcode, "visit_int_insn"),
        }
    }

    fn visit_var_insn(&mut self, opcode: u8, var: u16) {
        if !matches!(opcode, ILOAD..=ALOAD | ISTORE..=ASTORE | RET) {
            return self.invalid(opcode, "visit_var_insn");
        }
        if let Some(compact) = opcodes::compact_var_opcode(opcode, var) {
            self.emit1(compact);
        } else if var > u8::MAX as u16 {
            self.emit1(WIDE);
            self.emitop2(opcode, var);
        } else {
            self.emit1(opcode);
            self.emit1(var as u8);
        }
    }

    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) {
        if !matches!(opcode, NEW | ANEWARRAY | CHECKCAST | INSTANCEOF) {
            return self.invalid(opcode, "visit_type_insn");
        }
        let result = self.constant_pool.add_class(type_name);
        if let Some(index) = self.check(result) {
            self.emitop2(opcode, index);
        }
    }

    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) {
        if !matches!(opcode, GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD) {
            return self.invalid(opcode, "visit_field_insn");
        }
        let result = self.constant_pool.add_field_ref(owner, name, descriptor);
        if let Some(index) = self.check(result) {
            self.emitop2(opcode, index);
        }
    }

    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
        match opcode {
            INVOKEINTERFACE => {
                let Some(slots) = argument_slots(descriptor) else {
                    return self.fail(AssembleError::InvalidDescriptor { descriptor: descriptor.to_string() });
                };
                let result = self.constant_pool.add_interface_method_ref(owner, name, descriptor);
                if let Some(index) = self.check(result) {
                    self.emitop2(opcode, index);
                    // argument count includes the receiver
                    self.emit1((slots + 1) as u8);
                    self.emit1(0);
                }
            }
            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => {
                let result = if is_interface {
                    self.constant_pool.add_interface_method_ref(owner, name, descriptor)
                } else {
                    self.constant_pool.add_method_ref(owner, name, descriptor)
                };
                if let Some(index) = self.check(result) {
                    self.emitop2(opcode, index);
                }
            }
            _ => self.invalid(opcode, "visit_method_insn"),
        }
    }

    fn visit_jump_insn(&mut self, opcode: u8, label: Label) {
        if !opcodes::is_jump(opcode) {
            return self.invalid(opcode, "visit_jump_insn");
        }
        let base = self.code.len();
        self.emit1(opcode);
        self.emit_branch_offset(base, matches!(opcode, GOTO_W | JSR_W), label);
    }

    fn visit_label(&mut self, label: Label) {
        if self.labels.insert(label, self.code.len()).is_some() {
            self.fail(AssembleError::DuplicateLabel { label: label.id() });
        }
    }

    fn visit_ldc_insn(&mut self, value: &LdcValue) {
        let result = match value {
            LdcValue::Int(v) => self.constant_pool.add_integer(*v),
            LdcValue::Float(v) => self.constant_pool.add_float(*v),
            LdcValue::Long(v) => self.constant_pool.add_long(*v),
            LdcValue::Double(v) => self.constant_pool.add_double(*v),
            LdcValue::String(s) => self.constant_pool.add_string(s),
            LdcValue::Type(t) => self.constant_pool.add_class(t),
        };
        let Some(index) = self.check(result) else {
            return;
        };
        if value.is_wide() {
            self.emitop2(LDC2_W, index);
        } else if index <= u8::MAX as u16 {
            self.emit1(LDC);
            self.emit1(index as u8);
        } else {
            self.emitop2(LDC_W, index);
        }
    }

    fn visit_iinc_insn(&mut self, var: u16, increment: i16) {
        if var <= u8::MAX as u16 && i8::try_from(increment).is_ok() {
            self.emit1(IINC);
            self.emit1(var as u8);
            self.emit1(increment as i8 as u8);
        } else {
            self.emit1(WIDE);
            self.emitop2(IINC, var);
            self.emit2(increment as u16);
        }
    }

    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: Label, labels: &[Label]) {
        let base = self.code.len();
        self.emit1(TABLESWITCH);
        self.align_switch();
        self.emit_branch_offset(base, true, default);
        self.emit4(min);
        self.emit4(max);
        for label in labels {
            self.emit_branch_offset(base, true, *label);
        }
    }

    fn visit_lookup_switch_insn(&mut self, default: Label, keys: &[i32], labels: &[Label]) {
        let base = self.code.len();
        self.emit1(LOOKUPSWITCH);
        self.align_switch();
        self.emit_branch_offset(base, true, default);
        self.emit4(keys.len() as i32);
        for (key, label) in keys.iter().zip(labels) {
            self.emit4(*key);
            self.emit_branch_offset(base, true, *label);
        }
    }

    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) {
        let result = self.constant_pool.add_class(descriptor);
        if let Some(index) = self.check(result) {
            self.emitop2(MULTIANEWARRAY, index);
            self.emit1(dimensions);
        }
    }

    fn visit_try_catch_block(&mut self, start: Label, end: Label, handler: Label, exception_type: Option<&str>) {
        self.try_catch_blocks
            .push((start, end, handler, exception_type.map(str::to_string)));
    }

    fn visit_local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        _signature: Option<&str>,
        start: Label,
        end: Label,
        index: u16,
    ) {
        self.locals.push(PendingLocal {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            start,
            end,
            index,
        });
    }

    fn visit_line_number(&mut self, line: u16, start: Label) {
        self.line_numbers.push((line, start));
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        self.max_stack = max_stack;
        self.max_locals = max_locals;
    }
}
