//! Method emission interface
//!
//! A [`MethodVisitor`] receives the events that make up one method: metadata
//! (annotations, attributes), then the code (labels, instructions, frames,
//! debug tables), then `visit_maxs` and `visit_end`. Every provided method
//! forwards to [`MethodVisitor::delegate`], so a decorator only implements
//! `delegate` plus the events it wants to intercept.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_LABEL: AtomicU32 = AtomicU32::new(0);

/// A position in a method's code. Unique process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    pub fn new() -> Self {
        Label(NEXT_LABEL.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

/// Verification type of a local or stack slot in a frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameValue {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Internal name of a class or array descriptor
    Object(String),
    /// Result of the NEW instruction placed at the label
    Uninitialized(Label),
}

/// Stack map frame, in compressed form relative to the previous frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Same,
    Same1(FrameValue),
    Append(Vec<FrameValue>),
    Chop(u8),
    Full { locals: Vec<FrameValue>, stack: Vec<FrameValue> },
}

/// Constant loaded by LDC
#[derive(Debug, Clone, PartialEq)]
pub enum LdcValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    /// Class literal, by internal name or array descriptor
    Type(String),
}

impl LdcValue {
    /// Long and double constants take two stack slots
    pub fn is_wide(&self) -> bool {
        matches!(self, LdcValue::Long(_) | LdcValue::Double(_))
    }
}

/// Element value of an annotation
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Enum { descriptor: String, value: String },
    Class(String),
    Annotation(Annotation),
    Array(Vec<AnnotationValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub descriptor: String,
    /// Retained at runtime (RuntimeVisibleAnnotations)
    pub visible: bool,
    pub values: Vec<(String, AnnotationValue)>,
}

impl Annotation {
    pub fn new(descriptor: impl Into<String>, visible: bool) -> Self {
        Self { descriptor: descriptor.into(), visible, values: Vec::new() }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.push((name.into(), value));
        self
    }
}

/// Non-standard attribute carried through unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub data: Vec<u8>,
}

/// Receiver of method emission events
pub trait MethodVisitor {
    /// Next visitor in the chain; events not overridden are forwarded here
    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        None
    }

    fn visit_parameter(&mut self, name: Option<&str>, access: u16) {
        if let Some(next) = self.delegate() {
            next.visit_parameter(name, access);
        }
    }

    fn visit_annotation_default(&mut self, value: &AnnotationValue) {
        if let Some(next) = self.delegate() {
            next.visit_annotation_default(value);
        }
    }

    fn visit_annotation(&mut self, annotation: &Annotation) {
        if let Some(next) = self.delegate() {
            next.visit_annotation(annotation);
        }
    }

    fn visit_parameter_annotation(&mut self, parameter: u8, annotation: &Annotation) {
        if let Some(next) = self.delegate() {
            next.visit_parameter_annotation(parameter, annotation);
        }
    }

    fn visit_attribute(&mut self, attribute: &Attribute) {
        if let Some(next) = self.delegate() {
            next.visit_attribute(attribute);
        }
    }

    fn visit_code(&mut self) {
        if let Some(next) = self.delegate() {
            next.visit_code();
        }
    }

    fn visit_frame(&mut self, frame: &Frame) {
        if let Some(next) = self.delegate() {
            next.visit_frame(frame);
        }
    }

    /// Zero-operand instruction
    fn visit_insn(&mut self, opcode: u8) {
        if let Some(next) = self.delegate() {
            next.visit_insn(opcode);
        }
    }

    /// BIPUSH, SIPUSH or NEWARRAY
    fn visit_int_insn(&mut self, opcode: u8, operand: i32) {
        if let Some(next) = self.delegate() {
            next.visit_int_insn(opcode, operand);
        }
    }

    /// Load, store or RET of a local variable slot
    fn visit_var_insn(&mut self, opcode: u8, var: u16) {
        if let Some(next) = self.delegate() {
            next.visit_var_insn(opcode, var);
        }
    }

    /// NEW, ANEWARRAY, CHECKCAST or INSTANCEOF
    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) {
        if let Some(next) = self.delegate() {
            next.visit_type_insn(opcode, type_name);
        }
    }

    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) {
        if let Some(next) = self.delegate() {
            next.visit_field_insn(opcode, owner, name, descriptor);
        }
    }

    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
        if let Some(next) = self.delegate() {
            next.visit_method_insn(opcode, owner, name, descriptor, is_interface);
        }
    }

    fn visit_jump_insn(&mut self, opcode: u8, label: Label) {
        if let Some(next) = self.delegate() {
            next.visit_jump_insn(opcode, label);
        }
    }

    fn visit_label(&mut self, label: Label) {
        if let Some(next) = self.delegate() {
            next.visit_label(label);
        }
    }

    fn visit_ldc_insn(&mut self, value: &LdcValue) {
        if let Some(next) = self.delegate() {
            next.visit_ldc_insn(value);
        }
    }

    fn visit_iinc_insn(&mut self, var: u16, increment: i16) {
        if let Some(next) = self.delegate() {
            next.visit_iinc_insn(var, increment);
        }
    }

    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: Label, labels: &[Label]) {
        if let Some(next) = self.delegate() {
            next.visit_table_switch_insn(min, max, default, labels);
        }
    }

    fn visit_lookup_switch_insn(&mut self, default: Label, keys: &[i32], labels: &[Label]) {
        if let Some(next) = self.delegate() {
            next.visit_lookup_switch_insn(default, keys, labels);
        }
    }

    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) {
        if let Some(next) = self.delegate() {
            next.visit_multi_anew_array_insn(descriptor, dimensions);
        }
    }

    /// `exception_type` of `None` catches everything (finally blocks)
    fn visit_try_catch_block(&mut self, start: Label, end: Label, handler: Label, exception_type: Option<&str>) {
        if let Some(next) = self.delegate() {
            next.visit_try_catch_block(start, end, handler, exception_type);
        }
    }

    fn visit_local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        start: Label,
        end: Label,
        index: u16,
    ) {
        if let Some(next) = self.delegate() {
            next.visit_local_variable(name, descriptor, signature, start, end, index);
        }
    }

    fn visit_line_number(&mut self, line: u16, start: Label) {
        if let Some(next) = self.delegate() {
            next.visit_line_number(line, start);
        }
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        if let Some(next) = self.delegate() {
            next.visit_maxs(max_stack, max_locals);
        }
    }

    fn visit_end(&mut self) {
        if let Some(next) = self.delegate() {
            next.visit_end();
        }
    }
}

impl<T: MethodVisitor + ?Sized> MethodVisitor for &mut T {
    fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
        None
    }
    fn visit_parameter(&mut self, name: Option<&str>, access: u16) {
        (**self).visit_parameter(name, access)
    }
    fn visit_annotation_default(&mut self, value: &AnnotationValue) {
        (**self).visit_annotation_default(value)
    }
    fn visit_annotation(&mut self, annotation: &Annotation) {
        (**self).visit_annotation(annotation)
    }
    fn visit_parameter_annotation(&mut self, parameter: u8, annotation: &Annotation) {
        (**self).visit_parameter_annotation(parameter, annotation)
    }
    fn visit_attribute(&mut self, attribute: &Attribute) {
        (**self).visit_attribute(attribute)
    }
    fn visit_code(&mut self) {
        (**self).visit_code()
    }
    fn visit_frame(&mut self, frame: &Frame) {
        (**self).visit_frame(frame)
    }
    fn visit_insn(&mut self, opcode: u8) {
        (**self).visit_insn(opcode)
    }
    fn visit_int_insn(&mut self, opcode: u8, operand: i32) {
        (**self).visit_int_insn(opcode, operand)
    }
    fn visit_var_insn(&mut self, opcode: u8, var: u16) {
        (**self).visit_var_insn(opcode, var)
    }
    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) {
        (**self).visit_type_insn(opcode, type_name)
    }
    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) {
        (**self).visit_field_insn(opcode, owner, name, descriptor)
    }
    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
        (**self).visit_method_insn(opcode, owner, name, descriptor, is_interface)
    }
    fn visit_jump_insn(&mut self, opcode: u8, label: Label) {
        (**self).visit_jump_insn(opcode, label)
    }
    fn visit_label(&mut self, label: Label) {
        (**self).visit_label(label)
    }
    fn visit_ldc_insn(&mut self, value: &LdcValue) {
        (**self).visit_ldc_insn(value)
    }
    fn visit_iinc_insn(&mut self, var: u16, increment: i16) {
        (**self).visit_iinc_insn(var, increment)
    }
    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: Label, labels: &[Label]) {
        (**self).visit_table_switch_insn(min, max, default, labels)
    }
    fn visit_lookup_switch_insn(&mut self, default: Label, keys: &[i32], labels: &[Label]) {
        (**self).visit_lookup_switch_insn(default, keys, labels)
    }
    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) {
        (**self).visit_multi_anew_array_insn(descriptor, dimensions)
    }
    fn visit_try_catch_block(&mut self, start: Label, end: Label, handler: Label, exception_type: Option<&str>) {
        (**self).visit_try_catch_block(start, end, handler, exception_type)
    }
    fn visit_local_variable(
        &mut self,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        start: Label,
        end: Label,
        index: u16,
    ) {
        (**self).visit_local_variable(name, descriptor, signature, start, end, index)
    }
    fn visit_line_number(&mut self, line: u16, start: Label) {
        (**self).visit_line_number(line, start)
    }
    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        (**self).visit_maxs(max_stack, max_locals)
    }
    fn visit_end(&mut self) {
        (**self).visit_end()
    }
}

/// Receiver of class-level events; only method creation is needed here
pub trait ClassVisitor {
    type Method: MethodVisitor;

    /// Open a new method slot and return the visitor that fills it
    fn visit_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> Self::Method;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        insns: usize,
        ended: bool,
    }

    impl MethodVisitor for Counter {
        fn visit_insn(&mut self, _opcode: u8) {
            self.insns += 1;
        }
        fn visit_end(&mut self) {
            self.ended = true;
        }
    }

    struct Forwarder {
        inner: Counter,
        labels: usize,
    }

    impl MethodVisitor for Forwarder {
        fn delegate(&mut self) -> Option<&mut dyn MethodVisitor> {
            Some(&mut self.inner)
        }
        fn visit_label(&mut self, _label: Label) {
            self.labels += 1;
        }
    }

    #[test]
    fn test_labels_are_unique() {
        let a = Label::new();
        let b = Label::new();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_default_methods_forward_to_delegate() {
        let mut fwd = Forwarder { inner: Counter::default(), labels: 0 };
        fwd.visit_label(Label::new());
        fwd.visit_insn(crate::codegen::opcodes::NOP);
        fwd.visit_insn(crate::codegen::opcodes::RETURN);
        fwd.visit_end();
        assert_eq!(fwd.labels, 1);
        assert_eq!(fwd.inner.insns, 2);
        assert!(fwd.inner.ended);
    }

    #[test]
    fn test_mut_reference_is_a_visitor() {
        let mut counter = Counter::default();
        {
            let mut by_ref = &mut counter;
            MethodVisitor::visit_insn(&mut by_ref, crate::codegen::opcodes::NOP);
        }
        assert_eq!(counter.insns, 1);
    }
}
