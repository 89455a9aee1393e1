//! In-memory recording of method emission events
//!
//! `MethodNode` stores every event it receives, in order, and can replay them
//! into another visitor. `ClassNode` is the matching class-level sink: each
//! `visit_method` call opens a fresh node that the class keeps a handle to.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use super::opcodes;
use super::visitor::{
    Annotation, AnnotationValue, Attribute, ClassVisitor, Frame, Label, LdcValue, MethodVisitor,
};

/// One code-section event
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    Label(Label),
    Frame(Frame),
    Op(u8),
    Int { opcode: u8, operand: i32 },
    Var { opcode: u8, var: u16 },
    Type { opcode: u8, type_name: String },
    Field { opcode: u8, owner: String, name: String, descriptor: String },
    Method { opcode: u8, owner: String, name: String, descriptor: String, is_interface: bool },
    Jump { opcode: u8, label: Label },
    Ldc(LdcValue),
    Iinc { var: u16, increment: i16 },
    TableSwitch { min: i32, max: i32, default: Label, labels: Vec<Label> },
    LookupSwitch { default: Label, keys: Vec<i32>, labels: Vec<Label> },
    MultiANewArray { descriptor: String, dimensions: u8 },
    LineNumber { line: u16, start: Label },
}

impl Insn {
    /// Opcode of a real instruction; `None` for labels, frames and line numbers
    pub fn opcode(&self) -> Option<u8> {
        match self {
            Insn::Label(_) | Insn::Frame(_) | Insn::LineNumber { .. } => None,
            Insn::Op(opcode)
            | Insn::Int { opcode, .. }
            | Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Jump { opcode, .. } => Some(*opcode),
            Insn::Ldc(_) => Some(opcodes::LDC),
            Insn::Iinc { .. } => Some(opcodes::IINC),
            Insn::TableSwitch { .. } => Some(opcodes::TABLESWITCH),
            Insn::LookupSwitch { .. } => Some(opcodes::LOOKUPSWITCH),
            Insn::MultiANewArray { .. } => Some(opcodes::MULTIANEWARRAY),
        }
    }

    /// Labels this event refers to without placing them
    pub fn referenced_labels(&self) -> Vec<Label> {
        match self {
            Insn::Jump { label, .. } => vec![*label],
            Insn::TableSwitch { default, labels, .. } | Insn::LookupSwitch { default, labels, .. } => {
                std::iter::once(*default).chain(labels.iter().copied()).collect()
            }
            Insn::LineNumber { start, .. } => vec![*start],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryCatchBlock {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    pub exception_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub start: Label,
    pub end: Label,
    pub index: u16,
}

/// A fully recorded method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub parameters: Vec<(Option<String>, u16)>,
    pub annotation_default: Option<AnnotationValue>,
    pub annotations: Vec<Annotation>,
    pub parameter_annotations: Vec<(u8, Annotation)>,
    pub attributes: Vec<Attribute>,
    pub has_code: bool,
    pub instructions: Vec<Insn>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
    pub local_variables: Vec<LocalVariable>,
    pub max_stack: u16,
    pub max_locals: u16,
    pub ended: bool,
}

impl MethodNode {
    pub fn new(access: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            exceptions: Vec::new(),
            parameters: Vec::new(),
            annotation_default: None,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
            attributes: Vec::new(),
            has_code: false,
            instructions: Vec::new(),
            try_catch_blocks: Vec::new(),
            local_variables: Vec::new(),
            max_stack: 0,
            max_locals: 0,
            ended: false,
        }
    }

    /// Real instructions only (labels, frames and line numbers skipped)
    pub fn opcodes(&self) -> Vec<u8> {
        self.instructions.iter().filter_map(Insn::opcode).collect()
    }

    pub fn count_opcode(&self, opcode: u8) -> usize {
        self.opcodes().iter().filter(|&&op| op == opcode).count()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.instructions.iter().filter_map(|insn| match insn {
            Insn::Frame(frame) => Some(frame),
            _ => None,
        })
    }

    /// Replay the recorded events, in their original order, into `mv`
    pub fn accept(&self, mv: &mut dyn MethodVisitor) {
        for (name, access) in &self.parameters {
            mv.visit_parameter(name.as_deref(), *access);
        }
        if let Some(value) = &self.annotation_default {
            mv.visit_annotation_default(value);
        }
        for annotation in &self.annotations {
            mv.visit_annotation(annotation);
        }
        for (parameter, annotation) in &self.parameter_annotations {
            mv.visit_parameter_annotation(*parameter, annotation);
        }
        for attribute in &self.attributes {
            mv.visit_attribute(attribute);
        }
        if self.has_code {
            mv.visit_code();
            for block in &self.try_catch_blocks {
                mv.visit_try_catch_block(block.start, block.end, block.handler, block.exception_type.as_deref());
            }
            for insn in &self.instructions {
                replay_insn(insn, mv);
            }
            for local in &self.local_variables {
                mv.visit_local_variable(
                    &local.name,
                    &local.descriptor,
                    local.signature.as_deref(),
                    local.start,
                    local.end,
                    local.index,
                );
            }
            mv.visit_maxs(self.max_stack, self.max_locals);
        }
        mv.visit_end();
    }
}

fn replay_insn(insn: &Insn, mv: &mut dyn MethodVisitor) {
    match insn {
        Insn::Label(label) => mv.visit_label(*label),
        Insn::Frame(frame) => mv.visit_frame(frame),
        Insn::Op(opcode) => mv.visit_insn(*opcode),
        Insn::Int { opcode, operand } => mv.visit_int_insn(*opcode, *operand),
        Insn::Var { opcode, var } => mv.visit_var_insn(*opcode, *var),
        Insn::Type { opcode, type_name } => mv.visit_type_insn(*opcode, type_name),
        Insn::Field { opcode, owner, name, descriptor } => mv.visit_field_insn(*opcode, owner, name, descriptor),
        Insn::Method { opcode, owner, name, descriptor, is_interface } => {
            mv.visit_method_insn(*opcode, owner, name, descriptor, *is_interface)
        }
        Insn::Jump { opcode, label } => mv.visit_jump_insn(*opcode, *label),
        Insn::Ldc(value) => mv.visit_ldc_insn(value),
        Insn::Iinc { var, increment } => mv.visit_iinc_insn(*var, *increment),
        Insn::TableSwitch { min, max, default, labels } => mv.visit_table_switch_insn(*min, *max, *default, labels),
        Insn::LookupSwitch { default, keys, labels } => mv.visit_lookup_switch_insn(*default, keys, labels),
        Insn::MultiANewArray { descriptor, dimensions } => mv.visit_multi_anew_array_insn(descriptor, *dimensions),
        Insn::LineNumber { line, start } => mv.visit_line_number(*line, *start),
    }
}

impl MethodVisitor for MethodNode {
    fn visit_parameter(&mut self, name: Option<&str>, access: u16) {
        self.parameters.push((name.map(str::to_string), access));
    }

    fn visit_annotation_default(&mut self, value: &AnnotationValue) {
        self.annotation_default = Some(value.clone());
    }

    fn visit_annotation(&mut self, annotation: &Annotation) {
        self.annotations.push(annotation.clone());
    }

    fn visit_parameter_annotation(&mut self, parameter: u8, annotation: &Annotation) {
        self.parameter_annotations.push((parameter, annotation.clone()));
    }

    fn visit_attribute(&mut self, attribute: &Attribute) {
        self.attributes.push(attribute.clone());
    }

    fn visit_code(&mut self) {
        self.has_code = true;
    }

    fn visit_frame(&mut self, frame: &Frame) {
        self.instructions.push(Insn::Frame(frame.clone()));
    }

    fn visit_insn(&mut self, opcode: u8) {
        self.instructions.push(Insn::Op(opcode));
    }

    fn visit_int_insn(&mut self, opcode: u8, operand: i32) {
        self.instructions.push(Insn::Int { opcode, operand });
    }

    fn visit_var_insn(&mut self, opcode: u8, var: u16) {
        self.instructions.push(Insn::Var { opcode, var });
    }

    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) {
        self.instructions.push(Insn::Type { opcode, type_name: type_name.to_string() });
    }

    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) {
        self.instructions.push(Insn::Field {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }

    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
        self.instructions.push(Insn::Method {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_interface,
        });
    }

    fn visit_jump_insn(&mut self, opcode: u8, label: Label) {
        self.instructions.push(Insn::Jump { opcode, label });
    }

    fn visit_label(&mut self, label: Label) {
        self.instructions.push(Insn::Label(label));
    }

    fn visit_ldc_insn(&mut self, value: &LdcValue) {
        self.instructions.push(Insn::Ldc(value.clone()));
    }

    fn visit_iinc_insn(&mut self, var: u16, increment: i16) {
        self.instructions.push(Insn::Iinc { var, increment });
    }

    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: Label, labels: &[Label]) {
        self.instructions.push(Insn::TableSwitch { min, max, default, labels: labels.to_vec() });
    }

    fn visit_lookup_switch_insn(&mut self, default: Label, keys: &[i32], labels: &[Label]) {
        self.instructions.push(Insn::LookupSwitch { default, keys: keys.to_vec(), labels: labels.to_vec() });
    }

    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) {
        self.instructions.push(Insn::MultiANewArray { descriptor: descriptor.to_string(), dimensions });
    }

    fn visit_try_catch_block(&mut self, start: Label, end: Label, handler: Label, exception_type: Option<&str>) {
        self.try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            exception_type: exception_type.map(str::to_string),
        });
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
        self.local_variables.push(LocalVariable {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            start,
            end,
            index,
        });
    }

    fn visit_line_number(&mut self, line: u16, start: Label) {
        self.instructions.push(Insn::LineNumber { line, start });
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        self.max_stack = max_stack;
        self.max_locals = max_locals;
    }

    fn visit_end(&mut self) {
        self.ended = true;
    }
}

/// Shared handle to a `MethodNode` owned by a `ClassNode`
#[derive(Debug, Clone)]
pub struct MethodNodeRef(Rc<RefCell<MethodNode>>);

impl MethodNodeRef {
    pub fn borrow(&self) -> Ref<'_, MethodNode> {
        self.0.borrow()
    }

    pub fn snapshot(&self) -> MethodNode {
        self.0.borrow().clone()
    }
}

impl MethodVisitor for MethodNodeRef {
    fn visit_parameter(&mut self, name: Option<&str>, access: u16) {
        self.0.borrow_mut().visit_parameter(name, access)
    }
    fn visit_annotation_default(&mut self, value: &AnnotationValue) {
        self.0.borrow_mut().visit_annotation_default(value)
    }
    fn visit_annotation(&mut self, annotation: &Annotation) {
        self.0.borrow_mut().visit_annotation(annotation)
    }
    fn visit_parameter_annotation(&mut self, parameter: u8, annotation: &Annotation) {
        self.0.borrow_mut().visit_parameter_annotation(parameter, annotation)
    }
    fn visit_attribute(&mut self, attribute: &Attribute) {
        self.0.borrow_mut().visit_attribute(attribute)
    }
    fn visit_code(&mut self) {
        self.0.borrow_mut().visit_code()
    }
    fn visit_frame(&mut self, frame: &Frame) {
        self.0.borrow_mut().visit_frame(frame)
    }
    fn visit_insn(&mut self, opcode: u8) {
        self.0.borrow_mut().visit_insn(opcode)
    }
    fn visit_int_insn(&mut self, opcode: u8, operand: i32) {
        self.0.borrow_mut().visit_int_insn(opcode, operand)
    }
    fn visit_var_insn(&mut self, opcode: u8, var: u16) {
        self.0.borrow_mut().visit_var_insn(opcode, var)
    }
    fn visit_type_insn(&mut self, opcode: u8, type_name: &str) {
        self.0.borrow_mut().visit_type_insn(opcode, type_name)
    }
    fn visit_field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) {
        self.0.borrow_mut().visit_field_insn(opcode, owner, name, descriptor)
    }
    fn visit_method_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, is_interface: bool) {
        self.0.borrow_mut().visit_method_insn(opcode, owner, name, descriptor, is_interface)
    }
    fn visit_jump_insn(&mut self, opcode: u8, label: Label) {
        self.0.borrow_mut().visit_jump_insn(opcode, label)
    }
    fn visit_label(&mut self, label: Label) {
        self.0.borrow_mut().visit_label(label)
    }
    fn visit_ldc_insn(&mut self, value: &LdcValue) {
        self.0.borrow_mut().visit_ldc_insn(value)
    }
    fn visit_iinc_insn(&mut self, var: u16, increment: i16) {
        self.0.borrow_mut().visit_iinc_insn(var, increment)
    }
    fn visit_table_switch_insn(&mut self, min: i32, max: i32, default: Label, labels: &[Label]) {
        self.0.borrow_mut().visit_table_switch_insn(min, max, default, labels)
    }
    fn visit_lookup_switch_insn(&mut self, default: Label, keys: &[i32], labels: &[Label]) {
        self.0.borrow_mut().visit_lookup_switch_insn(default, keys, labels)
    }
    fn visit_multi_anew_array_insn(&mut self, descriptor: &str, dimensions: u8) {
        self.0.borrow_mut().visit_multi_anew_array_insn(descriptor, dimensions)
    }
    fn visit_try_catch_block(&mut self, start: Label, end: Label, handler: Label, exception_type: Option<&str>) {
        self.0.borrow_mut().visit_try_catch_block(start, end, handler, exception_type)
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
        self.0.borrow_mut().visit_local_variable(name, descriptor, signature, start, end, index)
    }
    fn visit_line_number(&mut self, line: u16, start: Label) {
        self.0.borrow_mut().visit_line_number(line, start)
    }
    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        self.0.borrow_mut().visit_maxs(max_stack, max_locals)
    }
    fn visit_end(&mut self) {
        self.0.borrow_mut().visit_end()
    }
}

/// Collects the methods opened on it, in creation order
#[derive(Debug, Default)]
pub struct ClassNode {
    pub name: String,
    methods: Vec<MethodNodeRef>,
}

impl ClassNode {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), methods: Vec::new() }
    }

    pub fn methods(&self) -> &[MethodNodeRef] {
        &self.methods
    }

    pub fn find_method(&self, name: &str) -> Option<MethodNode> {
        self.methods
            .iter()
            .find(|method| method.borrow().name == name)
            .map(MethodNodeRef::snapshot)
    }
}

impl ClassVisitor for ClassNode {
    type Method = MethodNodeRef;

    fn visit_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[String],
    ) -> MethodNodeRef {
        let mut node = MethodNode::new(access, name, descriptor);
        node.signature = signature.map(str::to_string);
        node.exceptions = exceptions.to_vec();
        let handle = MethodNodeRef(Rc::new(RefCell::new(node)));
        self.methods.push(handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::opcodes::*;

    #[test]
    fn test_accept_replays_identically() {
        let mut original = MethodNode::new(0x0001, "getName", "()Ljava/lang/String;");
        let start = Label::new();
        original.visit_annotation(&Annotation::new("Ljavax/persistence/Basic;", true));
        original.visit_code();
        original.visit_label(start);
        original.visit_line_number(12, start);
        original.visit_var_insn(ALOAD, 0);
        original.visit_field_insn(GETFIELD, "a/Person", "name", "Ljava/lang/String;");
        original.visit_insn(ARETURN);
        original.visit_maxs(1, 1);
        original.visit_end();

        let mut copy = MethodNode::new(0x0001, "getName", "()Ljava/lang/String;");
        original.accept(&mut copy);
        assert_eq!(copy, original);
        assert_eq!(copy.opcodes(), vec![ALOAD, GETFIELD, ARETURN]);
    }

    #[test]
    fn test_class_node_keeps_handles() {
        let mut class = ClassNode::new("a/Person");
        let mut method = class.visit_method(0x0002, "jdoGetname", "()I", None, &[]);
        method.visit_code();
        method.visit_insn(ICONST_0);
        method.visit_insn(IRETURN);
        method.visit_end();

        let found = class.find_method("jdoGetname").expect("method recorded");
        assert!(found.ended);
        assert_eq!(found.count_opcode(IRETURN), 1);
        assert!(class.find_method("missing").is_none());
    }

    #[test]
    fn test_referenced_labels() {
        let (a, b, c) = (Label::new(), Label::new(), Label::new());
        let switch = Insn::TableSwitch { min: 0, max: 1, default: a, labels: vec![b, c] };
        assert_eq!(switch.referenced_labels(), vec![a, b, c]);
        assert_eq!(Insn::Op(NOP).referenced_labels(), Vec::<Label>::new());
    }
}
