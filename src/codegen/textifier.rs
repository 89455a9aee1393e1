//! Human-readable listing of a recorded method
//!
//! Labels are renamed `L0`, `L1`, ... in order of first appearance so that two
//! recordings of the same code print identically even though label ids differ.

use std::collections::HashMap;
use std::fmt::Write;

use super::flag::describe_method_access;
use super::node::{Insn, MethodNode};
use super::opcodes;
use super::visitor::{Frame, FrameValue, Label, LdcValue};

#[derive(Default)]
struct LabelNames {
    names: HashMap<Label, usize>,
}

impl LabelNames {
    fn name(&mut self, label: Label) -> String {
        let next = self.names.len();
        format!("L{}", self.names.entry(label).or_insert(next))
    }
}

fn op_name(opcode: u8) -> String {
    opcodes::mnemonic(opcode)
        .map(str::to_string)
        .unwrap_or_else(|| format!("OPCODE_0x{:02x}", opcode))
}

fn frame_value(value: &FrameValue, labels: &mut LabelNames) -> String {
    match value {
        FrameValue::Top => "T".to_string(),
        FrameValue::Integer => "I".to_string(),
        FrameValue::Float => "F".to_string(),
        FrameValue::Double => "D".to_string(),
        FrameValue::Long => "J".to_string(),
        FrameValue::Null => "N".to_string(),
        FrameValue::UninitializedThis => "U".to_string(),
        FrameValue::Object(name) => name.clone(),
        FrameValue::Uninitialized(label) => labels.name(*label),
    }
}

fn frame_values(values: &[FrameValue], labels: &mut LabelNames) -> String {
    values
        .iter()
        .map(|v| frame_value(v, labels))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ldc(value: &LdcValue) -> String {
    match value {
        LdcValue::Int(v) => v.to_string(),
        LdcValue::Float(v) => format!("{}F", v),
        LdcValue::Long(v) => format!("{}L", v),
        LdcValue::Double(v) => format!("{}D", v),
        LdcValue::String(s) => format!("{:?}", s),
        LdcValue::Type(t) => format!("{}.class", t),
    }
}

/// Render only the code section of `method`
pub fn code_listing(method: &MethodNode) -> String {
    let mut labels = LabelNames::default();
    let mut out = String::new();
    // Labels get their names in code order, before try/catch ranges mention them
    for insn in &method.instructions {
        if let Insn::Label(label) = insn {
            labels.name(*label);
        }
    }
    for block in &method.try_catch_blocks {
        let _ = writeln!(
            out,
            "    TRYCATCHBLOCK {} {} {} {}",
            labels.name(block.start),
            labels.name(block.end),
            labels.name(block.handler),
            block.exception_type.as_deref().unwrap_or("null")
        );
    }
    for insn in &method.instructions {
        let line = match insn {
            Insn::Label(label) => format!("   {}", labels.name(*label)),
            Insn::LineNumber { line, start } => format!("    LINENUMBER {} {}", line, labels.name(*start)),
            Insn::Frame(frame) => match frame {
                Frame::Same => "    FRAME SAME".to_string(),
                Frame::Same1(value) => format!("    FRAME SAME1 {}", frame_value(value, &mut labels)),
                Frame::Append(locals) => format!("    FRAME APPEND [{}]", frame_values(locals, &mut labels)),
                Frame::Chop(count) => format!("    FRAME CHOP {}", count),
                Frame::Full { locals, stack } => format!(
                    "    FRAME FULL [{}] [{}]",
                    frame_values(locals, &mut labels),
                    frame_values(stack, &mut labels)
                ),
            },
            Insn::Op(opcode) => format!("    {}", op_name(*opcode)),
            Insn::Int { opcode, operand } => format!("    {} {}", op_name(*opcode), operand),
            Insn::Var { opcode, var } => format!("    {} {}", op_name(*opcode), var),
            Insn::Type { opcode, type_name } => format!("    {} {}", op_name(*opcode), type_name),
            Insn::Field { opcode, owner, name, descriptor } => {
                format!("    {} {}.{} : {}", op_name(*opcode), owner, name, descriptor)
            }
            Insn::Method { opcode, owner, name, descriptor, is_interface } => format!(
                "    {} {}.{} {}{}",
                op_name(*opcode),
                owner,
                name,
                descriptor,
                if *is_interface && *opcode != opcodes::INVOKEINTERFACE { " (itf)" } else { "" }
            ),
            Insn::Jump { opcode, label } => format!("    {} {}", op_name(*opcode), labels.name(*label)),
            Insn::Ldc(value) => format!("    LDC {}", ldc(value)),
            Insn::Iinc { var, increment } => format!("    IINC {} {}", var, increment),
            Insn::TableSwitch { min, max, default, labels: targets } => {
                let mut s = format!("    TABLESWITCH {}..{}", min, max);
                for (key, target) in (*min..).zip(targets) {
                    let _ = write!(s, "\n      {}: {}", key, labels.name(*target));
                }
                let _ = write!(s, "\n      default: {}", labels.name(*default));
                s
            }
            Insn::LookupSwitch { default, keys, labels: targets } => {
                let mut s = "    LOOKUPSWITCH".to_string();
                for (key, target) in keys.iter().zip(targets) {
                    let _ = write!(s, "\n      {}: {}", key, labels.name(*target));
                }
                let _ = write!(s, "\n      default: {}", labels.name(*default));
                s
            }
            Insn::MultiANewArray { descriptor, dimensions } => {
                format!("    MULTIANEWARRAY {} {}", descriptor, dimensions)
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    for local in &method.local_variables {
        let _ = writeln!(
            out,
            "    LOCALVARIABLE {} {} {} {} {}",
            local.name,
            local.descriptor,
            labels.name(local.start),
            labels.name(local.end),
            local.index
        );
    }
    if method.has_code {
        let _ = writeln!(out, "    MAXSTACK = {}", method.max_stack);
        let _ = writeln!(out, "    MAXLOCALS = {}", method.max_locals);
    }
    out
}

/// Render the method header, annotations and code
pub fn listing(method: &MethodNode) -> String {
    let mut out = String::new();
    let access = describe_method_access(method.access);
    if access.is_empty() {
        let _ = writeln!(out, "  {}{}", method.name, method.descriptor);
    } else {
        let _ = writeln!(out, "  {} {}{}", access, method.name, method.descriptor);
    }
    for annotation in &method.annotations {
        let _ = writeln!(
            out,
            "    @{} // {}",
            annotation.descriptor,
            if annotation.visible { "visible" } else { "invisible" }
        );
    }
    out.push_str(&code_listing(method));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::opcodes::*;
    use crate::codegen::visitor::MethodVisitor;

    fn record(labels: (Label, Label)) -> MethodNode {
        let (start, skip) = labels;
        let mut m = MethodNode::new(0x0001, "getAge", "()I");
        m.visit_code();
        m.visit_label(start);
        m.visit_var_insn(ALOAD, 0);
        m.visit_field_insn(GETFIELD, "a/P", "jdoFlags", "B");
        m.visit_jump_insn(IFLE, skip);
        m.visit_insn(ICONST_1);
        m.visit_insn(IRETURN);
        m.visit_label(skip);
        m.visit_frame(&Frame::Same);
        m.visit_insn(ICONST_0);
        m.visit_insn(IRETURN);
        m.visit_maxs(1, 1);
        m.visit_end();
        m
    }

    #[test]
    fn test_listing_is_label_independent() {
        let a = listing(&record((Label::new(), Label::new())));
        let b = listing(&record((Label::new(), Label::new())));
        assert_eq!(a, b);
        assert!(a.starts_with("  public getAge()I\n"));
        assert!(a.contains("    IFLE L1\n"));
        assert!(a.contains("   L1\n    FRAME SAME\n"));
        assert!(a.contains("    GETFIELD a/P.jdoFlags : B\n"));
        assert!(a.ends_with("    MAXSTACK = 1\n    MAXLOCALS = 1\n"));
    }
}
