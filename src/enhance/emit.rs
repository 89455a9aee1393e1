//! Small instruction sequences shared by the generated bodies

use crate::codegen::opcodes::*;
use crate::codegen::visitor::{LdcValue, MethodVisitor};
use crate::meta::JavaType;

/// Push an int constant using the shortest encoding
pub fn push_int(mv: &mut dyn MethodVisitor, value: i32) {
    match value {
        -1..=5 => mv.visit_insn((ICONST_0 as i32 + value) as u8),
        -128..=127 => mv.visit_int_insn(BIPUSH, value),
        -32768..=32767 => mv.visit_int_insn(SIPUSH, value),
        _ => mv.visit_ldc_insn(&LdcValue::Int(value)),
    }
}

pub fn load_this(mv: &mut dyn MethodVisitor) {
    mv.visit_var_insn(ALOAD, 0);
}

/// Return a value of `java_type` from the top of the stack
pub fn return_value(mv: &mut dyn MethodVisitor, java_type: &JavaType) {
    mv.visit_insn(java_type.return_opcode());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::node::{Insn, MethodNode};

    fn pushed(value: i32) -> Insn {
        let mut m = MethodNode::new(0, "m", "()V");
        push_int(&mut m, value);
        m.instructions.remove(0)
    }

    #[test]
    fn test_push_int_encodings() {
        assert_eq!(pushed(0), Insn::Op(ICONST_0));
        assert_eq!(pushed(5), Insn::Op(ICONST_5));
        assert_eq!(pushed(-1), Insn::Op(ICONST_M1));
        assert_eq!(pushed(6), Insn::Int { opcode: BIPUSH, operand: 6 });
        assert_eq!(pushed(200), Insn::Int { opcode: SIPUSH, operand: 200 });
        assert_eq!(pushed(40_000), Insn::Ldc(LdcValue::Int(40_000)));
    }
}
