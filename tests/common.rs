// Common test utilities
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use tolc_enhancer::codegen::node::{Insn, MethodNode};
use tolc_enhancer::codegen::opcodes::*;
use tolc_enhancer::codegen::visitor::{Label, LdcValue};

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

/// Where a returned property value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The relocated `jdoGetXXX` body
    Stored,
    /// A `getXXXField` call on the state manager
    Managed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Null,
    This,
    Manager,
    DetachedState,
    BitSet(i32),
    Listener,
    Str(String),
    Exception { class: String, message: Option<String> },
    Property(Source),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Returned(Value),
    Thrown { class: String, message: Option<String> },
}

/// Runtime state of the persistable instance a getter is invoked on
#[derive(Debug, Clone, Default)]
pub struct Instance {
    pub flags: i8,
    /// Fields the attached state manager reports as loaded; `None` when detached or transient
    pub manager: Option<HashSet<i32>>,
    pub detached: bool,
    /// `jdoDetachedState[2]`
    pub loaded_bits: HashSet<i32>,
    /// `jdoDetachedState[3]`
    pub modified_bits: HashSet<i32>,
    pub inherited_field_count: i32,
}

impl Instance {
    pub fn with_manager(mut self, loaded: &[i32]) -> Self {
        self.manager = Some(loaded.iter().copied().collect());
        self
    }

    pub fn with_flags(mut self, flags: i8) -> Self {
        self.flags = flags;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub fn with_inherited(mut self, count: i32) -> Self {
        self.inherited_field_count = count;
        self
    }
}

/// Side effects observed while running a body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    /// State manager calls with the field index they addressed
    pub manager_calls: Vec<(String, i32)>,
    /// Field names passed to the detach listener
    pub listener_calls: Vec<String>,
    pub relocated_calls: usize,
    /// Bit set lookups as (detached state slot, index)
    pub bit_lookups: Vec<(i32, i32)>,
    pub max_depth: usize,
}

/// Execute a generated getter body against `instance`.
///
/// Only the instructions the enhancer emits are understood; anything else panics.
pub fn run(method: &MethodNode, instance: &Instance) -> (Outcome, Trace) {
    let labels: HashMap<Label, usize> = method
        .instructions
        .iter()
        .enumerate()
        .filter_map(|(i, insn)| match insn {
            Insn::Label(label) => Some((*label, i)),
            _ => None,
        })
        .collect();

    let mut stack: Vec<Value> = Vec::new();
    let mut trace = Trace::default();
    let mut pc = 0usize;

    for _ in 0..10_000 {
        let insn = method
            .instructions
            .get(pc)
            .unwrap_or_else(|| panic!("fell off the end of {}", method.name));
        pc += 1;

        match insn {
            Insn::Label(_) | Insn::Frame(_) | Insn::LineNumber { .. } => {}
            Insn::Var { opcode: ALOAD, var: 0 } => stack.push(Value::This),
            Insn::Op(op) if (ICONST_M1..=ICONST_5).contains(op) => {
                stack.push(Value::Int(*op as i32 - ICONST_0 as i32))
            }
            Insn::Int { opcode: BIPUSH | SIPUSH, operand } => stack.push(Value::Int(*operand)),
            Insn::Ldc(LdcValue::Int(v)) => stack.push(Value::Int(*v)),
            Insn::Ldc(LdcValue::String(s)) => stack.push(Value::Str(s.clone())),
            Insn::Op(IADD) => {
                let b = pop_int(&mut stack);
                let a = pop_int(&mut stack);
                stack.push(Value::Int(a + b));
            }
            Insn::Op(AALOAD) => {
                let slot = pop_int(&mut stack);
                assert_eq!(stack.pop(), Some(Value::DetachedState));
                stack.push(Value::BitSet(slot));
            }
            Insn::Op(DUP) => {
                let top = stack.last().cloned().expect("DUP on empty stack");
                stack.push(top);
            }
            Insn::Op(ATHROW) => match stack.pop() {
                Some(Value::Exception { class, message }) => return (Outcome::Thrown { class, message }, trace),
                other => panic!("ATHROW of {:?}", other),
            },
            Insn::Op(op) if is_return(*op) => {
                let value = stack.pop().expect("return with empty stack");
                return (Outcome::Returned(value), trace);
            }
            Insn::Field { opcode: GETFIELD, name, .. } => {
                assert_eq!(stack.pop(), Some(Value::This));
                stack.push(match name.as_str() {
                    "jdoFlags" => Value::Int(instance.flags as i32),
                    "jdoStateManager" if instance.manager.is_some() => Value::Manager,
                    "jdoStateManager" => Value::Null,
                    "jdoDetachedState" => Value::DetachedState,
                    other => panic!("unexpected GETFIELD {}", other),
                });
            }
            Insn::Field { opcode: GETSTATIC, name, .. } if name == "jdoInheritedFieldCount" => {
                stack.push(Value::Int(instance.inherited_field_count))
            }
            Insn::Type { opcode: CHECKCAST, .. } => {}
            Insn::Type { opcode: NEW, type_name } => stack.push(Value::Exception {
                class: type_name.clone(),
                message: None,
            }),
            Insn::Jump { opcode, label } => {
                let taken = match *opcode {
                    IFNULL => stack.pop().expect("IFNULL on empty stack") == Value::Null,
                    IFLE => pop_int(&mut stack) <= 0,
                    IFNE => pop_int(&mut stack) != 0,
                    IFEQ => pop_int(&mut stack) == 0,
                    GOTO => true,
                    other => panic!("unexpected jump {:?}", mnemonic(other)),
                };
                if taken {
                    pc = labels[label];
                }
            }
            Insn::Method { opcode, owner, name, .. } => call(*opcode, owner, name, &mut stack, instance, &mut trace),
            other => panic!("unexpected instruction {:?}", other),
        }
        trace.max_depth = trace.max_depth.max(stack.len());
    }
    panic!("{} did not terminate", method.name)
}

fn call(opcode: u8, owner: &str, name: &str, stack: &mut Vec<Value>, instance: &Instance, trace: &mut Trace) {
    match (opcode, name) {
        (INVOKEINTERFACE, "isLoaded") => {
            let index = pop_int(stack);
            assert_eq!(stack.pop(), Some(Value::This));
            assert_eq!(stack.pop(), Some(Value::Manager));
            trace.manager_calls.push((name.to_string(), index));
            let loaded = instance.manager.as_ref().map_or(false, |set| set.contains(&index));
            stack.push(Value::Int(loaded as i32));
        }
        (INVOKEINTERFACE, _) if name.starts_with("get") && name.ends_with("Field") => {
            assert_eq!(stack.pop(), Some(Value::Property(Source::Stored)));
            let index = pop_int(stack);
            assert_eq!(stack.pop(), Some(Value::This));
            assert_eq!(stack.pop(), Some(Value::Manager));
            trace.manager_calls.push((name.to_string(), index));
            stack.push(Value::Property(Source::Managed));
        }
        (INVOKEVIRTUAL, "get") if owner == "java/util/BitSet" => {
            let index = pop_int(stack);
            let slot = match stack.pop() {
                Some(Value::BitSet(slot)) => slot,
                other => panic!("BitSet.get on {:?}", other),
            };
            trace.bit_lookups.push((slot, index));
            let bits = match slot {
                2 => &instance.loaded_bits,
                3 => &instance.modified_bits,
                other => panic!("unexpected detached state slot {}", other),
            };
            stack.push(Value::Int(bits.contains(&index) as i32));
        }
        (INVOKEVIRTUAL, "jdoIsDetached") => {
            assert_eq!(stack.pop(), Some(Value::This));
            stack.push(Value::Int(instance.detached as i32));
        }
        (INVOKEVIRTUAL, _) if name.starts_with("jdoGet") => {
            assert_eq!(stack.pop(), Some(Value::This));
            trace.relocated_calls += 1;
            stack.push(Value::Property(Source::Stored));
        }
        (INVOKESTATIC, "getInstance") => stack.push(Value::Listener),
        (INVOKEVIRTUAL, "undetachedFieldAccess") => {
            let field = match stack.pop() {
                Some(Value::Str(field)) => field,
                other => panic!("listener called with {:?}", other),
            };
            assert_eq!(stack.pop(), Some(Value::This));
            assert_eq!(stack.pop(), Some(Value::Listener));
            trace.listener_calls.push(field);
        }
        (INVOKESPECIAL, "<init>") => {
            let message = match stack.pop() {
                Some(Value::Str(message)) => message,
                other => panic!("exception constructed with {:?}", other),
            };
            assert!(matches!(stack.pop(), Some(Value::Exception { .. })));
            match stack.last_mut() {
                Some(Value::Exception { message: slot, .. }) => *slot = Some(message),
                other => panic!("constructor result lost: {:?}", other),
            }
        }
        _ => panic!("unexpected call {} {}.{}", mnemonic(opcode).unwrap_or("?"), owner, name),
    }
}

fn pop_int(stack: &mut Vec<Value>) -> i32 {
    match stack.pop() {
        Some(Value::Int(v)) => v,
        other => panic!("expected int on stack, found {:?}", other),
    }
}
