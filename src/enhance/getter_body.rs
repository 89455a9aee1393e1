//! Replacement body for a property getter
//!
//! The body reads the property through the relocated getter (`jdoGetname`)
//! and, depending on the field's read strategy, first lets the state manager
//! supply the value. Shapes, for a detachable class:
//!
//! ```text
//! CheckFlag:          if (jdoFlags > 0 && jdoStateManager != null
//!                         && !jdoStateManager.isLoaded(this, IDX))
//!                         return jdoStateManager.getXField(this, IDX, jdoGetname());
//!                     <detach check>
//!                     return jdoGetname();
//! MediateViaManager:  same, without the jdoFlags test
//! Normal:             return jdoGetname();
//!
//! detach check:       if (jdoIsDetached()
//!                         && !((BitSet) jdoDetachedState[2]).get(IDX)
//!                         && !((BitSet) jdoDetachedState[3]).get(IDX))
//!                         throw new JDODetachedFieldAccessException(msg);
//!                         // or DetachListener.getInstance().undetachedFieldAccess(this, "name")
//! ```
//!
//! `IDX` is the declared field id, plus `jdoInheritedFieldCount` when the class
//! has a persistable superclass.

use log::trace;

use super::context::EnhanceContext;
use super::emit::{load_this, push_int, return_value};
use super::namer::EnhancementNamer;
use crate::codegen::descriptor::method_descriptor;
use crate::codegen::opcodes::*;
use crate::codegen::visitor::{Frame, Label, LdcValue, MethodVisitor};
use crate::common::consts::*;
use crate::common::error::Result;
use crate::common::messages::MessageSource;
use crate::meta::{ClassMeta, FieldMeta, JavaType, ReadStrategy};

/// State manager call shared by the `CheckFlag` and `MediateViaManager` bodies
#[derive(Debug, Clone, PartialEq)]
struct ManagerAccess {
    field_name: String,
    descriptor: String,
    owner: String,
    is_loaded_descriptor: String,
    get_field_method: String,
    get_field_descriptor: String,
    /// Internal name to CHECKCAST an Object-typed result to
    cast: Option<String>,
}

/// Detached-state test emitted for detachable classes
#[derive(Debug, Clone, PartialEq)]
struct DetachCheck {
    is_detached_method: String,
    state_field: String,
    listener: String,
    listener_descriptor: String,
    exception: String,
    message: String,
}

/// Everything needed to emit one getter body, resolved up front.
///
/// Building a `GetterBody` is where metadata is validated; emitting it cannot
/// fail.
#[derive(Debug, Clone, PartialEq)]
pub struct GetterBody {
    owner: String,
    owner_descriptor: String,
    field_name: String,
    field_type: JavaType,
    field_id: i32,
    strategy: ReadStrategy,
    relocated_name: String,
    relocated_descriptor: String,
    /// Static field holding the inherited field count, for subclasses
    inherited_count_field: Option<String>,
    flags_field: String,
    manager: ManagerAccess,
    detach: Option<DetachCheck>,
}

impl GetterBody {
    pub fn prepare(
        field: &FieldMeta,
        class: &ClassMeta,
        namer: &dyn EnhancementNamer,
        messages: &dyn MessageSource,
    ) -> Result<Self> {
        field.validate()?;
        class.validate()?;

        let field_type = field.java_type.clone();
        let kind = field_type.managed_kind();
        let value_descriptor = kind.value_descriptor(&field_type);
        let persistable = JavaType::Reference(namer.persistable_internal_name().to_string());
        let manager = ManagerAccess {
            field_name: namer.state_manager_field_name().to_string(),
            descriptor: namer.state_manager_descriptor(),
            owner: namer.state_manager_internal_name().to_string(),
            is_loaded_descriptor: method_descriptor(&[persistable, JavaType::Int], Some(&JavaType::Boolean)),
            get_field_method: kind.get_field_method(),
            get_field_descriptor: format!(
                "(L{};I{}){}",
                namer.persistable_internal_name(),
                value_descriptor,
                value_descriptor
            ),
            cast: kind.needs_cast().then(|| field_type.internal_name()),
        };

        let detach = class.detachable.then(|| {
            let listener = namer.detach_listener_internal_name().to_string();
            DetachCheck {
                is_detached_method: namer.is_detached_method_name().to_string(),
                state_field: namer.detached_state_field_name().to_string(),
                listener_descriptor: format!("()L{};", listener),
                listener,
                exception: namer.detached_field_access_exception_internal_name().to_string(),
                message: messages.message(MSG_DETACHED_PROPERTY_ACCESS, &[&field.name]),
            }
        });

        Ok(Self {
            owner: class.internal_name.clone(),
            owner_descriptor: class.descriptor(),
            field_name: field.name.clone(),
            field_type,
            field_id: field.field_id,
            strategy: field.read_strategy,
            relocated_name: namer.prefixed_getter_name(field),
            relocated_descriptor: field.getter_descriptor(),
            inherited_count_field: class
                .has_persistable_superclass()
                .then(|| namer.inherited_field_count_field_name().to_string()),
            flags_field: namer.flags_field_name().to_string(),
            manager,
            detach,
        })
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    pub fn relocated_name(&self) -> &str {
        &self.relocated_name
    }

    /// Operand stack depth the body needs
    pub fn max_stack(&self) -> u16 {
        match self.strategy {
            ReadStrategy::Normal => self.field_type.size(),
            // state manager, this, index, value
            ReadStrategy::CheckFlag | ReadStrategy::MediateViaManager => 4u16.max(3 + self.field_type.size()),
        }
    }

    /// Emit the complete method, from `visit_code` through `visit_end`
    pub fn emit(&self, mv: &mut dyn MethodVisitor, detach_listener: bool, include_frames: bool) {
        trace!(
            "generating {} getter for {}.{} (detachable: {})",
            self.strategy,
            self.owner,
            self.field_name,
            self.detach.is_some()
        );
        mv.visit_code();
        let start = Label::new();
        mv.visit_label(start);

        match self.strategy {
            ReadStrategy::Normal => {}
            ReadStrategy::CheckFlag => {
                let skip = Label::new();
                load_this(mv);
                mv.visit_field_insn(GETFIELD, &self.owner, &self.flags_field, "B");
                mv.visit_jump_insn(IFLE, skip);
                self.emit_manager_read(mv, skip, include_frames);
            }
            ReadStrategy::MediateViaManager => {
                let skip = Label::new();
                self.emit_manager_read(mv, skip, include_frames);
            }
        }

        if self.strategy != ReadStrategy::Normal {
            if let Some(detach) = &self.detach {
                self.emit_detach_check(mv, detach, detach_listener, include_frames);
            }
        }

        self.emit_relocated_call(mv);
        return_value(mv, &self.field_type);

        let end = Label::new();
        mv.visit_label(end);
        mv.visit_local_variable("this", &self.owner_descriptor, None, start, end, 0);
        mv.visit_maxs(self.max_stack(), 1);
        mv.visit_end();
    }

    fn emit_relocated_call(&self, mv: &mut dyn MethodVisitor) {
        load_this(mv);
        mv.visit_method_insn(INVOKEVIRTUAL, &self.owner, &self.relocated_name, &self.relocated_descriptor, false);
    }

    fn emit_field_index(&self, mv: &mut dyn MethodVisitor) {
        push_int(mv, self.field_id);
        if let Some(count_field) = &self.inherited_count_field {
            mv.visit_field_insn(GETSTATIC, &self.owner, count_field, "I");
            mv.visit_insn(IADD);
        }
    }

    fn emit_state_manager(&self, mv: &mut dyn MethodVisitor) {
        load_this(mv);
        mv.visit_field_insn(GETFIELD, &self.owner, &self.manager.field_name, &self.manager.descriptor);
    }

    /// Return the manager's value when one is attached and the field is not loaded;
    /// otherwise continue at `skip`
    fn emit_manager_read(&self, mv: &mut dyn MethodVisitor, skip: Label, include_frames: bool) {
        let manager = &self.manager;
        self.emit_state_manager(mv);
        mv.visit_jump_insn(IFNULL, skip);

        self.emit_state_manager(mv);
        load_this(mv);
        self.emit_field_index(mv);
        mv.visit_method_insn(INVOKEINTERFACE, &manager.owner, IS_LOADED_METHOD, &manager.is_loaded_descriptor, true);
        mv.visit_jump_insn(IFNE, skip);

        self.emit_state_manager(mv);
        load_this(mv);
        self.emit_field_index(mv);
        self.emit_relocated_call(mv);
        mv.visit_method_insn(
            INVOKEINTERFACE,
            &manager.owner,
            &manager.get_field_method,
            &manager.get_field_descriptor,
            true,
        );
        if let Some(cast) = &manager.cast {
            mv.visit_type_insn(CHECKCAST, cast);
        }
        return_value(mv, &self.field_type);

        mv.visit_label(skip);
        if include_frames {
            mv.visit_frame(&Frame::Same);
        }
    }

    fn emit_detached_bit(&self, mv: &mut dyn MethodVisitor, detach: &DetachCheck, slot: u8, allowed: Label) {
        load_this(mv);
        mv.visit_field_insn(GETFIELD, &self.owner, &detach.state_field, DETACHED_STATE_DESCRIPTOR);
        push_int(mv, slot as i32);
        mv.visit_insn(AALOAD);
        mv.visit_type_insn(CHECKCAST, BITSET_INTERNAL_NAME);
        self.emit_field_index(mv);
        mv.visit_method_insn(INVOKEVIRTUAL, BITSET_INTERNAL_NAME, BITSET_GET_METHOD, BITSET_GET_DESCRIPTOR, false);
        mv.visit_jump_insn(IFNE, allowed);
    }

    fn emit_detach_check(
        &self,
        mv: &mut dyn MethodVisitor,
        detach: &DetachCheck,
        detach_listener: bool,
        include_frames: bool,
    ) {
        let allowed = Label::new();
        load_this(mv);
        mv.visit_method_insn(INVOKEVIRTUAL, &self.owner, &detach.is_detached_method, "()Z", false);
        mv.visit_jump_insn(IFEQ, allowed);
        // either bit set means the access is legal
        self.emit_detached_bit(mv, detach, DETACHED_STATE_LOADED_SLOT, allowed);
        self.emit_detached_bit(mv, detach, DETACHED_STATE_MODIFIED_SLOT, allowed);

        if detach_listener {
            mv.visit_method_insn(
                INVOKESTATIC,
                &detach.listener,
                DETACH_LISTENER_INSTANCE_METHOD,
                &detach.listener_descriptor,
                false,
            );
            load_this(mv);
            mv.visit_ldc_insn(&LdcValue::String(self.field_name.clone()));
            mv.visit_method_insn(
                INVOKEVIRTUAL,
                &detach.listener,
                DETACH_LISTENER_ACCESS_METHOD,
                DETACH_LISTENER_ACCESS_DESCRIPTOR,
                false,
            );
        } else {
            mv.visit_type_insn(NEW, &detach.exception);
            mv.visit_insn(DUP);
            mv.visit_ldc_insn(&LdcValue::String(detach.message.clone()));
            mv.visit_method_insn(
                INVOKESPECIAL,
                &detach.exception,
                CONSTRUCTOR_NAME,
                MESSAGE_CONSTRUCTOR_DESCRIPTOR,
                false,
            );
            mv.visit_insn(ATHROW);
        }

        mv.visit_label(allowed);
        if include_frames {
            mv.visit_frame(&Frame::Same);
        }
    }
}

/// Emit the replacement body of `field`'s getter into `mv`
pub fn generate_get_method(
    mv: &mut dyn MethodVisitor,
    field: &FieldMeta,
    ctx: &EnhanceContext,
    detach_listener: bool,
    include_frames: bool,
) -> Result<()> {
    let body = GetterBody::prepare(field, &ctx.class, ctx.namer(), ctx.messages())?;
    body.emit(mv, detach_listener, include_frames);
    Ok(())
}
