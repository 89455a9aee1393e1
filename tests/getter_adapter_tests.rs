mod common;

use std::sync::{Arc, Mutex};

use common::init_logger;
use tolc_enhancer::codegen::flag::access_flags::{ACC_ABSTRACT, ACC_PUBLIC};
use tolc_enhancer::codegen::node::{ClassNode, Insn, MethodNode};
use tolc_enhancer::codegen::opcodes::*;
use tolc_enhancer::codegen::visitor::{Annotation, AnnotationValue, Frame, FrameValue, Label, LdcValue};
use tolc_enhancer::codegen::{CodeAssembler, ConstantPool, MethodVisitor};
use tolc_enhancer::common::MessageSource;
use tolc_enhancer::verify::{check_method, MethodVerifyError};
use tolc_enhancer::{
    rewrite_getter, ClassMeta, EnhanceContext, Error, FieldMeta, JavaType, PropertyGetterAdapter, ReadStrategy,
    Visibility,
};

fn age_field() -> FieldMeta {
    FieldMeta::new("age", 1, JavaType::Int)
        .with_visibility(Visibility::Public)
        .with_read_strategy(ReadStrategy::CheckFlag)
}

/// A getter with a bit of everything: switches, a handler, line numbers and locals
fn busy_getter() -> MethodNode {
    let (start, end, handler) = (Label::new(), Label::new(), Label::new());
    let (case0, case1, default) = (Label::new(), Label::new(), Label::new());

    let mut m = MethodNode::new(ACC_PUBLIC, "getAge", "()I");
    m.visit_annotation(&Annotation::new("Ljavax/jdo/annotations/Persistent;", true).with_value(
        "defaultFetchGroup",
        AnnotationValue::String("true".into()),
    ));
    m.visit_annotation_default(&AnnotationValue::Int(18));
    m.visit_parameter_annotation(0, &Annotation::new("Ljavax/annotation/Nonnull;", false));
    m.visit_code();
    m.visit_try_catch_block(start, end, handler, Some("java/lang/RuntimeException"));
    m.visit_label(start);
    m.visit_line_number(10, start);
    m.visit_var_insn(ALOAD, 0);
    m.visit_field_insn(GETFIELD, "com/acme/Person", "age", "I");
    m.visit_var_insn(ISTORE, 1);
    m.visit_var_insn(ILOAD, 1);
    m.visit_table_switch_insn(0, 1, default, &[case0, case1]);
    m.visit_label(case0);
    m.visit_frame(&Frame::Append(vec![FrameValue::Integer]));
    m.visit_insn(ICONST_0);
    m.visit_insn(IRETURN);
    m.visit_label(case1);
    m.visit_frame(&Frame::Same);
    m.visit_var_insn(ILOAD, 1);
    m.visit_lookup_switch_insn(default, &[7], &[case0]);
    m.visit_label(default);
    m.visit_frame(&Frame::Same);
    m.visit_iinc_insn(1, 1);
    m.visit_var_insn(ILOAD, 1);
    m.visit_insn(IRETURN);
    m.visit_label(end);
    m.visit_label(handler);
    m.visit_frame(&Frame::Full {
        locals: vec![FrameValue::Object("com/acme/Person".into())],
        stack: vec![FrameValue::Object("java/lang/RuntimeException".into())],
    });
    m.visit_insn(ATHROW);
    m.visit_local_variable("this", "Lcom/acme/Person;", None, start, end, 0);
    m.visit_local_variable("value", "I", None, case0, end, 1);
    m.visit_maxs(2, 2);
    m.visit_end();
    m
}

#[test]
fn test_relocated_body_is_unchanged() {
    init_logger();
    let original = busy_getter();
    assert_eq!(check_method(&original), Ok(()));
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person"));

    let rewritten = rewrite_getter(&original, &age_field(), &ctx).expect("rewrite getter");
    let relocated = &rewritten.relocated;

    assert_eq!(relocated.name, "jdoGetage");
    assert_eq!(relocated.descriptor, original.descriptor);
    assert_eq!(relocated.access, ACC_PUBLIC);
    assert_eq!(relocated.instructions, original.instructions);
    assert_eq!(relocated.try_catch_blocks, original.try_catch_blocks);
    assert_eq!(relocated.local_variables, original.local_variables);
    assert_eq!((relocated.max_stack, relocated.max_locals), (2, 2));
    assert!(relocated.ended);
    assert_eq!(check_method(relocated), Ok(()));
}

#[test]
fn test_annotations_stay_on_public_getter() {
    let original = busy_getter();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person"));
    let rewritten = rewrite_getter(&original, &age_field(), &ctx).unwrap();

    assert!(rewritten.relocated.annotations.is_empty());
    assert_eq!(rewritten.replacement.annotations, original.annotations);
}

#[test]
fn test_annotation_default_and_parameter_annotations_move_with_body() {
    let original = busy_getter();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person"));
    let rewritten = rewrite_getter(&original, &age_field(), &ctx).unwrap();

    assert_eq!(rewritten.relocated.annotation_default, Some(AnnotationValue::Int(18)));
    assert_eq!(rewritten.relocated.parameter_annotations, original.parameter_annotations);
    assert_eq!(rewritten.relocated.parameter_annotations.len(), 1);

    assert_eq!(rewritten.replacement.annotation_default, None);
    assert!(rewritten.replacement.parameter_annotations.is_empty());
}

#[test]
fn test_replacement_keeps_original_signature() {
    let original = busy_getter();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person").with_detachable(true));
    let rewritten = rewrite_getter(&original, &age_field(), &ctx).unwrap();
    let replacement = &rewritten.replacement;

    assert_eq!(replacement.name, "getAge");
    assert_eq!(replacement.descriptor, "()I");
    assert_eq!(replacement.access, ACC_PUBLIC);
    assert!(replacement.instructions.iter().any(|insn| matches!(
        insn,
        Insn::Method { opcode: INVOKEVIRTUAL, name, .. } if name == "jdoGetage"
    )));
    assert_eq!(check_method(replacement), Ok(()));
}

#[test]
fn test_abstract_property_gets_no_body() {
    let mut original = MethodNode::new(ACC_PUBLIC | ACC_ABSTRACT, "getAge", "()I");
    original.visit_end();
    let field = age_field().with_abstract(true);
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person").with_detachable(true));

    let rewritten = rewrite_getter(&original, &field, &ctx).unwrap();

    assert_eq!(rewritten.relocated.access, ACC_PUBLIC | ACC_ABSTRACT);
    assert!(!rewritten.relocated.has_code);
    assert!(rewritten.relocated.ended);
    assert_eq!(check_method(&rewritten.relocated), Ok(()));

    assert!(!rewritten.replacement.has_code);
    assert!(rewritten.replacement.instructions.is_empty());
    assert!(rewritten.replacement.ended);
}

#[test]
fn test_malformed_metadata_is_rejected() {
    let original = busy_getter();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person"));

    let wrong_type = FieldMeta::new("age", 1, JavaType::Long);
    assert!(matches!(rewrite_getter(&original, &wrong_type, &ctx), Err(Error::Metadata { .. })));

    let negative_id = FieldMeta::new("age", -1, JavaType::Int);
    assert!(matches!(rewrite_getter(&original, &negative_id, &ctx), Err(Error::Metadata { .. })));

    let bad_class = EnhanceContext::new(ClassMeta::new("com//Person"));
    assert!(matches!(rewrite_getter(&original, &age_field(), &bad_class), Err(Error::Metadata { .. })));

    let malformed = [
        JavaType::Reference(String::new()),
        JavaType::Reference("java.lang.String".into()),
        JavaType::Array(Box::new(JavaType::Void)),
        JavaType::Array(Box::new(JavaType::Reference("java//Date".into()))),
    ];
    for java_type in malformed {
        let field = FieldMeta::new("owner", 0, java_type.clone()).with_read_strategy(ReadStrategy::MediateViaManager);
        let mut getter = MethodNode::new(ACC_PUBLIC, "getOwner", &field.getter_descriptor());
        getter.visit_end();
        assert!(
            matches!(rewrite_getter(&getter, &field, &ctx), Err(Error::Metadata { .. })),
            "{:?} was accepted",
            java_type
        );
    }
}

#[test]
fn test_abstract_property_with_code_fails_verification() {
    let original = busy_getter();
    let field = age_field().with_abstract(true);
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person"));

    let result = rewrite_getter(&original, &field, &ctx);
    assert!(matches!(result, Err(Error::Verify(MethodVerifyError::ForbiddenCode))));
}

#[test]
fn test_adapter_streams_into_assembler() {
    init_logger();
    let original = busy_getter();
    let field = age_field();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person").with_detachable(true));
    let mut class = ClassNode::new("com/acme/Person");
    let mut constant_pool = ConstantPool::new();

    let target = CodeAssembler::new(&mut constant_pool).with_frames(true);
    let mut adapter =
        PropertyGetterAdapter::new(target, &ctx, "getAge", "()I", &field, &mut class).expect("open adapter");
    original.accept(&mut adapter);
    let (assembler, relocated) = adapter.into_inner();
    let code = assembler.finish().expect("assemble replacement");

    assert_eq!(relocated.borrow().instructions, original.instructions);
    assert_eq!(class.methods().len(), 1);
    assert_eq!(code.max_locals, 1);
    assert_eq!(code.local_variables.len(), 1);
    assert!(code.exception_table.is_empty());
    assert_eq!(code.stack_map_table.frames.len(), 2);
    assert_eq!(code.code.first(), Some(&0x2a)); // aload_0
    assert_eq!(code.code.last(), Some(&IRETURN));
}

/// Records every key it is asked to resolve
#[derive(Default)]
struct RecordingMessages(Mutex<Vec<String>>);

impl MessageSource for RecordingMessages {
    fn message(&self, key: &str, args: &[&str]) -> String {
        if let Ok(mut keys) = self.0.lock() {
            keys.push(key.to_string());
        }
        format!("{} {}", key, args.join(" "))
    }
}

#[test]
fn test_added_method_is_logged() {
    init_logger();
    let messages = Arc::new(RecordingMessages::default());
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person")).with_messages(messages.clone());
    rewrite_getter(&busy_getter(), &age_field(), &ctx).unwrap();

    if log::log_enabled!(log::Level::Debug) {
        let keys = messages.0.lock().unwrap();
        assert_eq!(keys.as_slice(), ["Enhancer.AddMethod"]);
    }
}

struct TerseMessages;

impl MessageSource for TerseMessages {
    fn message(&self, key: &str, args: &[&str]) -> String {
        format!("{}:{}", key, args.join(","))
    }
}

#[test]
fn test_detached_message_comes_from_message_source() {
    let original = busy_getter();
    let ctx = EnhanceContext::new(ClassMeta::new("com/acme/Person").with_detachable(true))
        .with_messages(Arc::new(TerseMessages));
    let rewritten = rewrite_getter(&original, &age_field(), &ctx).unwrap();

    assert!(rewritten
        .replacement
        .instructions
        .contains(&Insn::Ldc(LdcValue::String("Enhancer.DetachedPropertyAccess:age".into()))));
}
