//! Utilities to build and inspect method descriptors

use crate::meta::types::{parse_descriptor_prefix, JavaType};

pub fn method_descriptor(params: &[JavaType], ret: Option<&JavaType>) -> String {
    let mut d = String::new();
    d.push('(');
    for p in params {
        d.push_str(&p.descriptor());
    }
    d.push(')');
    match ret {
        Some(r) => d.push_str(&r.descriptor()),
        None => d.push('V'),
    }
    d
}

/// Split a method descriptor into parameter types and return type
pub fn parse_method_descriptor(descriptor: &str) -> Option<(Vec<JavaType>, JavaType)> {
    let mut rest = descriptor.strip_prefix('(')?;
    let mut params = Vec::new();
    while !rest.starts_with(')') {
        let (ty, tail) = parse_descriptor_prefix(rest)?;
        if ty == JavaType::Void {
            return None;
        }
        params.push(ty);
        rest = tail;
    }
    let (ret, tail) = parse_descriptor_prefix(&rest[1..])?;
    if !tail.is_empty() {
        return None;
    }
    Some((params, ret))
}

/// Stack slots taken by the arguments (receiver excluded)
pub fn argument_slots(descriptor: &str) -> Option<u16> {
    parse_method_descriptor(descriptor).map(|(params, _)| params.iter().map(JavaType::size).sum())
}
