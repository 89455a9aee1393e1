//! Constant pool for Java class files
//!
//! Entries are deduplicated by their encoded form. Indices are 1-based and
//! `Long`/`Double` entries occupy two slots, as JVMS §4.4.5 requires.

use std::collections::HashMap;

use super::error::{AssembleError, AssembleResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
}

mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
}

impl Constant {
    pub fn to_bytes(&self) -> Vec<u8> {
        use constant_tags::*;
        let mut bytes = Vec::new();
        match self {
            Constant::Utf8(value) => {
                bytes.push(CONSTANT_UTF8);
                let encoded = modified_utf8(value);
                bytes.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                bytes.extend_from_slice(&encoded);
            }
            Constant::Integer(value) => {
                bytes.push(CONSTANT_INTEGER);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Float(value) => {
                bytes.push(CONSTANT_FLOAT);
                bytes.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            Constant::Long(value) => {
                bytes.push(CONSTANT_LONG);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Double(value) => {
                bytes.push(CONSTANT_DOUBLE);
                bytes.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            Constant::Class(name_index) => {
                bytes.push(CONSTANT_CLASS);
                bytes.extend_from_slice(&name_index.to_be_bytes());
            }
            Constant::String(string_index) => {
                bytes.push(CONSTANT_STRING);
                bytes.extend_from_slice(&string_index.to_be_bytes());
            }
            Constant::FieldRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_FIELDREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::MethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_METHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::InterfaceMethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_INTERFACEMETHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                bytes.push(CONSTANT_NAMEANDTYPE);
                bytes.extend_from_slice(&name_index.to_be_bytes());
                bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            }
        }
        bytes
    }

    fn slots(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Java's modified UTF-8: NUL as two bytes, supplementary characters as surrogate pairs
fn modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push((0xc0 | (unit >> 6)) as u8);
                out.push((0x80 | (unit & 0x3f)) as u8);
            }
            _ => {
                out.push((0xe0 | (unit >> 12)) as u8);
                out.push((0x80 | ((unit >> 6) & 0x3f)) as u8);
                out.push((0x80 | (unit & 0x3f)) as u8);
            }
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<(u16, Constant)>,
    index: HashMap<Vec<u8>, u16>,
    next: u16,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { constants: Vec::new(), index: HashMap::new(), next: 1 }
    }

    /// Number of slots used, i.e. the class file's `constant_pool_count`
    pub fn count(&self) -> u16 {
        self.next
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.constants
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, constant)| constant)
    }

    fn add(&mut self, constant: Constant) -> AssembleResult<u16> {
        let key = constant.to_bytes();
        if let Some(&existing) = self.index.get(&key) {
            return Ok(existing);
        }
        let index = self.next;
        let next = index
            .checked_add(constant.slots())
            .ok_or(AssembleError::ConstantPoolOverflow)?;
        self.next = next;
        self.index.insert(key, index);
        self.constants.push((index, constant));
        Ok(index)
    }

    pub fn add_utf8(&mut self, value: &str) -> AssembleResult<u16> {
        self.add(Constant::Utf8(value.to_string()))
    }

    pub fn add_class(&mut self, name: &str) -> AssembleResult<u16> {
        let name_index = self.add_utf8(name)?;
        self.add(Constant::Class(name_index))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> AssembleResult<u16> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.add(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> AssembleResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::FieldRef(class_index, name_and_type_index))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> AssembleResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::MethodRef(class_index, name_and_type_index))
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> AssembleResult<u16> {
        let class_index = self.add_class(class)?;
        let name_and_type_index = self.add_name_and_type(name, descriptor)?;
        self.add(Constant::InterfaceMethodRef(class_index, name_and_type_index))
    }

    pub fn add_string(&mut self, value: &str) -> AssembleResult<u16> {
        let utf8_index = self.add_utf8(value)?;
        self.add(Constant::String(utf8_index))
    }

    pub fn add_integer(&mut self, value: i32) -> AssembleResult<u16> {
        self.add(Constant::Integer(value))
    }

    pub fn add_float(&mut self, value: f32) -> AssembleResult<u16> {
        self.add(Constant::Float(value))
    }

    pub fn add_long(&mut self, value: i64) -> AssembleResult<u16> {
        self.add(Constant::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> AssembleResult<u16> {
        self.add(Constant::Double(value))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.count().to_be_bytes());
        for (_, constant) in &self.constants {
            bytes.extend_from_slice(&constant.to_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_one_based_and_deduplicated() {
        let mut cp = ConstantPool::new();
        let a = cp.add_utf8("jdoFlags").unwrap();
        let b = cp.add_utf8("jdoFlags").unwrap();
        assert_eq!(a, 1);
        assert_eq!(a, b);
        let field = cp.add_field_ref("a/P", "jdoFlags", "B").unwrap();
        let again = cp.add_field_ref("a/P", "jdoFlags", "B").unwrap();
        assert_eq!(field, again);
        assert!(matches!(cp.get(field), Some(Constant::FieldRef(_, _))));
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        let mut cp = ConstantPool::new();
        let long = cp.add_long(7).unwrap();
        let next = cp.add_integer(1).unwrap();
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert_eq!(cp.count(), 4);
    }

    #[test]
    fn test_modified_utf8() {
        assert_eq!(modified_utf8("a\0b"), vec![b'a', 0xc0, 0x80, b'b']);
        assert_eq!(modified_utf8("é"), vec![0xc3, 0xa9]);
        // supplementary plane: two 3-byte surrogates
        assert_eq!(modified_utf8("\u{1F600}").len(), 6);
    }
}
