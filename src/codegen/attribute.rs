//! Code attribute and the tables nested in it

use super::constpool::ConstantPool;
use super::error::AssembleResult;
use super::frame::StackMapTable;

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    /// Build an attribute, registering its name in the pool
    pub fn named(constant_pool: &mut ConstantPool, name: &str, info: Vec<u8>) -> AssembleResult<Self> {
        Ok(Self::new(constant_pool.add_utf8(name)?, info))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.info);
        bytes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub line_numbers: Vec<LineNumberEntry>,
    pub local_variables: Vec<LocalVariableEntry>,
    pub stack_map_table: StackMapTable,
    /// Nested attributes in serialised form, in class file order
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            line_numbers: Vec::new(),
            local_variables: Vec::new(),
            stack_map_table: StackMapTable::new(),
            attributes: Vec::new(),
        }
    }

    /// Serialise the nested tables into `attributes`
    pub fn seal(&mut self, constant_pool: &mut ConstantPool) -> AssembleResult<()> {
        self.attributes.clear();
        if !self.line_numbers.is_empty() {
            let mut info = (self.line_numbers.len() as u16).to_be_bytes().to_vec();
            for entry in &self.line_numbers {
                info.extend_from_slice(&entry.to_bytes());
            }
            self.attributes.push(AttributeInfo::named(constant_pool, "LineNumberTable", info)?);
        }
        if !self.local_variables.is_empty() {
            let mut info = (self.local_variables.len() as u16).to_be_bytes().to_vec();
            for entry in &self.local_variables {
                info.extend_from_slice(&entry.to_bytes());
            }
            self.attributes.push(AttributeInfo::named(constant_pool, "LocalVariableTable", info)?);
        }
        if !self.stack_map_table.is_empty() {
            let info = self.stack_map_table.to_bytes();
            self.attributes.push(AttributeInfo::named(constant_pool, "StackMapTable", info)?);
        }
        Ok(())
    }

    /// Body of the `Code` attribute (without its name and length header)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&(self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            bytes.extend_from_slice(&attribute.to_bytes());
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero catches everything
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.end_pc.to_be_bytes());
        bytes.extend_from_slice(&self.handler_pc.to_be_bytes());
        bytes.extend_from_slice(&self.catch_type.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl LineNumberEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.line_number.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

impl LocalVariableEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.length.to_be_bytes());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&self.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes
    }
}
