//! Java type model for persistent fields

use std::fmt;

use crate::codegen::opcodes;
use crate::common::consts::{OBJECT_DESCRIPTOR, STRING_INTERNAL_NAME};
use crate::common::error::{Error, Result};

/// Declared type of a field (or accessor return value)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Class or interface, by internal name (`java/lang/String`)
    Reference(String),
    Array(Box<JavaType>),
}

impl JavaType {
    /// Parse a source-level type name such as `int`, `java.lang.String` or `long[][]`
    pub fn from_type_name(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        let mut base = trimmed;
        let mut dims = 0usize;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dims += 1;
        }
        let element = match base {
            "boolean" => JavaType::Boolean,
            "byte" => JavaType::Byte,
            "char" => JavaType::Char,
            "short" => JavaType::Short,
            "int" => JavaType::Int,
            "long" => JavaType::Long,
            "float" => JavaType::Float,
            "double" => JavaType::Double,
            "void" if dims == 0 => JavaType::Void,
            "void" => return Err(Error::metadata_error(format!("array of void in '{}'", name))),
            _ => {
                if !is_qualified_name(base) {
                    return Err(Error::metadata_error(format!("invalid type name '{}'", name)));
                }
                JavaType::Reference(base.replace('.', "/"))
            }
        };
        Ok((0..dims).fold(element, |ty, _| JavaType::Array(Box::new(ty))))
    }

    pub fn descriptor(&self) -> String {
        match self {
            JavaType::Boolean => "Z".to_string(),
            JavaType::Byte => "B".to_string(),
            JavaType::Char => "C".to_string(),
            JavaType::Short => "S".to_string(),
            JavaType::Int => "I".to_string(),
            JavaType::Long => "J".to_string(),
            JavaType::Float => "F".to_string(),
            JavaType::Double => "D".to_string(),
            JavaType::Void => "V".to_string(),
            JavaType::Reference(name) => format!("L{};", name),
            JavaType::Array(element) => format!("[{}", element.descriptor()),
        }
    }

    /// Operand for CHECKCAST/NEW: internal name for classes, descriptor for arrays
    pub fn internal_name(&self) -> String {
        match self {
            JavaType::Reference(name) => name.clone(),
            other => other.descriptor(),
        }
    }

    /// Reject types no field can hold: `void`, arrays of `void` and malformed internal names
    pub fn validate(&self) -> Result<()> {
        match self {
            JavaType::Void => Err(Error::metadata_error("void is not a field type")),
            JavaType::Reference(name) if !is_internal_name(name) => {
                Err(Error::metadata_error(format!("invalid internal class name '{}'", name)))
            }
            JavaType::Array(element) => element.validate(),
            _ => Ok(()),
        }
    }

    /// Operand stack / local variable slots
    pub fn size(&self) -> u16 {
        match self {
            JavaType::Void => 0,
            JavaType::Long | JavaType::Double => 2,
            _ => 1,
        }
    }

    /// The typed return instruction for a value of this type
    pub fn return_opcode(&self) -> u8 {
        match self {
            JavaType::Boolean | JavaType::Byte | JavaType::Char | JavaType::Short | JavaType::Int => {
                opcodes::IRETURN
            }
            JavaType::Long => opcodes::LRETURN,
            JavaType::Float => opcodes::FRETURN,
            JavaType::Double => opcodes::DRETURN,
            JavaType::Void => opcodes::RETURN,
            JavaType::Reference(_) | JavaType::Array(_) => opcodes::ARETURN,
        }
    }

    /// Which typed state manager operation reads a field of this type
    pub fn managed_kind(&self) -> ManagedKind {
        match self {
            JavaType::Boolean => ManagedKind::Boolean,
            JavaType::Byte => ManagedKind::Byte,
            JavaType::Char => ManagedKind::Char,
            JavaType::Short => ManagedKind::Short,
            JavaType::Int => ManagedKind::Int,
            JavaType::Long => ManagedKind::Long,
            JavaType::Float => ManagedKind::Float,
            JavaType::Double => ManagedKind::Double,
            JavaType::Reference(name) if name == STRING_INTERNAL_NAME => ManagedKind::String,
            _ => ManagedKind::Object,
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Boolean => write!(f, "boolean"),
            JavaType::Byte => write!(f, "byte"),
            JavaType::Char => write!(f, "char"),
            JavaType::Short => write!(f, "short"),
            JavaType::Int => write!(f, "int"),
            JavaType::Long => write!(f, "long"),
            JavaType::Float => write!(f, "float"),
            JavaType::Double => write!(f, "double"),
            JavaType::Void => write!(f, "void"),
            JavaType::Reference(name) => write!(f, "{}", name.replace('/', ".")),
            JavaType::Array(element) => write!(f, "{}[]", element),
        }
    }
}

/// Category selecting the state manager's typed `get<Kind>Field` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedKind {
    Boolean,
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    String,
    Object,
}

impl ManagedKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ManagedKind::Boolean => "Boolean",
            ManagedKind::Byte => "Byte",
            ManagedKind::Char => "Char",
            ManagedKind::Double => "Double",
            ManagedKind::Float => "Float",
            ManagedKind::Int => "Int",
            ManagedKind::Long => "Long",
            ManagedKind::Short => "Short",
            ManagedKind::String => "String",
            ManagedKind::Object => "Object",
        }
    }

    /// `getIntField`, `getObjectField`, ...
    pub fn get_field_method(&self) -> String {
        format!("get{}Field", self.type_name())
    }

    /// Object-typed reads travel as `java.lang.Object` and must be cast back
    pub fn needs_cast(&self) -> bool {
        matches!(self, ManagedKind::Object)
    }

    /// Descriptor of the value argument and return type of the typed operation
    pub fn value_descriptor(&self, field_type: &JavaType) -> String {
        if self.needs_cast() {
            OBJECT_DESCRIPTOR.to_string()
        } else {
            field_type.descriptor()
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

/// Dotted or slashed class name, as written in source or metadata
fn is_qualified_name(name: &str) -> bool {
    !name.is_empty() && name.split(|c| c == '.' || c == '/').all(is_identifier)
}

/// `java/lang/String` form only
fn is_internal_name(name: &str) -> bool {
    !name.is_empty() && name.split('/').all(is_identifier)
}

/// Parse one field type off the front of a descriptor, returning the remainder
pub(crate) fn parse_descriptor_prefix(descriptor: &str) -> Option<(JavaType, &str)> {
    let mut chars = descriptor.chars();
    let ty = match chars.next()? {
        'Z' => JavaType::Boolean,
        'B' => JavaType::Byte,
        'C' => JavaType::Char,
        'S' => JavaType::Short,
        'I' => JavaType::Int,
        'J' => JavaType::Long,
        'F' => JavaType::Float,
        'D' => JavaType::Double,
        'V' => JavaType::Void,
        'L' => {
            let body = &descriptor[1..];
            let end = body.find(';')?;
            if end == 0 {
                return None;
            }
            return Some((JavaType::Reference(body[..end].to_string()), &body[end + 1..]));
        }
        '[' => {
            let (element, rest) = parse_descriptor_prefix(&descriptor[1..])?;
            if element == JavaType::Void {
                return None;
            }
            return Some((JavaType::Array(Box::new(element)), rest));
        }
        _ => return None,
    };
    Some((ty, chars.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(JavaType::from_type_name("int").unwrap(), JavaType::Int);
        assert_eq!(
            JavaType::from_type_name("java.lang.String").unwrap(),
            JavaType::Reference("java/lang/String".into())
        );
        let arr = JavaType::from_type_name("long[][]").unwrap();
        assert_eq!(arr.descriptor(), "[[J");
        assert_eq!(arr.to_string(), "long[][]");
        assert!(JavaType::from_type_name("").is_err());
        assert!(JavaType::from_type_name("java..lang").is_err());
        assert!(JavaType::from_type_name("void[]").is_err());
        assert!(JavaType::from_type_name("9lives").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(JavaType::Int.validate().is_ok());
        assert!(JavaType::Reference("java/util/Date".into()).validate().is_ok());
        assert!(JavaType::Array(Box::new(JavaType::Reference("a/B".into()))).validate().is_ok());

        assert!(JavaType::Void.validate().is_err());
        assert!(JavaType::Reference(String::new()).validate().is_err());
        assert!(JavaType::Reference("java.lang.String".into()).validate().is_err());
        assert!(JavaType::Reference("java//String".into()).validate().is_err());
        assert!(JavaType::Reference("[I".into()).validate().is_err());
        assert!(JavaType::Array(Box::new(JavaType::Void)).validate().is_err());
        let nested = JavaType::Array(Box::new(JavaType::Array(Box::new(JavaType::Reference("".into())))));
        assert!(matches!(nested.validate(), Err(Error::Metadata { .. })));
    }

    #[test]
    fn test_managed_kinds() {
        assert_eq!(JavaType::Int.managed_kind().get_field_method(), "getIntField");
        let string = JavaType::from_type_name("java.lang.String").unwrap();
        assert_eq!(string.managed_kind(), ManagedKind::String);
        assert!(!string.managed_kind().needs_cast());
        let date = JavaType::from_type_name("java.util.Date").unwrap();
        assert_eq!(date.managed_kind().get_field_method(), "getObjectField");
        assert_eq!(date.managed_kind().value_descriptor(&date), "Ljava/lang/Object;");
        let ints = JavaType::from_type_name("int[]").unwrap();
        assert_eq!(ints.managed_kind(), ManagedKind::Object);
    }

    #[test]
    fn test_sizes_and_returns() {
        assert_eq!(JavaType::Long.size(), 2);
        assert_eq!(JavaType::Boolean.return_opcode(), opcodes::IRETURN);
        assert_eq!(JavaType::Double.return_opcode(), opcodes::DRETURN);
        assert_eq!(JavaType::Reference("a/B".into()).return_opcode(), opcodes::ARETURN);
    }
}
