//! Persistent field metadata

use std::fmt;
use std::str::FromStr;

use super::types::JavaType;
use crate::codegen::flag::access_flags;
use crate::common::consts::{CHECK_READ, MEDIATE_READ};
use crate::common::error::{Error, Result};

/// How a generated getter intercepts reads of its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStrategy {
    /// Return the stored value, no state manager involvement
    Normal,
    /// Consult the state manager only when the flags byte says one is active
    CheckFlag,
    /// Always consult an attached state manager first
    MediateViaManager,
}

impl ReadStrategy {
    /// Derive the strategy from JDO persistence flags; mediation wins over checking
    pub fn from_persistence_flags(flags: u8) -> Self {
        if flags & MEDIATE_READ == MEDIATE_READ {
            ReadStrategy::MediateViaManager
        } else if flags & CHECK_READ == CHECK_READ {
            ReadStrategy::CheckFlag
        } else {
            ReadStrategy::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStrategy::Normal => "normal",
            ReadStrategy::CheckFlag => "check",
            ReadStrategy::MediateViaManager => "mediate",
        }
    }
}

impl FromStr for ReadStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "normal" | "normalread" => Ok(ReadStrategy::Normal),
            "check" | "checkflag" | "checkread" => Ok(ReadStrategy::CheckFlag),
            "mediate" | "mediateviamanager" | "mediateread" => Ok(ReadStrategy::MediateViaManager),
            _ => Err(Error::unsupported_strategy(s)),
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared visibility of a persistent property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    Public,
    Protected,
    Private,
    #[default]
    Package,
}

impl Visibility {
    pub fn access_flags(&self) -> u16 {
        match self {
            Visibility::Public => access_flags::ACC_PUBLIC,
            Visibility::Protected => access_flags::ACC_PROTECTED,
            Visibility::Private => access_flags::ACC_PRIVATE,
            Visibility::Package => 0,
        }
    }
}

/// Metadata for one persistent property of a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    /// Position among the fields declared by the owning class
    pub field_id: i32,
    pub java_type: JavaType,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub read_strategy: ReadStrategy,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, field_id: i32, java_type: JavaType) -> Self {
        Self {
            name: name.into(),
            field_id,
            java_type,
            visibility: Visibility::default(),
            is_abstract: false,
            read_strategy: ReadStrategy::Normal,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_read_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.read_strategy = strategy;
        self
    }

    /// Access bits for the relocated getter: visibility plus abstractness
    pub fn access_flags(&self) -> u16 {
        let mut flags = self.visibility.access_flags();
        if self.is_abstract {
            flags |= access_flags::ACC_ABSTRACT;
        }
        flags
    }

    /// Descriptor of a no-argument accessor returning this field
    pub fn getter_descriptor(&self) -> String {
        format!("(){}", self.java_type.descriptor())
    }

    /// Reject metadata no getter can be generated for
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.name) {
            return Err(Error::metadata_error(format!("invalid property name '{}'", self.name)));
        }
        if self.field_id < 0 {
            return Err(Error::metadata_error(format!(
                "property '{}' has negative field id {}",
                self.name, self.field_id
            )));
        }
        if self.java_type == JavaType::Void {
            return Err(Error::metadata_error(format!("property '{}' is declared void", self.name)));
        }
        self.java_type.validate()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_flags() {
        assert_eq!(ReadStrategy::from_persistence_flags(0), ReadStrategy::Normal);
        assert_eq!(ReadStrategy::from_persistence_flags(CHECK_READ), ReadStrategy::CheckFlag);
        assert_eq!(
            ReadStrategy::from_persistence_flags(CHECK_READ | MEDIATE_READ),
            ReadStrategy::MediateViaManager
        );
        // write flags do not influence reads
        assert_eq!(ReadStrategy::from_persistence_flags(4 | 8), ReadStrategy::Normal);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("mediate".parse::<ReadStrategy>().unwrap(), ReadStrategy::MediateViaManager);
        assert_eq!("CHECK_READ".parse::<ReadStrategy>().unwrap(), ReadStrategy::CheckFlag);
        assert_eq!("Normal".parse::<ReadStrategy>().unwrap(), ReadStrategy::Normal);
        let err = "lazy".parse::<ReadStrategy>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedStrategy { ref value } if value == "lazy"));
    }

    #[test]
    fn test_access_flags() {
        let field = FieldMeta::new("name", 0, JavaType::Int)
            .with_visibility(Visibility::Protected)
            .with_abstract(true);
        assert_eq!(field.access_flags(), access_flags::ACC_PROTECTED | access_flags::ACC_ABSTRACT);
        assert_eq!(field.getter_descriptor(), "()I");
    }

    #[test]
    fn test_validate() {
        assert!(FieldMeta::new("age", 3, JavaType::Int).validate().is_ok());
        assert!(FieldMeta::new("", 0, JavaType::Int).validate().is_err());
        assert!(FieldMeta::new("a-b", 0, JavaType::Int).validate().is_err());
        assert!(FieldMeta::new("age", -1, JavaType::Int).validate().is_err());
        assert!(FieldMeta::new("age", 0, JavaType::Void).validate().is_err());
        let dotted = JavaType::Reference("java.lang.String".into());
        assert!(FieldMeta::new("name", 0, dotted).validate().is_err());
    }
}
