//! Owning class metadata

use super::field::FieldMeta;
use crate::common::error::{Error, Result};

/// The persistence-capable class that declares the accessor being rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMeta {
    /// Internal name, e.g. `com/acme/Person`
    pub internal_name: String,
    /// Nearest persistence-capable ancestor, if any
    pub persistable_superclass: Option<String>,
    /// Number of managed fields inherited from persistable ancestors.
    /// Resolved by the caller before any field of this class is rewritten.
    pub inherited_field_count: u16,
    /// Instances may be detached from their state manager
    pub detachable: bool,
}

impl ClassMeta {
    /// Accepts dotted (`com.acme.Person`) or internal (`com/acme/Person`) names
    pub fn new(name: &str) -> Self {
        Self {
            internal_name: name.trim().replace('.', "/"),
            persistable_superclass: None,
            inherited_field_count: 0,
            detachable: false,
        }
    }

    pub fn with_persistable_superclass(mut self, superclass: &str, inherited_field_count: u16) -> Self {
        self.persistable_superclass = Some(superclass.trim().replace('.', "/"));
        self.inherited_field_count = inherited_field_count;
        self
    }

    pub fn with_detachable(mut self, detachable: bool) -> Self {
        self.detachable = detachable;
        self
    }

    pub fn has_persistable_superclass(&self) -> bool {
        self.persistable_superclass.is_some()
    }

    /// Count of fields inherited from persistable ancestors; zero for a root class
    pub fn field_index_base(&self) -> i32 {
        if self.has_persistable_superclass() {
            self.inherited_field_count as i32
        } else {
            0
        }
    }

    /// Absolute index the state manager uses to address `field`
    pub fn runtime_field_index(&self, field: &FieldMeta) -> i32 {
        field.field_id + self.field_index_base()
    }

    pub fn descriptor(&self) -> String {
        format!("L{};", self.internal_name)
    }

    pub fn validate(&self) -> Result<()> {
        let valid = |name: &str| !name.is_empty() && name.split('/').all(|part| !part.is_empty());
        if !valid(&self.internal_name) {
            return Err(Error::metadata_error(format!("invalid class name '{}'", self.internal_name)));
        }
        match &self.persistable_superclass {
            Some(superclass) if !valid(superclass) => Err(Error::metadata_error(format!(
                "invalid persistable superclass '{}' for {}",
                superclass, self.internal_name
            ))),
            _ => Ok(()),
        }
    }
}
