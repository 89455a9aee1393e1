//! Names of the synthetic members an enhanced class relies on

use crate::meta::FieldMeta;

/// Naming policy for enhancer-generated members and runtime types.
///
/// Type names are JVM internal names (`javax/jdo/spi/StateManager`).
pub trait EnhancementNamer {
    /// Prefix of the method that keeps the original accessor body
    fn get_method_prefix(&self) -> &str;

    fn prefixed_getter_name(&self, field: &FieldMeta) -> String {
        format!("{}{}", self.get_method_prefix(), field.name)
    }

    fn state_manager_field_name(&self) -> &str;
    fn state_manager_internal_name(&self) -> &str;

    fn state_manager_descriptor(&self) -> String {
        format!("L{};", self.state_manager_internal_name())
    }

    /// Interface every enhanced class implements; first argument of the state manager calls
    fn persistable_internal_name(&self) -> &str;

    fn flags_field_name(&self) -> &str;
    fn detached_state_field_name(&self) -> &str;
    fn is_detached_method_name(&self) -> &str;
    fn detach_listener_internal_name(&self) -> &str;
    fn detached_field_access_exception_internal_name(&self) -> &str;
    fn inherited_field_count_field_name(&self) -> &str;
}

/// JDO naming (`jdoGetname`, `jdoStateManager`, ...)
#[derive(Debug, Default, Clone, Copy)]
pub struct JdoNamer;

impl EnhancementNamer for JdoNamer {
    fn get_method_prefix(&self) -> &str {
        "jdoGet"
    }

    fn state_manager_field_name(&self) -> &str {
        "jdoStateManager"
    }

    fn state_manager_internal_name(&self) -> &str {
        "javax/jdo/spi/StateManager"
    }

    fn persistable_internal_name(&self) -> &str {
        "javax/jdo/spi/PersistenceCapable"
    }

    fn flags_field_name(&self) -> &str {
        "jdoFlags"
    }

    fn detached_state_field_name(&self) -> &str {
        "jdoDetachedState"
    }

    fn is_detached_method_name(&self) -> &str {
        "jdoIsDetached"
    }

    fn detach_listener_internal_name(&self) -> &str {
        "org/datanucleus/util/DetachListener"
    }

    fn detached_field_access_exception_internal_name(&self) -> &str {
        "javax/jdo/JDODetachedFieldAccessException"
    }

    fn inherited_field_count_field_name(&self) -> &str {
        "jdoInheritedFieldCount"
    }
}
