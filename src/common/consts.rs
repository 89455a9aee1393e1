// Well-known runtime names referenced by generated getter code

pub const OBJECT_DESCRIPTOR: &str = "Ljava/lang/Object;";
pub const STRING_INTERNAL_NAME: &str = "java/lang/String";
pub const BITSET_INTERNAL_NAME: &str = "java/util/BitSet";

// Detached state is an Object[] of {object id, version, loaded fields, modified fields}
pub const DETACHED_STATE_DESCRIPTOR: &str = "[Ljava/lang/Object;";
pub const DETACHED_STATE_LOADED_SLOT: u8 = 2;
pub const DETACHED_STATE_MODIFIED_SLOT: u8 = 3;

// State manager queries
pub const IS_LOADED_METHOD: &str = "isLoaded";
pub const BITSET_GET_METHOD: &str = "get";
pub const BITSET_GET_DESCRIPTOR: &str = "(I)Z";

// Detach listener protocol
pub const DETACH_LISTENER_INSTANCE_METHOD: &str = "getInstance";
pub const DETACH_LISTENER_ACCESS_METHOD: &str = "undetachedFieldAccess";
pub const DETACH_LISTENER_ACCESS_DESCRIPTOR: &str = "(Ljava/lang/Object;Ljava/lang/String;)V";

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const MESSAGE_CONSTRUCTOR_DESCRIPTOR: &str = "(Ljava/lang/String;)V";

// JDO persistence flag bits carried by field metadata
pub const CHECK_READ: u8 = 1;
pub const MEDIATE_READ: u8 = 2;

// Message catalog keys
pub const MSG_ADD_METHOD: &str = "Enhancer.AddMethod";
pub const MSG_DETACHED_PROPERTY_ACCESS: &str = "Enhancer.DetachedPropertyAccess";
