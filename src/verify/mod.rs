//! Structural verifiers for generated methods
//!
//! These checks run over a recorded [`MethodNode`](crate::codegen::node::MethodNode)
//! before it is assembled, catching malformed control flow the JVM verifier
//! would reject later.

pub mod method;
pub mod method_access_flags;

pub use method::{check_method, MethodVerifyError};

/// Error reported by the verifiers
pub type VerifyError = MethodVerifyError;
