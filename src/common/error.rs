use thiserror::Error;

use crate::codegen::error::AssembleError;
use crate::verify::VerifyError;

/// Result type for enhancer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the getter enhancer
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid metadata: {message}")]
    Metadata { message: String },

    #[error("Unsupported read strategy: {value}")]
    UnsupportedStrategy { value: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Code generation error: {0}")]
    CodeGen(#[from] AssembleError),

    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),
}

impl Error {
    /// Create a metadata error
    pub fn metadata_error(message: impl Into<String>) -> Self {
        Self::Metadata { message: message.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an unsupported strategy error
    pub fn unsupported_strategy(value: impl Into<String>) -> Self {
        Self::UnsupportedStrategy { value: value.into() }
    }
}
