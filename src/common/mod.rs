//! Common utilities and definitions shared across modules
//!
//! Configuration, error definitions, runtime name constants and the
//! localized message catalog used throughout the enhancer.

pub mod config;
pub mod consts;
pub mod error;
pub mod messages;

pub use config::Config;
pub use error::{Error, Result};
pub use messages::{Localiser, MessageSource};
