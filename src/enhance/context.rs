//! Per-class state shared by every getter rewrite

use std::fmt;
use std::sync::Arc;

use super::namer::{EnhancementNamer, JdoNamer};
use crate::common::{Config, Localiser, MessageSource};
use crate::meta::ClassMeta;

/// Everything the rewrite of one class needs besides the field itself.
///
/// The namer and message source are shared and immutable, so contexts for
/// different classes may be used from different threads.
#[derive(Clone)]
pub struct EnhanceContext {
    pub class: ClassMeta,
    pub config: Config,
    namer: Arc<dyn EnhancementNamer + Send + Sync>,
    messages: Arc<dyn MessageSource + Send + Sync>,
}

impl EnhanceContext {
    /// JDO naming, English messages and default configuration
    pub fn new(class: ClassMeta) -> Self {
        Self {
            class,
            config: Config::default(),
            namer: Arc::new(JdoNamer),
            messages: Arc::new(Localiser),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_namer(mut self, namer: Arc<dyn EnhancementNamer + Send + Sync>) -> Self {
        self.namer = namer;
        self
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageSource + Send + Sync>) -> Self {
        self.messages = messages;
        self
    }

    pub fn namer(&self) -> &dyn EnhancementNamer {
        self.namer.as_ref()
    }

    pub fn messages(&self) -> &dyn MessageSource {
        self.messages.as_ref()
    }

    pub fn detach_listener(&self) -> bool {
        self.config.detach_listener
    }

    pub fn include_frames(&self) -> bool {
        self.config.use_stack_map_frames()
    }
}

impl fmt::Debug for EnhanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhanceContext")
            .field("class", &self.class)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
