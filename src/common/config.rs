//! Enhancer configuration

use super::error::{Error, Result};

/// Settings shared by every getter rewritten for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Emit debug-level detail while rewriting
    pub debug: bool,
    /// Emit StackMapTable frames at control-flow merge points
    pub emit_frames: bool,
    /// Class file target (major Java release, e.g. 8)
    pub target_java_version: u8,
    /// Notify the detach listener instead of throwing on detached access
    pub detach_listener: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            emit_frames: true,
            target_java_version: 8,
            detach_listener: false,
        }
    }
}

impl Config {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_emit_frames(mut self, emit: bool) -> Self {
        self.emit_frames = emit;
        self
    }

    pub fn with_target_java_version(mut self, version: u8) -> Self {
        self.target_java_version = version;
        self
    }

    pub fn with_detach_listener(mut self, enabled: bool) -> Self {
        self.detach_listener = enabled;
        self
    }

    /// Frames are only meaningful for class files the split verifier checks (Java 7+)
    pub fn use_stack_map_frames(&self) -> bool {
        self.emit_frames && self.target_java_version >= 7
    }

    /// Overlay settings from `TOLC_DEBUG`, `TOLC_EMIT_FRAMES`, `TOLC_DETACH_LISTENER` and `TOLC_TARGET`
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("TOLC_DEBUG") {
            self.debug = parse_flag("TOLC_DEBUG", &value)?;
        }
        if let Some(value) = lookup("TOLC_EMIT_FRAMES") {
            self.emit_frames = parse_flag("TOLC_EMIT_FRAMES", &value)?;
        }
        if let Some(value) = lookup("TOLC_DETACH_LISTENER") {
            self.detach_listener = parse_flag("TOLC_DETACH_LISTENER", &value)?;
        }
        if let Some(value) = lookup("TOLC_TARGET") {
            let trimmed = value.trim();
            let release = trimmed.strip_prefix("1.").unwrap_or(trimmed);
            self.target_java_version = release
                .parse()
                .map_err(|_| Error::config_error(format!("TOLC_TARGET: invalid Java release '{}'", value)))?;
        }
        Ok(self)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config_error(format!("{}: expected a boolean, got '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::default()
            .with_debug(true)
            .with_emit_frames(false)
            .with_detach_listener(true)
            .with_target_java_version(6);
        assert!(config.debug);
        assert!(!config.emit_frames);
        assert!(config.detach_listener);
        assert_eq!(config.target_java_version, 6);
    }

    #[test]
    fn test_frames_require_java7() {
        assert!(Config::default().use_stack_map_frames());
        assert!(!Config::default().with_target_java_version(6).use_stack_map_frames());
        assert!(!Config::default().with_emit_frames(false).use_stack_map_frames());
    }

    #[test]
    fn test_overlay_from_environment() {
        let config = Config::default()
            .overlay(lookup(&[("TOLC_EMIT_FRAMES", "off"), ("TOLC_DETACH_LISTENER", "true"), ("TOLC_TARGET", "1.6")]))
            .unwrap();
        assert!(!config.emit_frames);
        assert!(config.detach_listener);
        assert_eq!(config.target_java_version, 6);
        assert!(!config.debug);

        let config = Config::default().overlay(lookup(&[("TOLC_DEBUG", "1")])).unwrap();
        assert!(config.debug);
    }

    #[test]
    fn test_overlay_rejects_garbage() {
        let err = Config::default().overlay(lookup(&[("TOLC_EMIT_FRAMES", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        let err = Config::default().overlay(lookup(&[("TOLC_TARGET", "eight")])).unwrap_err();
        assert!(err.to_string().contains("TOLC_TARGET"));
    }
}
