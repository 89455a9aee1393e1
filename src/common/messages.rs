//! Localized message lookup
//!
//! Generated code embeds human-readable messages (the detached-access error) and
//! the enhancer logs what it adds. Both go through an injected [`MessageSource`]
//! so callers can swap the catalog without touching global state.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::consts::{MSG_ADD_METHOD, MSG_DETACHED_PROPERTY_ACCESS};

/// Resolves a message key plus positional arguments into display text
pub trait MessageSource {
    fn message(&self, key: &str, args: &[&str]) -> String;
}

static ENGLISH: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut catalog = HashMap::new();
    catalog.insert(MSG_ADD_METHOD, "Adding method \"{0}\"");
    catalog.insert(
        MSG_DETACHED_PROPERTY_ACCESS,
        "You have just attempted to access property \"{0}\" yet this field was not detached when you \
         detached the object. Either dont access this property, or detach it when detaching the object.",
    );
    catalog
});

/// Built-in English catalog
#[derive(Debug, Default, Clone, Copy)]
pub struct Localiser;

impl Localiser {
    pub fn new() -> Self {
        Self
    }
}

impl MessageSource for Localiser {
    fn message(&self, key: &str, args: &[&str]) -> String {
        match ENGLISH.get(key) {
            Some(template) => substitute(template, args),
            None if args.is_empty() => key.to_string(),
            None => format!("{} {}", key, args.join(" ")),
        }
    }
}

/// Replace `{n}` placeholders with the matching argument; unknown indices stay verbatim
pub fn substitute(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            args.get(index).map(|arg| (*arg, close))
        });
        match replaced {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
