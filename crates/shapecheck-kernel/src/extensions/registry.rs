//! Registry mapping annotation tags to extensions.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{builtin, Extension, ExtensionContext, ExtensionError, FnExtension};

/// Registry of extensions by tag name. Registering a name again replaces
/// the earlier entry, which is how caller-supplied extensions override
/// built-ins.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in extensions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, extension: impl Extension + 'static) {
        let name = extension.name().to_string();
        self.extensions.insert(name, Arc::new(extension));
    }

    pub fn register_arc(&mut self, extension: Arc<dyn Extension>) {
        let name = extension.name().to_string();
        self.extensions.insert(name, extension);
    }

    /// Register a closure under `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&Value, Option<&str>, &mut ExtensionContext, &str) -> Result<Option<String>, ExtensionError>
            + Send
            + Sync
            + 'static,
    {
        self.register(FnExtension::new(name, check));
    }

    /// Add every entry of `other`, replacing entries of the same name.
    pub fn extend(&mut self, other: &ExtensionRegistry) {
        for (name, extension) in &other.extensions {
            self.extensions.insert(name.clone(), Arc::clone(extension));
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Tag names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.extensions.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = ExtensionRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["pattern", "unique", "uuid"]);
        assert!(!registry.contains("custom"));
    }

    #[test]
    fn test_caller_entries_override_builtins() {
        let mut custom = ExtensionRegistry::new();
        custom.register_fn("pattern", |_, _, _, _| Ok(Some("overridden".to_string())));

        let mut registry = ExtensionRegistry::with_builtins();
        registry.extend(&custom);
        assert_eq!(registry.len(), 3);

        let pattern = registry.get("pattern").unwrap_or_else(|| panic!("pattern missing"));
        let mut ctx = ExtensionContext::new();
        let result = pattern.check(&json!("x"), Some("x"), &mut ctx, "t:0");
        assert_eq!(result.ok().flatten(), Some("overridden".to_string()));
    }

    #[test]
    fn test_debug_lists_names() {
        let mut registry = ExtensionRegistry::new();
        registry.register_fn("zeta", |_, _, _, _| Ok(None));
        registry.register_fn("alpha", |_, _, _, _| Ok(None));
        assert_eq!(
            format!("{registry:?}"),
            r#"ExtensionRegistry { extensions: ["alpha", "zeta"] }"#
        );
    }
}
