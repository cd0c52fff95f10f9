//! Built-in extensions.
//!
//! Non-string values are skipped by `@pattern` and `@uuid`; the structural
//! phase has already enforced string types where they are declared.

mod pattern;
mod unique;
mod uuid;

pub use self::pattern::Pattern;
pub use self::unique::Unique;
pub use self::uuid::Uuid;

use super::ExtensionRegistry;

/// Register all built-in extensions with the registry.
pub fn register_builtins(registry: &mut ExtensionRegistry) {
    registry.register(Pattern);
    registry.register(Uuid);
    registry.register(Unique);
}
