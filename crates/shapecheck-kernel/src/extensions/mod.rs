//! Annotation-driven extensions.
//!
//! A schema field annotated with `@tag text` in its doc comment is checked
//! by the extension registered under `tag`, once per occurrence of the
//! field in the value. Tags without a registered extension are ignored.

pub mod builtin;
mod context;
mod registry;
mod traits;

pub use context::ExtensionContext;
pub use registry::ExtensionRegistry;
pub use traits::{Extension, ExtensionError, FnExtension};
