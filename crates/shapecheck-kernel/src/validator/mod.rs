//! Cross-resolution validation: the extension phase.
//!
//! Runs after the structural phase found nothing. It walks the declared
//! type and, for every field carrying a registered annotation:
//!
//! - **Locates occurrences**: asks the schema service which value
//!   properties the field's declaration types
//! - **Dispatches**: calls the tag's extension once per occurrence and
//!   annotation, occurrence-major
//! - **Reports**: builds the diagnostic path from the occurrence's node
//!
//! # Example
//!
//! ```ignore
//! use shapecheck_kernel::validator::Validator;
//!
//! adapter.check_structural(&selector, &value)?;
//! let diagnostics = Validator::new(&adapter, &registry).validate()?;
//! ```

mod cycle_guard;
mod type_scope;
mod walker;

pub use cycle_guard::CycleGuard;
pub use type_scope::TypeScope;
pub use walker::Validator;
