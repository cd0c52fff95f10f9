//! shapecheck-kernel: validation of JSON values against declarations.
//!
//! This crate provides:
//!
//! - **Adapter**: Wraps a value in a typed unit and maps compiler results
//!   back to value paths
//! - **Extensions**: `@tag` annotation checks (`@pattern`, `@unique`,
//!   `@uuid`, and caller-registered ones)
//! - **Validator**: Walks the declared type and dispatches extensions per
//!   field occurrence
//! - **Session**: Structural phase, then the extension phase
//! - **Pipeline**: Many sessions multiplexed onto one worker thread

pub mod adapter;
pub mod config;
pub mod error;
pub mod extensions;
pub mod pipeline;
pub mod session;
pub mod validator;
pub mod value_path;

pub use adapter::{SchemaAdapter, TypeSelector};
pub use config::{ValidatorOptions, CONFIG_FILE};
pub use error::{PipelineError, ValidateError, ValidatorError, ValidatorResult};
pub use extensions::{Extension, ExtensionContext, ExtensionError, ExtensionRegistry};
pub use pipeline::{Pipeline, PipelineValidator};
pub use session::ValidatorSession;
pub use value_path::{Diagnostic, PathSegment, ValuePath};
