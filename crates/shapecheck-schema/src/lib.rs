//! shapecheck-schema: the schema compiler service.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes declaration sources using logos
//! - **Parser**: Builds the declaration AST using chumsky
//! - **Docs**: Extracts `@tag text` annotations from doc comments
//! - **Program**: Project file cache plus a per-session in-memory unit
//! - **Resolver/Types**: Name lookup and lazy type evaluation
//! - **Checker**: Structural diagnostics for a value literal
//! - **References**: Which value properties realize which declared fields
//! - **Values**: Offset lookups and ancestry in the value literal

pub mod ast;
pub mod checker;
pub mod docs;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod references;
pub mod resolve;
pub mod types;
pub mod values;

pub use checker::RawDiagnostic;
pub use error::{SchemaError, SchemaResult};
pub use parser::parse;
pub use program::{CompilerOptions, FileId, FileSet, Location, Program, Project, SourceFile};
pub use resolve::{Definition, Resolver};
pub use values::{NodeId, ValueKind, ValueTree, MAX_VALUE_DEPTH};
