//! Errors raised by the schema compiler.
//!
//! These are configuration problems, not data problems: a value that does
//! not fit its type produces diagnostics, never a `SchemaError`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("cannot find name '{name}' in {path}")]
    UnresolvedName { name: String, path: PathBuf },

    #[error("cannot find module '{specifier}' from {from}")]
    ModuleNotFound { specifier: String, from: PathBuf },

    #[error("type instantiation is excessively deep while evaluating '{0}'")]
    InstantiationTooDeep(String),

    /// Objects and arrays nested deeper than [`crate::values::MAX_VALUE_DEPTH`].
    #[error("value is nested deeper than {limit} levels")]
    ValueTooDeep { limit: usize },

    #[error("generic type '{name}' requires {expected} type argument(s)")]
    Generic { name: String, expected: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
