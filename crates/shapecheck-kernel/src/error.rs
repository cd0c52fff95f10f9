//! Error types for validation and the request pipeline.
//!
//! Data problems are diagnostics, not errors. Everything here is a
//! configuration or infrastructure failure the caller has to fix.

use std::path::PathBuf;

use shapecheck_schema::SchemaError;
use thiserror::Error;

use crate::extensions::ExtensionError;
use crate::value_path::Diagnostic;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// A located occurrence has no initializer that parses back to JSON.
    #[error("property assignment at offset {offset} has no JSON initializer: {reason}")]
    MissingInitializer { offset: usize, reason: String },

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Invalid(#[from] ValidateError),
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// A value failed validation. Carries the diagnostics.
#[derive(Debug, Clone, Error)]
#[error("Type validation failed")]
pub struct ValidateError {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidateError {
    /// Diagnostic texts, one per diagnostic.
    pub fn reasons(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The worker answered with an error response.
    #[error("{0}")]
    Remote(String),

    #[error("pipeline worker has shut down")]
    Closed,

    #[error("failed to start pipeline worker: {0}")]
    Spawn(String),

    /// `validate` on a value with diagnostics.
    #[error("Type validation failed")]
    Invalid { reasons: Vec<String> },

    #[error("unexpected response from worker: {0}")]
    Protocol(String),
}
