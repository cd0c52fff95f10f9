//! Validator sessions.
//!
//! A session owns one program over a (possibly shared) project and the
//! merged extension registry. Calls are sequential: each one replaces the
//! session's unit wholesale.

use std::sync::Arc;

use serde_json::Value;
use shapecheck_schema::Project;
use tracing::debug;

use crate::adapter::{SchemaAdapter, TypeSelector};
use crate::config::ValidatorOptions;
use crate::error::{ValidateError, ValidatorError, ValidatorResult};
use crate::extensions::ExtensionRegistry;
use crate::validator::Validator;
use crate::value_path::Diagnostic;

#[derive(Debug)]
pub struct ValidatorSession {
    adapter: SchemaAdapter,
    registry: ExtensionRegistry,
}

impl ValidatorSession {
    /// A session with a project of its own.
    pub fn new(options: &ValidatorOptions) -> ValidatorResult<Self> {
        let key = options.key()?;
        let project = Arc::new(Project::new(key.compiler_options()));
        Ok(Self::with_project(project, &options.extensions))
    }

    /// A session over a shared project. `extensions` override built-ins.
    pub fn with_project(project: Arc<Project>, extensions: &ExtensionRegistry) -> Self {
        let mut registry = ExtensionRegistry::with_builtins();
        registry.extend(extensions);
        Self {
            adapter: SchemaAdapter::new(project),
            registry,
        }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn adapter(&self) -> &SchemaAdapter {
        &self.adapter
    }

    /// `None` when the value is valid, otherwise a non-empty list.
    /// Structural problems short-circuit the extension phase.
    pub fn diagnose(
        &mut self,
        selector: &TypeSelector,
        value: &Value,
    ) -> ValidatorResult<Option<Vec<Diagnostic>>> {
        let structural = self.adapter.check_structural(selector, value)?;
        if !structural.is_empty() {
            debug!(count = structural.len(), "structural diagnostics");
            return Ok(Some(structural));
        }

        let extension = Validator::new(&self.adapter, &self.registry).validate()?;
        if extension.is_empty() {
            Ok(None)
        } else {
            debug!(count = extension.len(), "extension diagnostics");
            Ok(Some(extension))
        }
    }

    /// Fail with [`ValidateError`] when the value has diagnostics.
    pub fn validate(&mut self, selector: &TypeSelector, value: &Value) -> ValidatorResult<()> {
        match self.diagnose(selector, value)? {
            None => Ok(()),
            Some(diagnostics) => Err(ValidatorError::Invalid(ValidateError { diagnostics })),
        }
    }

    pub fn test(&mut self, selector: &TypeSelector, value: &Value) -> ValidatorResult<bool> {
        Ok(self.diagnose(selector, value)?.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(schema: &str, options: impl FnOnce(ValidatorOptions) -> ValidatorOptions) -> (tempfile::TempDir, ValidatorSession) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("index.d.ts"), schema).unwrap_or_else(|e| panic!("write: {e}"));
        let options = options(ValidatorOptions::new(dir.path()));
        let session = ValidatorSession::new(&options).unwrap_or_else(|e| panic!("session: {e}"));
        (dir, session)
    }

    const SCHEMA: &str = r#"
export interface User {
  /** @pattern ^[a-z]+$ */
  name: string;
  age: number;
}
"#;

    #[test]
    fn valid_value_is_none() {
        let (_dir, mut session) = session(SCHEMA, |o| o);
        let selector = TypeSelector::module(".", "User");
        let result = session.diagnose(&selector, &json!({"name": "ada", "age": 36}));
        assert!(matches!(result, Ok(None)));
        assert!(session.test(&selector, &json!({"name": "ada", "age": 36})).unwrap_or(false));
    }

    #[test]
    fn structural_errors_skip_extensions() {
        let (_dir, mut session) = session(SCHEMA, |o| o);
        let selector = TypeSelector::module(".", "User");
        let found = session
            .diagnose(&selector, &json!({"name": "ADA", "age": "old"}))
            .unwrap_or_else(|e| panic!("diagnose: {e}"))
            .unwrap_or_default();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "Type 'string' is not assignable to type 'number'.");
    }

    #[test]
    fn extension_diagnostics_after_clean_structure() {
        let (_dir, mut session) = session(SCHEMA, |o| o);
        let selector = TypeSelector::module(".", "User");
        let err = session.validate(&selector, &json!({"name": "ADA", "age": 1}));
        match err {
            Err(ValidatorError::Invalid(invalid)) => {
                assert_eq!(invalid.to_string(), "Type validation failed");
                assert_eq!(
                    invalid.reasons(),
                    vec!["Diagnostic value path: [\"name\"]\n  Value \"ADA\" does not match pattern ^[a-z]+$"]
                );
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn custom_extension_overrides_builtin() {
        let (_dir, mut session) = session(SCHEMA, |o| {
            o.with_extension("pattern", |_, _, _, _| Ok(None))
        });
        let selector = TypeSelector::module(".", "User");
        assert!(matches!(session.diagnose(&selector, &json!({"name": "ADA", "age": 1})), Ok(None)));
    }

    #[test]
    fn uniqueness_resets_between_calls() {
        let schema = "export interface Tagged { /** @unique */ id: string }";
        let (_dir, mut session) = session(schema, |o| o);
        let selector = TypeSelector::module(".", "Tagged[]");
        let value = json!([{"id": "a"}]);
        assert!(matches!(session.diagnose(&selector, &value), Ok(None)));
        assert!(matches!(session.diagnose(&selector, &value), Ok(None)));
    }

    #[test]
    fn deeply_nested_value_is_a_schema_error() {
        let (_dir, mut session) = session("export interface Node { next?: Node }", |o| o);
        let selector = TypeSelector::module(".", "Node");
        let mut value = json!({});
        for _ in 0..1500 {
            value = json!({ "next": value });
        }
        let result = session.diagnose(&selector, &value);
        assert!(matches!(
            result,
            Err(ValidatorError::Schema(shapecheck_schema::SchemaError::ValueTooDeep { .. }))
        ));
        assert!(matches!(
            session.diagnose(&selector, &json!({"next": {"next": {}}})),
            Ok(None)
        ));
    }
}
