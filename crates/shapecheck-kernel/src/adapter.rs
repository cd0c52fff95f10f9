//! Adapter between the validator and the schema compiler service.
//!
//! Every check synthesizes a one-declaration unit holding the candidate
//! value as a typed `const`, replaces the session's unit with it, and reads
//! diagnostics and reference lookups back in terms of value paths.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shapecheck_schema::{
    FileSet, Location, NodeId, Program, Project, RawDiagnostic, Resolver, SchemaError, SourceFile,
    ValueTree, MAX_VALUE_DEPTH,
};
use tracing::trace;

use crate::error::{ValidatorError, ValidatorResult};
use crate::value_path::{path_of, Diagnostic, ValuePath};

/// Name of the synthesized declaration holding the value.
pub const VALUE_BINDING: &str = "__value";

/// Which type a value is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSelector {
    /// A type expression resolved against the project's global types.
    Expr(String),
    /// A type exported by a module, relative to the project root.
    Module {
        module: String,
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl TypeSelector {
    pub fn module(module: impl Into<String>, type_name: impl Into<String>) -> Self {
        TypeSelector::Module {
            module: module.into(),
            type_name: type_name.into(),
        }
    }

    /// The type text written after the binding's colon.
    pub fn type_text(&self) -> &str {
        match self {
            TypeSelector::Expr(text) => text,
            TypeSelector::Module { type_name, .. } => type_name,
        }
    }

    /// Source of the unit checking `value` against this selector.
    pub fn unit_source(&self, value: &Value) -> String {
        let json = value.to_string();
        match self {
            TypeSelector::Expr(text) => format!("export const {VALUE_BINDING}: {text} = {json};"),
            TypeSelector::Module { module, type_name } => {
                let head = type_name
                    .split(|c: char| c == '.' || c == '<' || c == '[' || c.is_whitespace())
                    .next()
                    .unwrap_or(type_name);
                format!(
                    "import {{{head}}} from {};\nexport const {VALUE_BINDING}: {type_name} = {json};",
                    Value::String(module.clone())
                )
            }
        }
    }
}

impl From<&str> for TypeSelector {
    fn from(text: &str) -> Self {
        TypeSelector::Expr(text.to_string())
    }
}

impl From<String> for TypeSelector {
    fn from(text: String) -> Self {
        TypeSelector::Expr(text)
    }
}

/// One place an annotated field occurs in the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// The property's initializer, parsed back from the unit.
    pub value: Value,
    /// The initializer's node in the value tree.
    pub node: NodeId,
}

/// A session's view of the schema compiler.
#[derive(Debug)]
pub struct SchemaAdapter {
    program: Program,
}

impl SchemaAdapter {
    pub fn new(project: Arc<Project>) -> Self {
        Self {
            program: Program::new(project),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Replace the unit with one holding `value` typed by `selector`.
    pub fn submit(&mut self, selector: &TypeSelector, value: &Value) {
        let source = selector.unit_source(value);
        trace!(unit = %source, "submitting unit");
        self.program.update_unit(source);
    }

    /// Submit the value and return its structural diagnostics: syntax
    /// problems first, then type mismatches.
    pub fn check_structural(
        &mut self,
        selector: &TypeSelector,
        value: &Value,
    ) -> ValidatorResult<Vec<Diagnostic>> {
        if json_depth(value) > MAX_VALUE_DEPTH {
            return Err(SchemaError::ValueTooDeep {
                limit: MAX_VALUE_DEPTH,
            }
            .into());
        }
        self.submit(selector, value);
        let syntactic = self.program.syntactic_diagnostics();
        if !syntactic.is_empty() {
            return Ok(self.locate(syntactic));
        }
        let semantic = self.program.semantic_diagnostics()?;
        Ok(self.locate(semantic))
    }

    fn locate(&self, raw: Vec<RawDiagnostic>) -> Vec<Diagnostic> {
        raw.into_iter()
            .map(|d| Diagnostic::new(self.path_at(d.offset), d.message))
            .collect()
    }

    /// Value path of the node at a unit offset; the root when the offset
    /// falls outside the value.
    pub fn path_at(&self, offset: usize) -> ValuePath {
        match self.tree().and_then(|tree| Some((tree, tree.token_at(offset)?))) {
            Some((tree, node)) => path_of(tree, node),
            None => ValuePath::root(),
        }
    }

    pub fn tree(&self) -> Option<&ValueTree> {
        self.program.value_tree()
    }

    /// Files visible to the current unit.
    pub fn file_set(&self) -> ValidatorResult<Arc<FileSet>> {
        Ok(self.program.file_set()?)
    }

    /// Declarations `name` refers to when written in `file`.
    pub fn definitions<'a>(
        &self,
        files: &'a FileSet,
        file: &'a SourceFile,
        name: &str,
    ) -> ValidatorResult<Vec<shapecheck_schema::Definition<'a>>> {
        Ok(Resolver::new(files).lookup(file, name)?)
    }

    /// Occurrences in the value of the field declared at `decl`, in source
    /// order.
    pub fn occurrences(&self, decl: Location) -> ValidatorResult<Vec<Occurrence>> {
        let Some(tree) = self.tree() else {
            return Ok(Vec::new());
        };
        let Some(literal) = tree.literal() else {
            return Ok(Vec::new());
        };
        let span = tree.node(literal).span.clone();
        let unit = self.program.unit_id();
        let text = self.program.unit_text();

        let mut found = Vec::new();
        for location in self.program.implementations_of(decl)? {
            if location.file != unit || !span.contains(&location.offset) {
                continue;
            }
            let Some(property) = tree
                .token_at(location.offset)
                .and_then(|node| tree.enclosing_property(node))
            else {
                continue;
            };
            let Some(init) = tree.initializer(property) else {
                return Err(ValidatorError::MissingInitializer {
                    offset: location.offset,
                    reason: "property has no initializer".to_string(),
                });
            };
            let source = text
                .get(tree.node(init).span.clone())
                .unwrap_or_default();
            let value = serde_json::from_str(source).map_err(|e| ValidatorError::MissingInitializer {
                offset: location.offset,
                reason: e.to_string(),
            })?;
            found.push(Occurrence { value, node: init });
        }
        Ok(found)
    }
}

/// Deepest object/array nesting in `value`, measured without recursion.
fn json_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        match value {
            Value::Array(items) => stack.extend(items.iter().map(|item| (item, depth + 1))),
            Value::Object(map) => stack.extend(map.values().map(|item| (item, depth + 1))),
            _ => {}
        }
    }
    deepest
}
