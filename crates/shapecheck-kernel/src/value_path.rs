//! Value paths and the diagnostics that carry them.

use std::fmt;

use serde::{Deserialize, Serialize};
use shapecheck_schema::ast::quote;
use shapecheck_schema::{NodeId, ValueKind, ValueTree};

/// One step from a parent value into a child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Property(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Property(name) => write!(f, "[{}]", quote(name)),
        }
    }
}

/// Path from the root value to a nested value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuePath(pub Vec<PathSegment>);

impl ValuePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("(root)");
        }
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// A located validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: ValuePath,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: ValuePath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Diagnostic value path: {}\n{}", self.path, indent(&self.message, 2))
    }
}

/// Indent every non-empty line by `width` spaces.
pub fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Path of a node: walk parents up to the declaration, collecting an index
/// for each array parent and a name for each property parent.
pub fn path_of(tree: &ValueTree, node: NodeId) -> ValuePath {
    let mut segments = Vec::new();
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        match &tree.node(parent).kind {
            ValueKind::Declaration => break,
            ValueKind::Array => {
                if let Some(index) = tree.index_in_parent(current) {
                    segments.push(PathSegment::Index(index));
                }
            }
            ValueKind::Property { name } => segments.push(PathSegment::Property(name.clone())),
            _ => {}
        }
        current = parent;
    }
    segments.reverse();
    ValuePath(segments)
}
