//! Value tree: an arena view of a unit's value literal with parent links.
//!
//! Diagnostic positions and reference locations are byte offsets; the tree
//! turns an offset back into the node it falls on so the caller can walk
//! upward to the declaration.

use std::ops::Range;

use crate::ast::{ConstDecl, Literal, LiteralKind};
use crate::error::{SchemaError, SchemaResult};

/// Deepest object/array nesting accepted in a value. Every walk over the
/// value recurses once per level, so deeper values are refused up front
/// instead of exhausting the stack.
pub const MAX_VALUE_DEPTH: usize = 256;

/// Index of a node in a [`ValueTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// The `const` declaration holding the literal. Always the root.
    Declaration,
    Object,
    /// A `"name": value` assignment. Children: the key, then the initializer.
    Property { name: String },
    /// The name token of a property assignment.
    Key { name: String },
    Array,
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct ValueNode {
    pub kind: ValueKind,
    pub span: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ValueTree {
    nodes: Vec<ValueNode>,
}

impl ValueTree {
    /// Build the tree for a `const` declaration and its initializer.
    /// Fails when the initializer nests deeper than [`MAX_VALUE_DEPTH`].
    pub fn from_const(decl: &ConstDecl) -> SchemaResult<Self> {
        let mut tree = Self {
            nodes: vec![ValueNode {
                kind: ValueKind::Declaration,
                span: decl.span.clone(),
                parent: None,
                children: Vec::new(),
            }],
        };
        tree.push_literal(&decl.init, NodeId(0), 0)?;
        Ok(tree)
    }

    fn push(&mut self, kind: ValueKind, span: Range<usize>, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ValueNode {
            kind,
            span,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push_literal(&mut self, literal: &Literal, parent: NodeId, depth: usize) -> SchemaResult<NodeId> {
        if depth > MAX_VALUE_DEPTH {
            return Err(SchemaError::ValueTooDeep {
                limit: MAX_VALUE_DEPTH,
            });
        }
        let kind = match &literal.kind {
            LiteralKind::Object(_) => ValueKind::Object,
            LiteralKind::Array(_) => ValueKind::Array,
            LiteralKind::String(s) => ValueKind::String(s.clone()),
            LiteralKind::Number(n) => ValueKind::Number(*n),
            LiteralKind::Bool(b) => ValueKind::Bool(*b),
            LiteralKind::Null => ValueKind::Null,
        };
        let id = self.push(kind, literal.span.clone(), parent);

        match &literal.kind {
            LiteralKind::Object(props) => {
                for prop in props {
                    let prop_id = self.push(
                        ValueKind::Property {
                            name: prop.name.clone(),
                        },
                        prop.span.clone(),
                        id,
                    );
                    self.push(
                        ValueKind::Key {
                            name: prop.name.clone(),
                        },
                        prop.name_span.clone(),
                        prop_id,
                    );
                    self.push_literal(&prop.value, prop_id, depth + 1)?;
                }
            }
            LiteralKind::Array(items) => {
                for item in items {
                    self.push_literal(item, id, depth + 1)?;
                }
            }
            _ => {}
        }

        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The top-level literal under the declaration.
    pub fn literal(&self) -> Option<NodeId> {
        self.nodes[0].children.first().copied()
    }

    pub fn node(&self, id: NodeId) -> &ValueNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Deepest node whose span contains `offset`.
    pub fn token_at(&self, offset: usize) -> Option<NodeId> {
        let root = self.root();
        if !self.node(root).span.contains(&offset) {
            return None;
        }
        let mut current = root;
        'descend: loop {
            for &child in &self.node(current).children {
                if self.node(child).span.contains(&offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Nearest property assignment at or above `id`.
    pub fn enclosing_property(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            match self.node(node).kind {
                ValueKind::Property { .. } => return Some(node),
                ValueKind::Declaration => return None,
                _ => current = self.parent(node),
            }
        }
        None
    }

    /// Initializer of a property assignment.
    pub fn initializer(&self, property: NodeId) -> Option<NodeId> {
        match self.node(property).kind {
            ValueKind::Property { .. } => self.node(property).children.get(1).copied(),
            _ => None,
        }
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.node(parent).children.iter().position(|&c| c == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Item;
    use crate::parser::parse;

    fn tree(source: &str) -> ValueTree {
        let module = parse(source).unwrap_or_default();
        match module.items.into_iter().next() {
            Some(Item::Const(decl)) => ValueTree::from_const(&decl).unwrap_or_else(|e| panic!("tree: {e}")),
            other => panic!("expected const, got {other:?}"),
        }
    }

    #[test]
    fn test_token_at_finds_key() {
        let source = r#"const v = {"subs": [{"id": "a"}]};"#;
        let tree = tree(source);
        let offset = source.find(r#""id""#).unwrap_or_default();
        let key = tree.token_at(offset).unwrap_or(tree.root());
        assert_eq!(
            tree.node(key).kind,
            ValueKind::Key {
                name: "id".to_string()
            }
        );
        let prop = tree.enclosing_property(key).unwrap_or(tree.root());
        let init = tree.initializer(prop).unwrap_or(tree.root());
        assert_eq!(&source[tree.node(init).span.clone()], r#""a""#);
    }

    #[test]
    fn test_array_element_index() {
        let source = "const v = [1, 2, 3];";
        let tree = tree(source);
        let offset = source.find('3').unwrap_or_default();
        let node = tree.token_at(offset).unwrap_or(tree.root());
        assert_eq!(tree.node(node).kind, ValueKind::Number(3.0));
        assert_eq!(tree.index_in_parent(node), Some(2));
    }

    #[test]
    fn test_offset_outside_declaration() {
        let tree = tree("const v = 1;");
        assert_eq!(tree.token_at(500), None);
        assert_eq!(tree.enclosing_property(tree.root()), None);
    }

    #[test]
    fn test_deep_literal_is_refused() {
        let mut init = Literal {
            kind: LiteralKind::Null,
            span: 0..0,
        };
        for _ in 0..1500 {
            init = Literal {
                kind: LiteralKind::Array(vec![init]),
                span: 0..0,
            };
        }
        let decl = ConstDecl {
            name: "v".to_string(),
            name_span: 0..0,
            ty: None,
            init,
            span: 0..0,
        };
        assert!(matches!(
            ValueTree::from_const(&decl),
            Err(SchemaError::ValueTooDeep { limit: MAX_VALUE_DEPTH })
        ));
    }
}
