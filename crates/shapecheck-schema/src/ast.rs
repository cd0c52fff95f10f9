//! AST for declaration sources and for the value literal of a unit.
//!
//! Every node carries its byte range so the checker can report positions and
//! the reference index can record where a field is realized.

use std::fmt;
use std::ops::Range;

/// Byte range in a source file.
pub type Span = Range<usize>;

/// A parsed declaration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

/// A top-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Export(ExportDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Const(ConstDecl),
}

/// `import { A, B as C } from "./module";`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub names: Vec<ImportName>,
    pub module: String,
    pub span: Span,
}

/// One `name` or `name as alias` entry in an import/export list.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// The name this entry binds locally.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Re-exports from another module.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export { A, B as C } from "./module";`
    Named { names: Vec<ImportName>, module: String },
    /// `export * from "./module";`
    All { module: String },
}

impl ExportDecl {
    pub fn module(&self) -> &str {
        match self {
            ExportDecl::Named { module, .. } | ExportDecl::All { module } => module,
        }
    }
}

/// A generic type parameter: `T extends C = D`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeExpr>,
    pub default: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeExpr>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `const name: Type = <literal>;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub name: String,
    pub name_span: Span,
    pub ty: Option<TypeExpr>,
    pub init: Literal,
    pub span: Span,
}

/// A member of an interface body or object type literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Property(PropertySignature),
    Index(IndexSignature),
}

/// `readonly name?: Type;` with the annotations from its doc comment.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySignature {
    pub name: String,
    pub name_span: Span,
    pub optional: bool,
    pub readonly: bool,
    pub ty: Option<TypeExpr>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

/// `[key: string]: Type`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSignature {
    pub key_name: String,
    pub key: TypeExpr,
    pub value: TypeExpr,
    pub span: Span,
}

/// A doc-comment tag: `@name text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub tag: String,
    pub text: Option<String>,
    /// Byte offset of the `@` in the declaring file.
    pub offset: usize,
}

/// A type expression as written.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Keyword(Keyword),
    Literal(LiteralType),
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Array(Box<TypeExpr>),
    Tuple(Vec<TupleElement>),
    Object(Vec<Member>),
    Reference {
        name: String,
        args: Vec<TypeExpr>,
    },
    Conditional {
        check: Box<TypeExpr>,
        extends: Box<TypeExpr>,
        when_true: Box<TypeExpr>,
        when_false: Box<TypeExpr>,
    },
    Mapped {
        param: String,
        constraint: Box<TypeExpr>,
        optional: bool,
        value: Box<TypeExpr>,
    },
    Paren(Box<TypeExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    Any,
    Unknown,
    Never,
    Null,
    Undefined,
    Object,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Keyword::String,
            "number" => Keyword::Number,
            "boolean" => Keyword::Boolean,
            "any" => Keyword::Any,
            "unknown" => Keyword::Unknown,
            "never" => Keyword::Never,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            "object" => Keyword::Object,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Never => "never",
            Keyword::Null => "null",
            Keyword::Undefined => "undefined",
            Keyword::Object => "object",
        }
    }
}

/// A literal type: `"a"`, `1`, `true`.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(s) => write!(f, "{}", quote(s)),
            LiteralType::Number(n) => write!(f, "{n}"),
            LiteralType::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleElement {
    pub ty: TypeExpr,
    pub optional: bool,
}

/// JSON-style double-quoted rendering of a string.
pub fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

impl TypeExpr {
    /// Render the expression the way declarations print it, substituting
    /// names for which `subst` returns a rendering.
    pub fn render(&self, subst: &dyn Fn(&str) -> Option<String>) -> String {
        let mut out = String::new();
        self.render_into(&mut out, subst);
        out
    }

    fn render_into(&self, out: &mut String, subst: &dyn Fn(&str) -> Option<String>) {
        match &self.kind {
            TypeExprKind::Keyword(k) => out.push_str(k.as_str()),
            TypeExprKind::Literal(lit) => out.push_str(&lit.to_string()),
            TypeExprKind::Union(members) => join_into(out, members, " | ", subst),
            TypeExprKind::Intersection(members) => join_into(out, members, " & ", subst),
            TypeExprKind::Array(elem) => {
                if elem.needs_parens_as_element() {
                    out.push('(');
                    elem.render_into(out, subst);
                    out.push(')');
                } else {
                    elem.render_into(out, subst);
                }
                out.push_str("[]");
            }
            TypeExprKind::Tuple(elems) => {
                out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    elem.ty.render_into(out, subst);
                    if elem.optional {
                        out.push('?');
                    }
                }
                out.push(']');
            }
            TypeExprKind::Object(members) => {
                if members.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{ ");
                for member in members {
                    match member {
                        Member::Property(prop) => {
                            if prop.readonly {
                                out.push_str("readonly ");
                            }
                            out.push_str(&property_name(&prop.name));
                            if prop.optional {
                                out.push('?');
                            }
                            out.push_str(": ");
                            match &prop.ty {
                                Some(ty) => ty.render_into(out, subst),
                                None => out.push_str("any"),
                            }
                        }
                        Member::Index(index) => {
                            out.push('[');
                            out.push_str(&index.key_name);
                            out.push_str(": ");
                            index.key.render_into(out, subst);
                            out.push_str("]: ");
                            index.value.render_into(out, subst);
                        }
                    }
                    out.push_str("; ");
                }
                out.push('}');
            }
            TypeExprKind::Reference { name, args } => {
                if args.is_empty() {
                    if let Some(text) = subst(name) {
                        out.push_str(&text);
                        return;
                    }
                }
                out.push_str(name);
                if !args.is_empty() {
                    out.push('<');
                    join_into(out, args, ", ", subst);
                    out.push('>');
                }
            }
            TypeExprKind::Conditional {
                check,
                extends,
                when_true,
                when_false,
            } => {
                check.render_into(out, subst);
                out.push_str(" extends ");
                extends.render_into(out, subst);
                out.push_str(" ? ");
                when_true.render_into(out, subst);
                out.push_str(" : ");
                when_false.render_into(out, subst);
            }
            TypeExprKind::Mapped {
                param,
                constraint,
                optional,
                value,
            } => {
                out.push_str("{ [");
                out.push_str(param);
                out.push_str(" in ");
                constraint.render_into(out, subst);
                out.push(']');
                if *optional {
                    out.push('?');
                }
                out.push_str(": ");
                value.render_into(out, &|name| if name == param { None } else { subst(name) });
                out.push_str("; }");
            }
            TypeExprKind::Paren(inner) => {
                out.push('(');
                inner.render_into(out, subst);
                out.push(')');
            }
        }
    }

    /// Whether `T[]` must be written `(T)[]`.
    pub fn needs_parens_as_element(&self) -> bool {
        matches!(
            self.kind,
            TypeExprKind::Union(_) | TypeExprKind::Intersection(_) | TypeExprKind::Conditional { .. }
        )
    }

    /// The referenced name when this is a reference without arguments.
    pub fn bare_name(&self) -> Option<&str> {
        match &self.kind {
            TypeExprKind::Reference { name, args } if args.is_empty() => Some(name),
            TypeExprKind::Paren(inner) => inner.bare_name(),
            _ => None,
        }
    }
}

fn join_into(
    out: &mut String,
    items: &[TypeExpr],
    sep: &str,
    subst: &dyn Fn(&str) -> Option<String>,
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        item.render_into(out, subst);
    }
}

/// Property names print bare when they are identifiers, quoted otherwise.
pub fn property_name(name: &str) -> String {
    let mut chars = name.chars();
    let is_ident = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        name.to_string()
    } else {
        quote(name)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&|_| None))
    }
}

/// A JSON-shaped literal, as embedded in a unit's `const` initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Object(Vec<PropertyAssignment>),
    Array(Vec<Literal>),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// `"name": value` inside an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAssignment {
    pub name: String,
    pub name_span: Span,
    pub value: Literal,
    pub span: Span,
}

impl Literal {
    pub fn property(&self, name: &str) -> Option<&PropertyAssignment> {
        match &self.kind {
            LiteralKind::Object(props) => props.iter().find(|p| p.name == name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(kind: TypeExprKind) -> TypeExpr {
        TypeExpr { kind, span: 0..0 }
    }

    fn reference(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        ty(TypeExprKind::Reference {
            name: name.to_string(),
            args,
        })
    }

    #[test]
    fn test_render_union_array_parens() {
        let union = ty(TypeExprKind::Union(vec![
            ty(TypeExprKind::Keyword(Keyword::String)),
            ty(TypeExprKind::Literal(LiteralType::Number(1.0))),
        ]));
        let array = ty(TypeExprKind::Array(Box::new(union)));
        assert_eq!(array.to_string(), "(string | 1)[]");
    }

    #[test]
    fn test_render_substitutes_params() {
        let expr = reference("Mapping", vec![reference("K", vec![]), reference("boolean", vec![])]);
        let text = expr.render(&|name| (name == "K").then(|| "\"a\" | \"b\"".to_string()));
        assert_eq!(text, "Mapping<\"a\" | \"b\", boolean>");
    }

    #[test]
    fn test_render_object_members() {
        let object = ty(TypeExprKind::Object(vec![Member::Property(PropertySignature {
            name: "conditionLeft".to_string(),
            name_span: 0..0,
            optional: false,
            readonly: false,
            ty: Some(ty(TypeExprKind::Keyword(Keyword::String))),
            annotations: vec![],
            span: 0..0,
        })]));
        assert_eq!(object.to_string(), "{ conditionLeft: string; }");
    }

    #[test]
    fn test_property_name_quoting() {
        assert_eq!(property_name("plain_1"), "plain_1");
        assert_eq!(property_name("with-dash"), "\"with-dash\"");
    }
}
