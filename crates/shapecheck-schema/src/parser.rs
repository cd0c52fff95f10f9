//! Parser for declaration sources.
//!
//! Transforms the lexer's token stream into a [`Module`]. Uses chumsky for
//! parser combinators. Doc comments are split off before parsing and attached
//! afterwards to the member that directly follows each one.

use std::collections::HashMap;
use std::ops::Range;

use crate::ast::{
    Annotation, ConstDecl, ExportDecl, ImportDecl, ImportName, IndexSignature, InterfaceDecl,
    Item, Keyword, Literal, LiteralKind, LiteralType, Member, Module, PropertyAssignment,
    PropertySignature, TupleElement, TypeAliasDecl, TypeExpr, TypeExprKind, TypeParam,
};
use crate::docs;
use crate::lexer::{self, Token};
use crate::values::MAX_VALUE_DEPTH;
use chumsky::{input::ValueInput, prelude::*};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Parse error with location and context.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Parse a declaration source into a [`Module`].
///
/// Sources nested deeper than [`MAX_VALUE_DEPTH`] brackets are refused
/// before the recursive grammar runs.
pub fn parse(source: &str) -> Result<Module, Vec<ParseError>> {
    if lexer::nesting_depth(source) > MAX_VALUE_DEPTH {
        return Err(vec![ParseError {
            span: (0..0).into(),
            message: format!("brackets are nested deeper than {MAX_VALUE_DEPTH} levels"),
        }]);
    }

    let tokens = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: (e.span.start..e.span.end).into(),
                message: format!("lexer error: unexpected {:?}", e.text),
            })
            .collect::<Vec<_>>()
    })?;

    let (comments, tokens): (Vec<_>, Vec<_>) = tokens
        .into_iter()
        .partition(|spanned| matches!(spanned.token, Token::BlockComment(_)));

    let tokens: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|spanned| (spanned.token, (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (source.len()..source.len()).into();

    let parser = module_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    let mut module = result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: *e.span(),
                message: e.to_string(),
            })
            .collect::<Vec<_>>()
    })?;

    let mut docs_by_target: HashMap<usize, Vec<Annotation>> = HashMap::new();
    for comment in comments.iter().filter(|c| c.token.is_doc_comment()) {
        let Token::BlockComment(text) = &comment.token else {
            continue;
        };
        let Some(target) = tokens
            .iter()
            .map(|(_, span)| span.start)
            .find(|&start| start >= comment.span.end)
        else {
            continue;
        };
        docs_by_target
            .entry(target)
            .or_default()
            .extend(docs::parse_tags(text, comment.span.start));
    }
    if !docs_by_target.is_empty() {
        attach_docs(&mut module, &mut docs_by_target);
    }

    Ok(module)
}

fn range(span: Span) -> Range<usize> {
    span.start..span.end
}

// ═══════════════════════════════════════════════════════════════════════════
// Doc comment attachment
// ═══════════════════════════════════════════════════════════════════════════

fn attach_docs(module: &mut Module, docs: &mut HashMap<usize, Vec<Annotation>>) {
    for item in &mut module.items {
        match item {
            Item::Interface(decl) => {
                attach_params(&mut decl.type_params, docs);
                for ty in &mut decl.extends {
                    attach_type(ty, docs);
                }
                attach_members(&mut decl.members, docs);
            }
            Item::TypeAlias(decl) => {
                attach_params(&mut decl.type_params, docs);
                attach_type(&mut decl.ty, docs);
            }
            Item::Const(decl) => {
                if let Some(ty) = &mut decl.ty {
                    attach_type(ty, docs);
                }
            }
            Item::Import(_) | Item::Export(_) => {}
        }
    }
}

fn attach_params(params: &mut [TypeParam], docs: &mut HashMap<usize, Vec<Annotation>>) {
    for param in params {
        if let Some(ty) = &mut param.constraint {
            attach_type(ty, docs);
        }
        if let Some(ty) = &mut param.default {
            attach_type(ty, docs);
        }
    }
}

fn attach_members(members: &mut [Member], docs: &mut HashMap<usize, Vec<Annotation>>) {
    for member in members {
        match member {
            Member::Property(prop) => {
                if let Some(tags) = docs.remove(&prop.span.start) {
                    prop.annotations.extend(tags);
                }
                if let Some(ty) = &mut prop.ty {
                    attach_type(ty, docs);
                }
            }
            Member::Index(index) => attach_type(&mut index.value, docs),
        }
    }
}

fn attach_type(ty: &mut TypeExpr, docs: &mut HashMap<usize, Vec<Annotation>>) {
    match &mut ty.kind {
        TypeExprKind::Object(members) => attach_members(members, docs),
        TypeExprKind::Union(items) | TypeExprKind::Intersection(items) => {
            for item in items {
                attach_type(item, docs);
            }
        }
        TypeExprKind::Reference { args, .. } => {
            for arg in args {
                attach_type(arg, docs);
            }
        }
        TypeExprKind::Tuple(elems) => {
            for elem in elems {
                attach_type(&mut elem.ty, docs);
            }
        }
        TypeExprKind::Array(inner) | TypeExprKind::Paren(inner) => attach_type(inner, docs),
        TypeExprKind::Conditional {
            check,
            extends,
            when_true,
            when_false,
        } => {
            attach_type(check, docs);
            attach_type(extends, docs);
            attach_type(when_true, docs);
            attach_type(when_false, docs);
        }
        TypeExprKind::Mapped {
            constraint, value, ..
        } => {
            attach_type(constraint, docs);
            attach_type(value, docs);
        }
        TypeExprKind::Keyword(_) | TypeExprKind::Literal(_) => {}
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level module parser.
fn module_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Module, extra::Err<Rich<'tokens, Token, Span>>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Semi)
        .repeated()
        .ignore_then(item_parser().repeated().collect::<Vec<_>>())
        .map(|items| Module { items })
}

/// Item parser - imports, re-exports, and declarations.
fn item_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Item, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let modifiers = choice((just(Token::Export), just(Token::Declare))).repeated();

    choice((
        import_parser().map(Item::Import),
        export_from_parser().map(Item::Export),
        modifiers.ignore_then(choice((
            interface_parser().map(Item::Interface),
            type_alias_parser().map(Item::TypeAlias),
            const_parser().map(Item::Const),
        ))),
    ))
    .then_ignore(just(Token::Semi).repeated())
    .boxed()
}

/// `import { A, B as C } from "./module"`
fn import_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ImportDecl, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Import)
        .ignore_then(just(Token::Type).or_not())
        .ignore_then(name_list_parser())
        .then_ignore(just(Token::From))
        .then(string_parser())
        .map_with(|(names, module), e| ImportDecl {
            names,
            module,
            span: range(e.span()),
        })
        .labelled("import")
        .boxed()
}

/// `export { A } from "./module"` or `export * from "./module"`
fn export_from_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ExportDecl, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let named = name_list_parser()
        .then_ignore(just(Token::From))
        .then(string_parser())
        .map(|(names, module)| ExportDecl::Named { names, module });

    let all = just(Token::Star)
        .ignore_then(just(Token::From))
        .ignore_then(string_parser())
        .map(|module| ExportDecl::All { module });

    just(Token::Export)
        .ignore_then(just(Token::Type).or_not())
        .ignore_then(choice((named, all)))
        .labelled("re-export")
        .boxed()
}

/// `{ A, B as C }`
fn name_list_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<ImportName>, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    ident_parser()
        .then(just(Token::As).ignore_then(ident_parser()).or_not())
        .map(|(name, alias)| ImportName { name, alias })
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
}

/// `interface Name<T> extends Base { members }`
fn interface_parser<'tokens, I>(
) -> impl Parser<'tokens, I, InterfaceDecl, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    let heritage = just(Token::Extends)
        .ignore_then(
            type_parser()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .or_not()
        .map(Option::unwrap_or_default);

    just(Token::Interface)
        .ignore_then(ident_parser())
        .then(type_params_parser())
        .then(heritage)
        .then(member_block_parser(type_parser()))
        .map_with(|(((name, type_params), extends), members), e| InterfaceDecl {
            name,
            type_params,
            extends,
            members,
            span: range(e.span()),
        })
        .labelled("interface")
        .boxed()
}

/// `type Name<T> = Type`
fn type_alias_parser<'tokens, I>(
) -> impl Parser<'tokens, I, TypeAliasDecl, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Type)
        .ignore_then(ident_parser())
        .then(type_params_parser())
        .then_ignore(just(Token::Eq))
        .then(type_parser())
        .map_with(|((name, type_params), ty), e| TypeAliasDecl {
            name,
            type_params,
            ty,
            span: range(e.span()),
        })
        .labelled("type alias")
        .boxed()
}

/// `const name: Type = <literal>`
fn const_parser<'tokens, I>(
) -> impl Parser<'tokens, I, ConstDecl, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Const)
        .ignore_then(ident_parser().map_with(|name, e| (name, range(e.span()))))
        .then(just(Token::Colon).ignore_then(type_parser()).or_not())
        .then_ignore(just(Token::Eq))
        .then(literal_parser())
        .map_with(|(((name, name_span), ty), init), e| ConstDecl {
            name,
            name_span,
            ty,
            init,
            span: range(e.span()),
        })
        .labelled("const declaration")
        .boxed()
}

/// `<T extends C = D, U>`, or nothing.
fn type_params_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<TypeParam>, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    ident_parser()
        .then(just(Token::Extends).ignore_then(type_parser()).or_not())
        .then(just(Token::Eq).ignore_then(type_parser()).or_not())
        .map(|((name, constraint), default)| TypeParam {
            name,
            constraint,
            default,
        })
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::Lt), just(Token::Gt))
        .or_not()
        .map(Option::unwrap_or_default)
        .labelled("type parameters")
}

/// `{ member; member, member }`
fn member_block_parser<'tokens, I, T>(
    ty: T,
) -> impl Parser<'tokens, I, Vec<Member>, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    T: Parser<'tokens, I, TypeExpr, extra::Err<Rich<'tokens, Token, Span>>> + Clone + 'tokens,
{
    member_parser(ty)
        .then_ignore(choice((just(Token::Semi), just(Token::Comma))).or_not())
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
}

/// Property or index signature.
fn member_parser<'tokens, I, T>(
    ty: T,
) -> impl Parser<'tokens, I, Member, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    T: Parser<'tokens, I, TypeExpr, extra::Err<Rich<'tokens, Token, Span>>> + Clone + 'tokens,
{
    let name = property_name_parser();

    // `readonly: string` is a property named readonly, so the modifier
    // alternative has to be able to back out.
    let property = choice((
        just(Token::Readonly)
            .ignore_then(name.clone())
            .map(|name| (true, name)),
        name.map(|name| (false, name)),
    ))
    .then(just(Token::Question).or_not())
    .then(just(Token::Colon).ignore_then(ty.clone()).or_not())
    .map_with(|(((readonly, (name, name_span)), question), ty), e| {
        Member::Property(PropertySignature {
            name,
            name_span,
            optional: question.is_some(),
            readonly,
            ty,
            annotations: Vec::new(),
            span: range(e.span()),
        })
    });

    let index = just(Token::Readonly)
        .or_not()
        .ignore_then(
            ident_parser()
                .then_ignore(just(Token::Colon))
                .then(ty.clone())
                .delimited_by(just(Token::LBracket), just(Token::RBracket)),
        )
        .then_ignore(just(Token::Colon))
        .then(ty)
        .map_with(|((key_name, key), value), e| {
            Member::Index(IndexSignature {
                key_name,
                key,
                value,
                span: range(e.span()),
            })
        });

    choice((index, property)).labelled("member").boxed()
}

/// Type expression parser.
///
/// Grammar (lowest precedence first):
///   type         = union [ "extends" union "?" type ":" type ]
///   union        = [ "|" ] intersection { "|" intersection }
///   intersection = [ "&" ] postfix { "&" postfix }
///   postfix      = atom { "[" "]" }
fn type_parser<'tokens, I>(
) -> impl Parser<'tokens, I, TypeExpr, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|ty| {
        let literal = select! {
            Token::String(s) => TypeExprKind::Literal(LiteralType::String(s)),
            Token::Number(n) => TypeExprKind::Literal(LiteralType::Number(n)),
            Token::True => TypeExprKind::Literal(LiteralType::Bool(true)),
            Token::False => TypeExprKind::Literal(LiteralType::Bool(false)),
            Token::Null => TypeExprKind::Keyword(Keyword::Null),
        }
        .labelled("literal type");

        let type_args = ty
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .at_least(1)
            .collect::<Vec<_>>()
            .delimited_by(just(Token::Lt), just(Token::Gt));

        let reference = ident_parser()
            .separated_by(just(Token::Dot))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|parts| parts.join("."))
            .then(type_args.or_not())
            .map(|(name, args)| match (Keyword::from_name(&name), args) {
                (Some(keyword), None) => TypeExprKind::Keyword(keyword),
                (_, args) => TypeExprKind::Reference {
                    name,
                    args: args.unwrap_or_default(),
                },
            })
            .labelled("type reference");

        let paren = ty
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|inner| TypeExprKind::Paren(Box::new(inner)));

        let tuple = ty
            .clone()
            .then(just(Token::Question).or_not())
            .map(|(ty, question)| TupleElement {
                ty,
                optional: question.is_some(),
            })
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(TypeExprKind::Tuple)
            .labelled("tuple type");

        let mapped = just(Token::LBrace)
            .ignore_then(just(Token::Readonly).or_not())
            .ignore_then(just(Token::LBracket))
            .ignore_then(ident_parser())
            .then_ignore(just(Token::In))
            .then(ty.clone())
            .then_ignore(just(Token::RBracket))
            .then(just(Token::Question).or_not())
            .then_ignore(just(Token::Colon))
            .then(ty.clone())
            .then_ignore(choice((just(Token::Semi), just(Token::Comma))).or_not())
            .then_ignore(just(Token::RBrace))
            .map(|(((param, constraint), question), value)| TypeExprKind::Mapped {
                param,
                constraint: Box::new(constraint),
                optional: question.is_some(),
                value: Box::new(value),
            })
            .labelled("mapped type");

        let object = member_block_parser(ty.clone())
            .map(TypeExprKind::Object)
            .labelled("object type");

        let atom = choice((literal, mapped, object, tuple, paren, reference))
            .map_with(|kind, e| TypeExpr {
                kind,
                span: range(e.span()),
            })
            .boxed();

        let postfix = atom.foldl(
            just(Token::LBracket)
                .then(just(Token::RBracket))
                .map_with(|_, e| e.span())
                .repeated(),
            |elem, end: Span| {
                let span = elem.span.start..end.end;
                TypeExpr {
                    kind: TypeExprKind::Array(Box::new(elem)),
                    span,
                }
            },
        );

        let intersection = just(Token::Amp)
            .or_not()
            .ignore_then(
                postfix
                    .separated_by(just(Token::Amp))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .map_with(|members, e| combine(members, e.span(), TypeExprKind::Intersection));

        let union = just(Token::Pipe)
            .or_not()
            .ignore_then(
                intersection
                    .separated_by(just(Token::Pipe))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .map_with(|members, e| combine(members, e.span(), TypeExprKind::Union))
            .boxed();

        union
            .clone()
            .then(
                just(Token::Extends)
                    .ignore_then(union)
                    .then_ignore(just(Token::Question))
                    .then(ty.clone())
                    .then_ignore(just(Token::Colon))
                    .then(ty)
                    .or_not(),
            )
            .map_with(|(check, branches), e| match branches {
                None => check,
                Some(((extends, when_true), when_false)) => TypeExpr {
                    kind: TypeExprKind::Conditional {
                        check: Box::new(check),
                        extends: Box::new(extends),
                        when_true: Box::new(when_true),
                        when_false: Box::new(when_false),
                    },
                    span: range(e.span()),
                },
            })
            .labelled("type")
    })
}

fn combine(
    mut members: Vec<TypeExpr>,
    span: Span,
    build: fn(Vec<TypeExpr>) -> TypeExprKind,
) -> TypeExpr {
    if members.len() == 1 {
        members.remove(0)
    } else {
        TypeExpr {
            kind: build(members),
            span: range(span),
        }
    }
}

/// JSON-shaped literal parser for `const` initializers.
fn literal_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Literal, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|lit| {
        let scalar = select! {
            Token::String(s) => LiteralKind::String(s),
            Token::Number(n) => LiteralKind::Number(n),
            Token::True => LiteralKind::Bool(true),
            Token::False => LiteralKind::Bool(false),
            Token::Null => LiteralKind::Null,
        };

        let property = property_name_parser()
            .then_ignore(just(Token::Colon))
            .then(lit.clone())
            .map_with(|((name, name_span), value), e| PropertyAssignment {
                name,
                name_span,
                value,
                span: range(e.span()),
            });

        let object = property
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(LiteralKind::Object);

        let array = lit
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(LiteralKind::Array);

        choice((scalar, object, array))
            .map_with(|kind, e| Literal {
                kind,
                span: range(e.span()),
            })
            .labelled("literal")
    })
}

/// Property names: identifiers, keywords, strings, or numbers.
fn property_name_parser<'tokens, I>(
) -> impl Parser<'tokens, I, (String, Range<usize>), extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    any()
        .try_map(|token: Token, span: Span| match token {
            Token::Ident(name) | Token::String(name) => Ok((name, range(span))),
            Token::Number(n) => Ok((n.to_string(), range(span))),
            other => match other.keyword_text() {
                Some(text) => Ok((text.to_string(), range(span))),
                None => Err(Rich::custom(span, format!("expected property name, found {other}"))),
            },
        })
        .labelled("property name")
}

/// Identifier parser.
fn ident_parser<'tokens, I>(
) -> impl Parser<'tokens, I, String, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::Ident(name) => name }.labelled("identifier")
}

/// String literal parser.
fn string_parser<'tokens, I>(
) -> impl Parser<'tokens, I, String, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! { Token::String(s) => s }.labelled("string")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Module {
        match parse(source) {
            Ok(module) => module,
            Err(errs) => panic!("parse failed: {errs:?}"),
        }
    }

    fn alias_type(source: &str) -> TypeExpr {
        match parse_ok(source).items.into_iter().next() {
            Some(Item::TypeAlias(decl)) => decl.ty,
            other => panic!("expected type alias, got {other:?}"),
        }
    }

    fn interface(source: &str) -> InterfaceDecl {
        match parse_ok(source).items.into_iter().next() {
            Some(Item::Interface(decl)) => decl,
            other => panic!("expected interface, got {other:?}"),
        }
    }

    #[test]
    fn test_imports_and_reexports() {
        let module = parse_ok(
            r#"import { A, B as C } from "./a";
               export { D } from './d';
               export * from "./e";"#,
        );
        assert_eq!(module.items.len(), 3);
        let Item::Import(import) = &module.items[0] else {
            panic!("expected import");
        };
        assert_eq!(import.module, "./a");
        assert_eq!(import.names[1].local(), "C");
        assert!(matches!(&module.items[2], Item::Export(ExportDecl::All { module }) if module == "./e"));
    }

    #[test]
    fn test_interface_members() {
        let decl = interface(
            r#"export interface User<T = string> extends Base<T>, Other {
                readonly id: string;
                "quoted-name"?: number,
                readonly: boolean
                [key: string]: unknown;
            }"#,
        );
        assert_eq!(decl.name, "User");
        assert_eq!(decl.type_params.len(), 1);
        assert_eq!(decl.extends.len(), 2);
        assert_eq!(decl.members.len(), 4);
        let Member::Property(id) = &decl.members[0] else {
            panic!("expected property");
        };
        assert!(id.readonly);
        let Member::Property(quoted) = &decl.members[1] else {
            panic!("expected property");
        };
        assert_eq!(quoted.name, "quoted-name");
        assert!(quoted.optional);
        let Member::Property(named_readonly) = &decl.members[2] else {
            panic!("expected property");
        };
        assert_eq!(named_readonly.name, "readonly");
        assert!(!named_readonly.readonly);
        assert!(matches!(decl.members[3], Member::Index(_)));
    }

    #[test]
    fn test_type_precedence() {
        let ty = alias_type("type X = | 'a' | string[] & B | (C | D)[];");
        assert_eq!(ty.to_string(), "\"a\" | string[] & B | (C | D)[]");
        let TypeExprKind::Union(members) = &ty.kind else {
            panic!("expected union");
        };
        assert_eq!(members.len(), 3);
        assert!(matches!(members[1].kind, TypeExprKind::Intersection(_)));
    }

    #[test]
    fn test_conditional_type() {
        let ty = alias_type("type X<T> = T extends object ? { id: string } & T : never;");
        let TypeExprKind::Conditional {
            check, when_true, ..
        } = &ty.kind
        else {
            panic!("expected conditional type");
        };
        assert_eq!(check.to_string(), "T");
        assert_eq!(when_true.to_string(), "{ id: string; } & T");
    }

    #[test]
    fn test_mapped_type() {
        let ty = alias_type("type M<K, V> = { [P in K]?: V };");
        let TypeExprKind::Mapped {
            param, optional, ..
        } = &ty.kind
        else {
            panic!("expected mapped type");
        };
        assert_eq!(param, "P");
        assert!(*optional);
    }

    #[test]
    fn test_tuple_and_keywords() {
        let ty = alias_type("type T = [string, number?, undefined];");
        assert_eq!(ty.to_string(), "[string, number?, undefined]");
    }

    #[test]
    fn test_const_literal_spans() {
        let source = r#"export const __value: Foo = {"a": [1, true, null]};"#;
        let module = parse_ok(source);
        let Some(Item::Const(decl)) = module.items.first() else {
            panic!("expected const");
        };
        assert_eq!(decl.name, "__value");
        let prop = decl.init.property("a").map(|p| p.name_span.clone());
        assert_eq!(prop, Some(29..32));
        assert_eq!(&source[decl.init.span.clone()], r#"{"a": [1, true, null]}"#);
    }

    #[test]
    fn test_doc_comments_attach_to_next_member() {
        let decl = interface(
            r#"interface P {
                /** @pattern ^\d+$ */
                number: string;
                /** plain description */
                other: string;
                nested: {
                    /** @unique group */
                    id: string;
                };
            }"#,
        );
        let Member::Property(number) = &decl.members[0] else {
            panic!("expected property");
        };
        assert_eq!(number.annotations.len(), 1);
        assert_eq!(number.annotations[0].tag, "pattern");
        assert_eq!(number.annotations[0].text.as_deref(), Some(r"^\d+$"));

        let Member::Property(other) = &decl.members[1] else {
            panic!("expected property");
        };
        assert!(other.annotations.is_empty());

        let Member::Property(nested) = &decl.members[2] else {
            panic!("expected property");
        };
        let Some(TypeExprKind::Object(members)) = nested.ty.as_ref().map(|t| &t.kind) else {
            panic!("expected object type");
        };
        let Member::Property(id) = &members[0] else {
            panic!("expected property");
        };
        assert_eq!(id.annotations[0].text.as_deref(), Some("group"));
    }

    #[test]
    fn test_parse_error_reports_span() {
        let errs = parse("interface { }").unwrap_err();
        assert!(!errs.is_empty());
        assert!(errs.iter().all(|e| e.span.end <= 13));
    }

    #[test]
    fn test_deep_nesting_is_refused() {
        let source = format!(
            "const v = {}1{};",
            "[".repeat(1500),
            "]".repeat(1500)
        );
        let errs = parse(&source).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("nested deeper than"));
    }
}
