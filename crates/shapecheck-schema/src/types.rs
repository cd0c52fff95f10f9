//! Semantic types.
//!
//! Type expressions are evaluated on demand. Object members, array elements
//! and tuple slots stay unevaluated ([`Thunk`]) until something looks at
//! them, so recursive declarations like `type T = { child?: T }` evaluate in
//! constant work per level.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{Keyword, LiteralType, Member, TypeExpr, TypeExprKind, TypeParam};
use crate::error::{SchemaError, SchemaResult};
use crate::program::{FileSet, Location, SourceFile};
use crate::resolve::{Builtin, Definition, Resolver};

/// Eager evaluation chains deeper than this are reported as errors.
const MAX_DEPTH: usize = 64;
/// Structural comparison gives the benefit of the doubt past this depth.
const MAX_COMPARE_DEPTH: usize = 16;

/// Type parameter bindings.
#[derive(Clone, Default)]
pub struct Env<'a>(Rc<HashMap<String, Binding<'a>>>);

#[derive(Clone)]
pub enum Binding<'a> {
    Thunk(Thunk<'a>),
    Type(Type<'a>),
}

impl<'a> Env<'a> {
    pub fn get(&self, name: &str) -> Option<&Binding<'a>> {
        self.0.get(name)
    }

    pub fn with(&self, bindings: impl IntoIterator<Item = (String, Binding<'a>)>) -> Self {
        let mut map = (*self.0).clone();
        map.extend(bindings);
        Env(Rc::new(map))
    }

    /// Rendering of a bound name, for type texts.
    pub fn render(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Binding::Thunk(thunk) => Some(thunk.render()),
            Binding::Type(ty) => Some(ty.to_string()),
        }
    }
}

/// An unevaluated type expression with its bindings.
#[derive(Clone)]
pub struct Thunk<'a> {
    pub file: &'a SourceFile,
    pub expr: &'a TypeExpr,
    pub env: Env<'a>,
}

impl<'a> Thunk<'a> {
    pub fn new(file: &'a SourceFile, expr: &'a TypeExpr, env: Env<'a>) -> Self {
        Self { file, expr, env }
    }

    pub fn render(&self) -> String {
        self.expr.render(&|name| self.env.render(name))
    }

    /// Whether the rendering needs parentheses as an array element.
    fn is_compound(&self) -> bool {
        if self.expr.needs_parens_as_element() {
            return true;
        }
        match self.expr.bare_name().and_then(|name| self.env.get(name)) {
            Some(Binding::Thunk(inner)) => inner.is_compound(),
            Some(Binding::Type(ty)) => matches!(ty, Type::Union(_) | Type::Intersection(_)),
            None => false,
        }
    }
}

/// An object type: a named property list plus an optional string index.
#[derive(Clone)]
pub struct Shape<'a> {
    /// How the type prints in messages.
    pub label: String,
    pub props: Vec<Prop<'a>>,
    pub index: Option<Thunk<'a>>,
}

impl<'a> Shape<'a> {
    pub fn prop(&self, name: &str) -> Option<&Prop<'a>> {
        self.props.iter().find(|p| p.name == name)
    }
}

#[derive(Clone)]
pub struct Prop<'a> {
    pub name: String,
    pub optional: bool,
    /// Declaring member, when the property comes from a declaration.
    pub decl: Option<Location>,
    /// `None` for members declared without a type.
    pub ty: Option<Thunk<'a>>,
}

#[derive(Clone)]
pub struct Slot<'a> {
    pub ty: Thunk<'a>,
    pub optional: bool,
}

#[derive(Clone)]
pub enum Type<'a> {
    Any,
    Unknown,
    Never,
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Object,
    Literal(LiteralType),
    Union(Vec<Type<'a>>),
    Intersection(Vec<Type<'a>>),
    Array(Thunk<'a>),
    Tuple(Vec<Slot<'a>>),
    Shape(Rc<Shape<'a>>),
}

impl<'a> Type<'a> {
    /// Normalized union: nested unions flattened, `never` dropped,
    /// duplicates removed, `any`/`unknown` absorbing.
    pub fn union(members: Vec<Type<'a>>) -> Type<'a> {
        let mut flat: Vec<Type<'a>> = Vec::new();
        for member in members {
            let parts = match member {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                match part {
                    Type::Never => {}
                    Type::Any => return Type::Any,
                    Type::Unknown => return Type::Unknown,
                    part if flat.iter().any(|seen| seen.same(&part)) => {}
                    part => flat.push(part),
                }
            }
        }
        match flat.len() {
            0 => Type::Never,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// Normalized intersection: nested intersections flattened, `unknown`
    /// dropped, `never` absorbing.
    pub fn intersection(members: Vec<Type<'a>>) -> Type<'a> {
        let mut flat: Vec<Type<'a>> = Vec::new();
        for member in members {
            let parts = match member {
                Type::Intersection(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                match part {
                    Type::Never => return Type::Never,
                    Type::Unknown => {}
                    part => flat.push(part),
                }
            }
        }
        match flat.len() {
            0 => Type::Unknown,
            1 => flat.remove(0),
            _ => Type::Intersection(flat),
        }
    }

    fn same(&self, other: &Type<'a>) -> bool {
        match (self, other) {
            (Type::Literal(a), Type::Literal(b)) => a == b,
            (Type::Shape(a), Type::Shape(b)) => Rc::ptr_eq(a, b),
            (Type::Array(_), _) | (Type::Tuple(_), _) | (Type::Union(_), _) => false,
            (Type::Intersection(_), _) | (Type::Shape(_), _) | (Type::Literal(_), _) => false,
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }

    /// Members of a union, or the type itself.
    pub fn members(&self) -> &[Type<'a>] {
        match self {
            Type::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    /// Object shapes this type is made of: a shape, or an intersection of
    /// shapes. Anything else yields nothing.
    pub fn shapes(&self) -> Vec<Rc<Shape<'a>>> {
        match self {
            Type::Shape(shape) => vec![Rc::clone(shape)],
            Type::Intersection(members) => {
                let mut shapes = Vec::new();
                for member in members {
                    match member {
                        Type::Object | Type::Any => {}
                        other => {
                            let inner = other.shapes();
                            if inner.is_empty() {
                                return Vec::new();
                            }
                            shapes.extend(inner);
                        }
                    }
                }
                shapes
            }
            _ => Vec::new(),
        }
    }

    /// Whether values should print as literals when compared to this type.
    pub fn has_literals(&self) -> bool {
        self.members()
            .iter()
            .any(|m| matches!(m, Type::Literal(_) | Type::Boolean))
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Unknown => f.write_str("unknown"),
            Type::Never => f.write_str("never"),
            Type::String => f.write_str("string"),
            Type::Number => f.write_str("number"),
            Type::Boolean => f.write_str("boolean"),
            Type::Null => f.write_str("null"),
            Type::Undefined => f.write_str("undefined"),
            Type::Object => f.write_str("object"),
            Type::Literal(lit) => write!(f, "{lit}"),
            Type::Union(members) => write_joined(f, members, " | "),
            Type::Intersection(members) => write_joined(f, members, " & "),
            Type::Array(elem) => {
                if elem.is_compound() {
                    write!(f, "({})[]", elem.render())
                } else {
                    write!(f, "{}[]", elem.render())
                }
            }
            Type::Tuple(slots) => {
                f.write_str("[")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&slot.ty.render())?;
                    if slot.optional {
                        f.write_str("?")?;
                    }
                }
                f.write_str("]")
            }
            Type::Shape(shape) => f.write_str(&shape.label),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, members: &[Type<'_>], sep: &str) -> fmt::Result {
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{member}")?;
    }
    Ok(())
}

fn keyword_type<'a>(keyword: Keyword) -> Type<'a> {
    match keyword {
        Keyword::String => Type::String,
        Keyword::Number => Type::Number,
        Keyword::Boolean => Type::Boolean,
        Keyword::Any => Type::Any,
        Keyword::Unknown => Type::Unknown,
        Keyword::Never => Type::Never,
        Keyword::Null => Type::Null,
        Keyword::Undefined => Type::Undefined,
        Keyword::Object => Type::Object,
    }
}

fn names_its_body(body: &TypeExpr) -> bool {
    match &body.kind {
        TypeExprKind::Object(_) | TypeExprKind::Mapped { .. } => true,
        TypeExprKind::Paren(inner) => names_its_body(inner),
        _ => false,
    }
}

fn relabel<'a>(ty: Type<'a>, label: String) -> Type<'a> {
    match ty {
        Type::Shape(shape) => Type::Shape(Rc::new(Shape {
            label,
            props: shape.props.clone(),
            index: shape.index.clone(),
        })),
        other => other,
    }
}

/// Evaluates type expressions over a [`FileSet`].
pub struct Evaluator<'a> {
    resolver: Resolver<'a>,
    depth: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(files: &'a FileSet) -> Self {
        Self {
            resolver: Resolver::new(files),
            depth: Cell::new(0),
        }
    }

    pub fn resolver(&self) -> &Resolver<'a> {
        &self.resolver
    }

    pub fn eval(&self, thunk: &Thunk<'a>) -> SchemaResult<Type<'a>> {
        self.eval_expr(thunk.file, thunk.expr, &thunk.env)
    }

    /// Evaluate an optional member type; a missing type is `any`.
    pub fn eval_opt(&self, thunk: Option<&Thunk<'a>>) -> SchemaResult<Type<'a>> {
        match thunk {
            Some(thunk) => self.eval(thunk),
            None => Ok(Type::Any),
        }
    }

    pub fn eval_expr(
        &self,
        file: &'a SourceFile,
        expr: &'a TypeExpr,
        env: &Env<'a>,
    ) -> SchemaResult<Type<'a>> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return Err(SchemaError::InstantiationTooDeep(
                expr.render(&|name| env.render(name)),
            ));
        }
        self.depth.set(depth + 1);
        let result = self.eval_kind(file, expr, env);
        self.depth.set(depth);
        result
    }

    fn eval_kind(
        &self,
        file: &'a SourceFile,
        expr: &'a TypeExpr,
        env: &Env<'a>,
    ) -> SchemaResult<Type<'a>> {
        match &expr.kind {
            TypeExprKind::Keyword(keyword) => Ok(keyword_type(*keyword)),
            TypeExprKind::Literal(lit) => Ok(Type::Literal(lit.clone())),
            TypeExprKind::Paren(inner) => self.eval_expr(file, inner, env),
            TypeExprKind::Union(items) => {
                let members = items
                    .iter()
                    .map(|item| self.eval_expr(file, item, env))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(Type::union(members))
            }
            TypeExprKind::Intersection(items) => {
                let members = items
                    .iter()
                    .map(|item| self.eval_expr(file, item, env))
                    .collect::<SchemaResult<Vec<_>>>()?;
                Ok(Type::intersection(members))
            }
            TypeExprKind::Array(elem) => Ok(Type::Array(Thunk::new(file, elem, env.clone()))),
            TypeExprKind::Tuple(elems) => Ok(Type::Tuple(
                elems
                    .iter()
                    .map(|elem| Slot {
                        ty: Thunk::new(file, &elem.ty, env.clone()),
                        optional: elem.optional,
                    })
                    .collect(),
            )),
            TypeExprKind::Object(members) => {
                let label = expr.render(&|name| env.render(name));
                let mut shape = Shape {
                    label,
                    props: Vec::new(),
                    index: None,
                };
                add_members(&mut shape, file, members, env);
                Ok(Type::Shape(Rc::new(shape)))
            }
            TypeExprKind::Reference { name, args } => {
                self.eval_reference(file, expr, name, args, env)
            }
            TypeExprKind::Conditional {
                check,
                extends,
                when_true,
                when_false,
            } => self.eval_conditional(file, check, extends, when_true, when_false, env),
            TypeExprKind::Mapped {
                param,
                constraint,
                optional,
                value,
            } => {
                let keys = self.eval_expr(file, constraint, env)?;
                let mut shape = Shape {
                    label: expr.render(&|name| env.render(name)),
                    props: Vec::new(),
                    index: None,
                };
                for key in keys.members() {
                    let bound = env.with([(param.clone(), Binding::Type(key.clone()))]);
                    let thunk = Thunk::new(file, value, bound);
                    match key {
                        Type::Literal(LiteralType::String(name)) => shape.props.push(Prop {
                            name: name.clone(),
                            optional: *optional,
                            decl: None,
                            ty: Some(thunk),
                        }),
                        Type::Literal(LiteralType::Number(n)) => shape.props.push(Prop {
                            name: n.to_string(),
                            optional: *optional,
                            decl: None,
                            ty: Some(thunk),
                        }),
                        Type::String | Type::Number | Type::Any => shape.index = Some(thunk),
                        _ => {}
                    }
                }
                Ok(Type::Shape(Rc::new(shape)))
            }
        }
    }

    fn eval_reference(
        &self,
        file: &'a SourceFile,
        expr: &'a TypeExpr,
        name: &str,
        args: &'a [TypeExpr],
        env: &Env<'a>,
    ) -> SchemaResult<Type<'a>> {
        if args.is_empty() {
            match env.get(name) {
                Some(Binding::Thunk(thunk)) => return self.eval(thunk),
                Some(Binding::Type(ty)) => return Ok(ty.clone()),
                None => {}
            }
        }

        let definitions = self.resolver.lookup(file, name)?;
        let label = expr.render(&|n| env.render(n));
        let args: Vec<Thunk<'a>> = args
            .iter()
            .map(|arg| Thunk::new(file, arg, env.clone()))
            .collect();

        match definitions.first().copied() {
            Some(Definition::Builtin(builtin)) => self.eval_builtin(builtin, name, &args, label),
            Some(Definition::Alias { file, decl }) => {
                let bound = bind_params(name, &decl.type_params, &args, file)?;
                let ty = self.eval_expr(file, &decl.ty, &bound)?;
                // Only anonymous object bodies take the alias name; a
                // conditional or reference body keeps its own label.
                if names_its_body(&decl.ty) {
                    Ok(relabel(ty, label))
                } else {
                    Ok(ty)
                }
            }
            Some(Definition::Interface { .. }) => {
                let mut shape = Shape {
                    label,
                    props: Vec::new(),
                    index: None,
                };
                for definition in definitions.iter().copied() {
                    let Definition::Interface { file, decl } = definition else {
                        continue;
                    };
                    let bound = bind_params(name, &decl.type_params, &args, file)?;
                    add_members(&mut shape, file, &decl.members, &bound);
                    for base in &decl.extends {
                        let base = self.eval_expr(file, base, &bound)?;
                        for inherited in base.shapes() {
                            merge_shape(&mut shape, &inherited);
                        }
                    }
                }
                Ok(Type::Shape(Rc::new(shape)))
            }
            None => Err(SchemaError::UnresolvedName {
                name: name.to_string(),
                path: file.path.clone(),
            }),
        }
    }

    fn eval_builtin(
        &self,
        builtin: Builtin,
        name: &str,
        args: &[Thunk<'a>],
        label: String,
    ) -> SchemaResult<Type<'a>> {
        if args.len() != builtin.arity() {
            return Err(SchemaError::Generic {
                name: name.to_string(),
                expected: builtin.arity(),
            });
        }
        match builtin {
            Builtin::Array | Builtin::ReadonlyArray => Ok(Type::Array(args[0].clone())),
            Builtin::Record => {
                let keys = self.eval(&args[0])?;
                let mut shape = Shape {
                    label,
                    props: Vec::new(),
                    index: None,
                };
                for key in keys.members() {
                    match key {
                        Type::Literal(LiteralType::String(key)) => shape.props.push(Prop {
                            name: key.clone(),
                            optional: false,
                            decl: None,
                            ty: Some(args[1].clone()),
                        }),
                        Type::Literal(LiteralType::Number(n)) => shape.props.push(Prop {
                            name: n.to_string(),
                            optional: false,
                            decl: None,
                            ty: Some(args[1].clone()),
                        }),
                        Type::String | Type::Number | Type::Any => {
                            shape.index = Some(args[1].clone());
                        }
                        _ => {}
                    }
                }
                Ok(Type::Shape(Rc::new(shape)))
            }
            Builtin::Partial => {
                let inner = self.eval(&args[0])?;
                let shapes = inner.shapes();
                if shapes.is_empty() {
                    return Ok(inner);
                }
                let mut shape = Shape {
                    label,
                    props: Vec::new(),
                    index: None,
                };
                for part in &shapes {
                    merge_shape(&mut shape, part);
                }
                for prop in &mut shape.props {
                    prop.optional = true;
                }
                Ok(Type::Shape(Rc::new(shape)))
            }
        }
    }

    fn eval_conditional(
        &self,
        file: &'a SourceFile,
        check: &'a TypeExpr,
        extends: &'a TypeExpr,
        when_true: &'a TypeExpr,
        when_false: &'a TypeExpr,
        env: &Env<'a>,
    ) -> SchemaResult<Type<'a>> {
        // Conditionals over a naked type parameter distribute over unions.
        if let Some(param) = check.bare_name() {
            if let Some(binding) = env.get(param) {
                let checked = match binding {
                    Binding::Thunk(thunk) => self.eval(thunk)?,
                    Binding::Type(ty) => ty.clone(),
                };
                match checked {
                    Type::Union(members) => {
                        let mut results = Vec::with_capacity(members.len());
                        for member in members {
                            let bound = env.with([(param.to_string(), Binding::Type(member))]);
                            results.push(self.select_branch(
                                file, check, extends, when_true, when_false, &bound,
                            )?);
                        }
                        return Ok(Type::union(results));
                    }
                    Type::Never => return Ok(Type::Never),
                    _ => {}
                }
            }
        }
        self.select_branch(file, check, extends, when_true, when_false, env)
    }

    fn select_branch(
        &self,
        file: &'a SourceFile,
        check: &'a TypeExpr,
        extends: &'a TypeExpr,
        when_true: &'a TypeExpr,
        when_false: &'a TypeExpr,
        env: &Env<'a>,
    ) -> SchemaResult<Type<'a>> {
        let checked = self.eval_expr(file, check, env)?;
        let target = self.eval_expr(file, extends, env)?;
        if matches!(checked, Type::Any) {
            let yes = self.eval_expr(file, when_true, env)?;
            let no = self.eval_expr(file, when_false, env)?;
            return Ok(Type::union(vec![yes, no]));
        }
        if self.assignable(&checked, &target)? {
            self.eval_expr(file, when_true, env)
        } else {
            self.eval_expr(file, when_false, env)
        }
    }

    /// Type-level assignability, as used by conditional types.
    pub fn assignable(&self, source: &Type<'a>, target: &Type<'a>) -> SchemaResult<bool> {
        self.assignable_at(source, target, 0)
    }

    fn assignable_at(&self, source: &Type<'a>, target: &Type<'a>, depth: usize) -> SchemaResult<bool> {
        if depth > MAX_COMPARE_DEPTH {
            return Ok(true);
        }
        let next = depth + 1;
        Ok(match (source, target) {
            (_, Type::Any | Type::Unknown) | (Type::Any | Type::Never, _) => true,
            (Type::Union(members), _) => {
                for member in members {
                    if !self.assignable_at(member, target, next)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Type::Boolean, Type::Union(_)) => {
                self.assignable_at(&Type::Literal(LiteralType::Bool(true)), target, next)?
                    && self.assignable_at(&Type::Literal(LiteralType::Bool(false)), target, next)?
            }
            (_, Type::Union(members)) => {
                for member in members {
                    if self.assignable_at(source, member, next)? {
                        return Ok(true);
                    }
                }
                false
            }
            (_, Type::Intersection(members)) => {
                for member in members {
                    if !self.assignable_at(source, member, next)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Type::Intersection(members), _) => {
                let shapes = source.shapes();
                if !shapes.is_empty() && matches!(target, Type::Shape(_)) {
                    let mut merged = Shape {
                        label: source.to_string(),
                        props: Vec::new(),
                        index: None,
                    };
                    for part in &shapes {
                        merge_shape(&mut merged, part);
                    }
                    return self.assignable_at(&Type::Shape(Rc::new(merged)), target, next);
                }
                for member in members {
                    if self.assignable_at(member, target, next)? {
                        return Ok(true);
                    }
                }
                false
            }
            (Type::Literal(lit), target) => match (lit, target) {
                (_, Type::Literal(other)) => lit == other,
                (LiteralType::String(_), Type::String)
                | (LiteralType::Number(_), Type::Number)
                | (LiteralType::Bool(_), Type::Boolean) => true,
                _ => false,
            },
            (Type::Shape(_) | Type::Array(_) | Type::Tuple(_), Type::Object) => true,
            (Type::Array(a), Type::Array(b)) => {
                let a = self.eval(a)?;
                let b = self.eval(b)?;
                self.assignable_at(&a, &b, next)?
            }
            (Type::Tuple(slots), Type::Array(b)) => {
                let b = self.eval(b)?;
                for slot in slots {
                    if !self.assignable_at(&self.eval(&slot.ty)?, &b, next)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                let required = b.iter().filter(|s| !s.optional).count();
                if a.len() > b.len() || a.len() < required {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b) {
                    if !self.assignable_at(&self.eval(&x.ty)?, &self.eval(&y.ty)?, next)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Type::Shape(a), Type::Shape(b)) => {
                for wanted in &b.props {
                    match a.prop(&wanted.name) {
                        Some(have) => {
                            if have.optional && !wanted.optional {
                                return Ok(false);
                            }
                            let have_ty = self.eval_opt(have.ty.as_ref())?;
                            let wanted_ty = self.eval_opt(wanted.ty.as_ref())?;
                            if !self.assignable_at(&have_ty, &wanted_ty, next)? {
                                return Ok(false);
                            }
                        }
                        None if wanted.optional => {}
                        None => return Ok(false),
                    }
                }
                if let Some(index) = &b.index {
                    let index_ty = self.eval(index)?;
                    for have in &a.props {
                        let have_ty = self.eval_opt(have.ty.as_ref())?;
                        if !self.assignable_at(&have_ty, &index_ty, next)? {
                            return Ok(false);
                        }
                    }
                }
                true
            }
            (Type::Array(_) | Type::Tuple(_), Type::Shape(b)) => b.props.iter().all(|p| p.optional),
            (a, b) => {
                !matches!(a, Type::Shape(_) | Type::Array(_) | Type::Tuple(_))
                    && std::mem::discriminant(a) == std::mem::discriminant(b)
            }
        })
    }
}

/// Add declared members to a shape; earlier members of the same name win.
fn add_members<'a>(shape: &mut Shape<'a>, file: &'a SourceFile, members: &'a [Member], env: &Env<'a>) {
    for member in members {
        match member {
            Member::Property(prop) => {
                if shape.prop(&prop.name).is_some() {
                    continue;
                }
                shape.props.push(Prop {
                    name: prop.name.clone(),
                    optional: prop.optional,
                    decl: Some(Location {
                        file: file.id,
                        offset: prop.span.start,
                    }),
                    ty: prop.ty.as_ref().map(|ty| Thunk::new(file, ty, env.clone())),
                });
            }
            Member::Index(index) => {
                shape.index = Some(Thunk::new(file, &index.value, env.clone()));
            }
        }
    }
}

/// Merge another shape's properties into `shape`; existing names win.
pub fn merge_shape<'a>(shape: &mut Shape<'a>, other: &Shape<'a>) {
    for prop in &other.props {
        if shape.prop(&prop.name).is_none() {
            shape.props.push(prop.clone());
        }
    }
    if shape.index.is_none() {
        shape.index = other.index.clone();
    }
}

/// Bind a declaration's type parameters to the arguments of a reference.
/// Missing arguments fall back to defaults, evaluated against the
/// parameters bound before them.
fn bind_params<'a>(
    name: &str,
    params: &'a [TypeParam],
    args: &[Thunk<'a>],
    file: &'a SourceFile,
) -> SchemaResult<Env<'a>> {
    let required = params.iter().take_while(|p| p.default.is_none()).count();
    if args.len() > params.len() || args.len() < required {
        return Err(SchemaError::Generic {
            name: name.to_string(),
            expected: if args.len() > params.len() { params.len() } else { required },
        });
    }

    let mut env = Env::default();
    for (i, param) in params.iter().enumerate() {
        let binding = match (args.get(i), &param.default) {
            (Some(arg), _) => Binding::Thunk(arg.clone()),
            (None, Some(default)) => Binding::Thunk(Thunk::new(file, default, env.clone())),
            (None, None) => Binding::Type(Type::Any),
        };
        env = env.with([(param.name.clone(), binding)]);
    }
    Ok(env)
}
