//! Walks the declared type's syntax to find annotated fields and runs their
//! extensions on each occurrence in the value.
//!
//! The walk is over type *syntax*, not evaluated types: every union arm,
//! both conditional branches, and every type argument are visited, because
//! which arm a value satisfies is the structural phase's business. The
//! reference index decides which value properties a field actually types.

use std::collections::HashSet;

use shapecheck_schema::ast::{
    InterfaceDecl, Member, PropertySignature, TypeAliasDecl, TypeExpr, TypeExprKind,
};
use shapecheck_schema::{Definition, FileSet, Location, NodeId, SourceFile};
use tracing::{debug, trace};

use super::{CycleGuard, TypeScope};
use crate::adapter::SchemaAdapter;
use crate::error::ValidatorResult;
use crate::extensions::{ExtensionContext, ExtensionRegistry};
use crate::value_path::{path_of, Diagnostic};

/// Runs extensions for the value currently submitted to an adapter.
pub struct Validator<'s> {
    adapter: &'s SchemaAdapter,
    registry: &'s ExtensionRegistry,
}

impl<'s> Validator<'s> {
    pub fn new(adapter: &'s SchemaAdapter, registry: &'s ExtensionRegistry) -> Self {
        Self { adapter, registry }
    }

    /// Extension diagnostics for the submitted value. The extension context
    /// lives for this call only.
    pub fn validate(&self) -> ValidatorResult<Vec<Diagnostic>> {
        let Some(ty) = self.adapter.program().value_decl().and_then(|d| d.ty.as_ref()) else {
            return Ok(Vec::new());
        };
        let files = self.adapter.file_set()?;
        let mut walk = Walk {
            adapter: self.adapter,
            registry: self.registry,
            files: &files,
            scope: TypeScope::new(),
            guard: CycleGuard::new(),
            dispatched: HashSet::new(),
            context: ExtensionContext::new(),
            diagnostics: Vec::new(),
        };
        walk.type_expr(files.unit(), ty)?;
        debug!(
            diagnostics = walk.diagnostics.len(),
            dispatched = walk.dispatched.len(),
            "extension walk finished"
        );
        Ok(walk.diagnostics)
    }
}

struct Walk<'w, 'a> {
    adapter: &'w SchemaAdapter,
    registry: &'w ExtensionRegistry,
    files: &'a FileSet,
    scope: TypeScope,
    guard: CycleGuard,
    /// (field declaration, occurrence) pairs already checked.
    dispatched: HashSet<(Location, NodeId)>,
    context: ExtensionContext,
    diagnostics: Vec<Diagnostic>,
}

impl<'w, 'a> Walk<'w, 'a> {
    fn type_expr(&mut self, file: &'a SourceFile, expr: &'a TypeExpr) -> ValidatorResult<()> {
        match &expr.kind {
            TypeExprKind::Keyword(_) | TypeExprKind::Literal(_) => Ok(()),
            TypeExprKind::Paren(inner) | TypeExprKind::Array(inner) => self.type_expr(file, inner),
            TypeExprKind::Union(items) | TypeExprKind::Intersection(items) => {
                for item in items {
                    self.type_expr(file, item)?;
                }
                Ok(())
            }
            TypeExprKind::Tuple(elems) => {
                for elem in elems {
                    self.type_expr(file, &elem.ty)?;
                }
                Ok(())
            }
            TypeExprKind::Object(members) => self.members(file, members),
            TypeExprKind::Reference { name, args } => self.reference(file, expr, name, args),
            TypeExprKind::Conditional {
                when_true,
                when_false,
                ..
            } => {
                self.type_expr(file, when_true)?;
                self.type_expr(file, when_false)
            }
            TypeExprKind::Mapped {
                param,
                constraint,
                value,
                ..
            } => {
                self.type_expr(file, constraint)?;
                self.scope.push_frame();
                self.scope.bind(param.as_str());
                let result = self.type_expr(file, value);
                self.scope.pop_frame();
                result
            }
        }
    }

    fn reference(
        &mut self,
        file: &'a SourceFile,
        expr: &'a TypeExpr,
        name: &str,
        args: &'a [TypeExpr],
    ) -> ValidatorResult<()> {
        if args.is_empty() && self.scope.is_bound(name) {
            return Ok(());
        }

        let instantiation = expr.to_string();
        for definition in self.adapter.definitions(self.files, file, name)? {
            let Some(location) = definition.location() else {
                continue;
            };
            if !self.guard.enter(location, &instantiation) {
                trace!(%instantiation, "reference already being walked");
                continue;
            }
            let result = match definition {
                Definition::Interface { file, decl } => self.interface(file, decl),
                Definition::Alias { file, decl } => self.alias(file, decl),
                Definition::Builtin(_) => Ok(()),
            };
            self.guard.exit();
            result?;
        }

        for arg in args {
            self.type_expr(file, arg)?;
        }
        Ok(())
    }

    /// Walk a declaration body in a fresh scope holding its parameters.
    fn in_declaration(
        &mut self,
        params: &'a [shapecheck_schema::ast::TypeParam],
        body: impl FnOnce(&mut Self) -> ValidatorResult<()>,
    ) -> ValidatorResult<()> {
        let scope = TypeScope::with_params(params.iter().map(|p| p.name.as_str()));
        let outer = std::mem::replace(&mut self.scope, scope);
        let result = body(self);
        self.scope = outer;
        result
    }

    fn interface(&mut self, file: &'a SourceFile, decl: &'a InterfaceDecl) -> ValidatorResult<()> {
        self.in_declaration(&decl.type_params, |walk| {
            walk.members(file, &decl.members)?;
            for base in &decl.extends {
                walk.type_expr(file, base)?;
            }
            Ok(())
        })
    }

    fn alias(&mut self, file: &'a SourceFile, decl: &'a TypeAliasDecl) -> ValidatorResult<()> {
        self.in_declaration(&decl.type_params, |walk| walk.type_expr(file, &decl.ty))
    }

    fn members(&mut self, file: &'a SourceFile, members: &'a [Member]) -> ValidatorResult<()> {
        for member in members {
            match member {
                Member::Property(prop) if !prop.name.is_empty() => self.field(file, prop)?,
                Member::Property(_) => {}
                Member::Index(index) => self.type_expr(file, &index.value)?,
            }
        }
        Ok(())
    }

    fn field(&mut self, file: &'a SourceFile, prop: &'a PropertySignature) -> ValidatorResult<()> {
        let bound: Vec<_> = prop
            .annotations
            .iter()
            .filter_map(|ann| Some((ann, self.registry.get(&ann.tag)?)))
            .collect();

        if !bound.is_empty() {
            let decl = Location {
                file: file.id,
                offset: prop.span.start,
            };
            let occurrences = self.adapter.occurrences(decl)?;
            trace!(field = %prop.name, occurrences = occurrences.len(), "annotated field");

            for occurrence in occurrences {
                if !self.dispatched.insert((decl, occurrence.node)) {
                    continue;
                }
                for (annotation, extension) in &bound {
                    let tag_id = format!("{}:{}", file.path.display(), annotation.offset);
                    let reason = extension.check(
                        &occurrence.value,
                        annotation.text.as_deref(),
                        &mut self.context,
                        &tag_id,
                    )?;
                    if let Some(message) = reason {
                        let path = match self.adapter.tree() {
                            Some(tree) => path_of(tree, occurrence.node),
                            None => Default::default(),
                        };
                        self.diagnostics.push(Diagnostic::new(path, message));
                    }
                }
            }
        }

        match &prop.ty {
            Some(ty) => self.type_expr(file, ty),
            None => Ok(()),
        }
    }
}
