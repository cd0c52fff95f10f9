//! Name resolution.
//!
//! A name is looked up in the declaring file, then through its imports
//! (following re-exports), then in the global files, then among the
//! builtin generics. Every top-level declaration of a file counts as
//! exported.

use std::collections::HashSet;

use crate::ast::{InterfaceDecl, Item, TypeAliasDecl};
use crate::error::{SchemaError, SchemaResult};
use crate::program::{FileId, FileSet, Location, SourceFile};

/// Generic types provided without a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Array,
    ReadonlyArray,
    Record,
    Partial,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Array" => Some(Builtin::Array),
            "ReadonlyArray" => Some(Builtin::ReadonlyArray),
            "Record" => Some(Builtin::Record),
            "Partial" => Some(Builtin::Partial),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::Record => 2,
            _ => 1,
        }
    }
}

/// What a type name refers to.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'a> {
    Interface {
        file: &'a SourceFile,
        decl: &'a InterfaceDecl,
    },
    Alias {
        file: &'a SourceFile,
        decl: &'a TypeAliasDecl,
    },
    Builtin(Builtin),
}

impl<'a> Definition<'a> {
    /// Declaration position, the identity used for cycle detection.
    pub fn location(&self) -> Option<Location> {
        match self {
            Definition::Interface { file, decl } => Some(Location {
                file: file.id,
                offset: decl.span.start,
            }),
            Definition::Alias { file, decl } => Some(Location {
                file: file.id,
                offset: decl.span.start,
            }),
            Definition::Builtin(_) => None,
        }
    }
}

/// Resolves type names against a [`FileSet`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    files: &'a FileSet,
}

impl<'a> Resolver<'a> {
    pub fn new(files: &'a FileSet) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &'a FileSet {
        self.files
    }

    /// All definitions `name` refers to from inside `file`. Interfaces may
    /// have several declarations that merge.
    pub fn lookup(&self, file: &'a SourceFile, name: &str) -> SchemaResult<Vec<Definition<'a>>> {
        let local = local_definitions(file, name);
        if !local.is_empty() {
            return Ok(local);
        }

        for item in &file.module.items {
            let Item::Import(import) = item else {
                continue;
            };
            for entry in import.names.iter().filter(|n| n.local() == name) {
                let Some(target) = self.files.module(file.id, &import.module) else {
                    continue;
                };
                let found = self.exported(target, &entry.name, &mut HashSet::new());
                if !found.is_empty() {
                    return Ok(found);
                }
            }
        }

        let global: Vec<_> = self
            .files
            .globals()
            .filter(|g| g.id != file.id)
            .flat_map(|g| local_definitions(g, name))
            .collect();
        if !global.is_empty() {
            return Ok(global);
        }

        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(vec![Definition::Builtin(builtin)]);
        }

        Err(SchemaError::UnresolvedName {
            name: name.to_string(),
            path: file.path.clone(),
        })
    }

    fn exported(
        &self,
        file: &'a SourceFile,
        name: &str,
        visited: &mut HashSet<FileId>,
    ) -> Vec<Definition<'a>> {
        if !visited.insert(file.id) {
            return Vec::new();
        }
        let local = local_definitions(file, name);
        if !local.is_empty() {
            return local;
        }

        for item in &file.module.items {
            let Item::Export(export) = item else {
                continue;
            };
            let Some(target) = self.files.module(file.id, export.module()) else {
                continue;
            };
            let found = match export {
                crate::ast::ExportDecl::Named { names, .. } => names
                    .iter()
                    .filter(|n| n.local() == name)
                    .flat_map(|n| self.exported(target, &n.name, visited))
                    .collect(),
                crate::ast::ExportDecl::All { .. } => self.exported(target, name, visited),
            };
            if !found.is_empty() {
                return found;
            }
        }

        Vec::new()
    }
}

fn local_definitions<'a>(file: &'a SourceFile, name: &str) -> Vec<Definition<'a>> {
    file.module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Interface(decl) if decl.name == name => Some(Definition::Interface { file, decl }),
            Item::TypeAlias(decl) if decl.name == name => Some(Definition::Alias { file, decl }),
            _ => None,
        })
        .collect()
}
