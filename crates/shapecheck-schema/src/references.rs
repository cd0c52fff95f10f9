//! Which property assignments in the value realize which declared fields.
//!
//! Built once per unit content by walking the value literal alongside its
//! contextual type. Union arms are all considered, so a field declared in
//! several arms maps to every assignment it could type.

use std::collections::HashMap;

use crate::ast::{Literal, LiteralKind};
use crate::checker::MAX_CHECK_DEPTH;
use crate::error::{SchemaError, SchemaResult};
use crate::program::{FileId, Location};
use crate::types::{Evaluator, Type};
use crate::values::MAX_VALUE_DEPTH;

#[derive(Debug, Default, Clone)]
pub struct ReferenceIndex {
    map: HashMap<Location, Vec<Location>>,
}

impl ReferenceIndex {
    pub fn build<'a>(
        eval: &Evaluator<'a>,
        unit: FileId,
        value: &Literal,
        ty: &Type<'a>,
    ) -> SchemaResult<Self> {
        let mut index = Self::default();
        index.bind(eval, unit, value, ty, 0)?;
        for found in index.map.values_mut() {
            found.sort();
            found.dedup();
        }
        Ok(index)
    }

    /// Assignment positions for the field declared at `decl`, in source order.
    pub fn implementations(&self, decl: Location) -> &[Location] {
        self.map.get(&decl).map(Vec::as_slice).unwrap_or(&[])
    }

    fn bind<'a>(
        &mut self,
        eval: &Evaluator<'a>,
        unit: FileId,
        value: &Literal,
        ty: &Type<'a>,
        depth: usize,
    ) -> SchemaResult<()> {
        if depth >= MAX_CHECK_DEPTH {
            return Err(SchemaError::ValueTooDeep {
                limit: MAX_VALUE_DEPTH,
            });
        }
        match (ty, &value.kind) {
            (Type::Union(members) | Type::Intersection(members), _) => {
                for member in members {
                    self.bind(eval, unit, value, member, depth + 1)?;
                }
            }
            (Type::Shape(shape), LiteralKind::Object(props)) => {
                for assigned in props {
                    let field_ty = match (shape.prop(&assigned.name), &shape.index) {
                        (Some(prop), _) => {
                            if let Some(decl) = prop.decl {
                                self.map.entry(decl).or_default().push(Location {
                                    file: unit,
                                    offset: assigned.name_span.start,
                                });
                            }
                            eval.eval_opt(prop.ty.as_ref())?
                        }
                        (None, Some(index)) => eval.eval(index)?,
                        (None, None) => continue,
                    };
                    self.bind(eval, unit, &assigned.value, &field_ty, depth + 1)?;
                }
            }
            (Type::Array(elem), LiteralKind::Array(items)) => {
                let elem = eval.eval(elem)?;
                for item in items {
                    self.bind(eval, unit, item, &elem, depth + 1)?;
                }
            }
            (Type::Tuple(slots), LiteralKind::Array(items)) => {
                for (item, slot) in items.iter().zip(slots) {
                    let slot_ty = eval.eval(&slot.ty)?;
                    self.bind(eval, unit, item, &slot_ty, depth + 1)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::program::{CompilerOptions, Program, Project};
    use std::sync::Arc;

    fn program(schema: &str, unit: &str) -> (tempfile::TempDir, Program) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join("schema.ts"), schema).unwrap_or_else(|e| panic!("write: {e}"));
        let project = Arc::new(Project::new(CompilerOptions::new(dir.path())));
        let mut program = Program::new(project);
        program.update_unit(unit.to_string());
        (dir, program)
    }

    fn field_decl(program: &Program, name: &str) -> crate::program::Location {
        let files = program.file_set().unwrap_or_else(|e| panic!("files: {e}"));
        let schema = files
            .module(program.unit_id(), "./schema")
            .unwrap_or_else(|| panic!("schema not loaded"));
        let offset = schema
            .text
            .find(&format!("{name}:"))
            .unwrap_or_else(|| panic!("no field {name}"));
        crate::program::Location {
            file: schema.id,
            offset,
        }
    }

    #[test]
    fn test_fields_in_array_elements() {
        let unit = r#"import { List } from "./schema";
export const __value: List = {"items": [{"id": "a"}, {"id": "b"}]};"#;
        let (_dir, program) = program(
            "export interface Item { id: string } export interface List { items: Item[] }",
            unit,
        );
        let decl = field_decl(&program, "id");
        let found = program
            .implementations_of(decl)
            .unwrap_or_else(|e| panic!("implementations: {e}"));
        let texts: Vec<&str> = found.iter().map(|l| &unit[l.offset..l.offset + 4]).collect();
        assert_eq!(texts, vec!["\"id\"", "\"id\""]);
        assert!(found[0].offset < found[1].offset);
    }

    #[test]
    fn test_unreferenced_field_has_no_implementations() {
        let unit = r#"import { Opt } from "./schema";
export const __value: Opt = {};"#;
        let (_dir, program) = program("export interface Opt { maybe?: string }", unit);
        let decl = field_decl(&program, "maybe");
        assert!(program.implementations_of(decl).is_ok_and(|f| f.is_empty()));
    }

    #[test]
    fn test_intersection_members_bind() {
        let unit = r#"import { Both } from "./schema";
export const __value: Both = {"left": 1, "right": 2};"#;
        let (_dir, program) = program(
            "export type Both = { left: number } & { right: number };",
            unit,
        );
        for name in ["left", "right"] {
            let decl = field_decl(&program, name);
            assert!(program.implementations_of(decl).is_ok_and(|f| f.len() == 1));
        }
    }

    #[test]
    fn test_deep_value_is_an_error() {
        let depth = 1500;
        let unit = format!(
            "import {{ Node }} from \"./schema\";\nexport const __value: Node = {}{{}}{};",
            "{\"next\": ".repeat(depth),
            "}".repeat(depth)
        );
        let (_dir, program) = program("export interface Node { next?: Node }", &unit);
        let decl = crate::program::Location {
            file: crate::program::FileId::default(),
            offset: 0,
        };
        assert!(matches!(
            program.implementations_of(decl),
            Err(crate::error::SchemaError::ValueTooDeep { .. })
        ));
    }

    #[test]
    fn test_bind_depth_is_bounded() {
        let unit = r#"import { Node } from "./schema";
export const __value: Node = {"next": {}};"#;
        let (_dir, program) = program("export interface Node { next?: Node }", unit);
        let files = program.file_set().unwrap_or_else(|e| panic!("files: {e}"));
        let decl = program.value_decl().unwrap_or_else(|| panic!("no value"));
        let eval = crate::types::Evaluator::new(&files);
        let ty = decl.ty.as_ref().unwrap_or_else(|| panic!("untyped"));
        let target = eval
            .eval_expr(files.unit(), ty, &Default::default())
            .unwrap_or_else(|e| panic!("eval: {e}"));

        let mut index = super::ReferenceIndex::default();
        assert!(index.bind(&eval, program.unit_id(), &decl.init, &target, 0).is_ok());
        let mut index = super::ReferenceIndex::default();
        let bounded = index.bind(&eval, program.unit_id(), &decl.init, &target, super::MAX_CHECK_DEPTH - 1);
        assert!(matches!(bounded, Err(crate::error::SchemaError::ValueTooDeep { .. })));
    }
}
