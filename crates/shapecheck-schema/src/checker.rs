//! Structural checking of a value literal against a type.
//!
//! Produces positioned messages worded like the TypeScript compiler's, so
//! existing schema authors recognize them. Positions are byte offsets in the
//! unit; the caller maps them back to value paths.

use std::cell::Cell;
use std::rc::Rc;

use crate::ast::{property_name, quote, Literal, LiteralKind, LiteralType, PropertyAssignment};
use crate::error::{SchemaError, SchemaResult};
use crate::types::{merge_shape, Evaluator, Shape, Slot, Type};
use crate::values::MAX_VALUE_DEPTH;

/// A structural problem at a byte offset of the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiagnostic {
    pub offset: usize,
    pub message: String,
}

/// Missing properties listed before the message switches to "and N more."
const MAX_LISTED_MISSING: usize = 4;

/// Nested `check_into` frames allowed. Union and intersection arms add
/// frames without descending into the value, hence the headroom.
pub const MAX_CHECK_DEPTH: usize = 4 * MAX_VALUE_DEPTH;

pub struct Checker<'e, 'a> {
    eval: &'e Evaluator<'a>,
    depth: Cell<usize>,
}

impl<'e, 'a> Checker<'e, 'a> {
    pub fn new(eval: &'e Evaluator<'a>) -> Self {
        Self {
            eval,
            depth: Cell::new(0),
        }
    }

    /// Check `value` against `ty`, reporting root-level problems at `at`.
    pub fn check(&self, value: &Literal, ty: &Type<'a>, at: usize) -> SchemaResult<Vec<RawDiagnostic>> {
        let mut out = Vec::new();
        self.check_into(value, ty, at, &mut out)?;
        Ok(out)
    }

    fn accepts(&self, value: &Literal, ty: &Type<'a>) -> SchemaResult<bool> {
        Ok(self.check(value, ty, value.span.start)?.is_empty())
    }

    fn check_into(
        &self,
        value: &Literal,
        ty: &Type<'a>,
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        let depth = self.depth.get();
        if depth >= MAX_CHECK_DEPTH {
            return Err(SchemaError::ValueTooDeep {
                limit: MAX_VALUE_DEPTH,
            });
        }
        self.depth.set(depth + 1);
        let result = self.check_type(value, ty, at, out);
        self.depth.set(depth);
        result
    }

    fn check_type(
        &self,
        value: &Literal,
        ty: &Type<'a>,
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        match ty {
            Type::Any | Type::Unknown => Ok(()),
            Type::Union(members) => self.check_union(value, ty, members, at, out),
            Type::Intersection(members) => self.check_intersection(value, ty, members, at, out),
            Type::Array(elem) => match &value.kind {
                LiteralKind::Array(items) => {
                    let elem = self.eval.eval(elem)?;
                    for item in items {
                        self.check_into(item, &elem, item.span.start, out)?;
                    }
                    Ok(())
                }
                _ => self.mismatch(value, ty, at, out),
            },
            Type::Tuple(slots) => match &value.kind {
                LiteralKind::Array(items) => self.check_tuple(items, slots, at, out),
                _ => self.mismatch(value, ty, at, out),
            },
            Type::Shape(shape) => match &value.kind {
                LiteralKind::Object(props) => self.check_object(value, props, shape, ty, at, out),
                _ => self.mismatch(value, ty, at, out),
            },
            Type::Object => match &value.kind {
                LiteralKind::Object(_) | LiteralKind::Array(_) => Ok(()),
                _ => self.mismatch(value, ty, at, out),
            },
            _ => {
                if primitive_accepts(value, ty) {
                    Ok(())
                } else {
                    self.mismatch(value, ty, at, out)
                }
            }
        }
    }

    fn mismatch(
        &self,
        value: &Literal,
        ty: &Type<'a>,
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        out.push(RawDiagnostic {
            offset: at,
            message: format!(
                "Type '{}' is not assignable to type '{ty}'.",
                self.source_text(value, Some(ty))?
            ),
        });
        Ok(())
    }

    fn check_union(
        &self,
        value: &Literal,
        ty: &Type<'a>,
        members: &[Type<'a>],
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        for member in members {
            if self.accepts(value, member)? {
                return Ok(());
            }
        }

        // Object and array literals are elaborated against the one member
        // they were evidently meant for; primitives report the whole union.
        let chosen = match &value.kind {
            LiteralKind::Object(props) => {
                let candidates: Vec<&Type<'a>> = members
                    .iter()
                    .filter(|m| matches!(m, Type::Object) || !m.shapes().is_empty())
                    .collect();
                if candidates.len() == 1 {
                    Some(candidates[0])
                } else {
                    self.discriminate(props, &candidates)?
                }
            }
            LiteralKind::Array(_) => {
                let candidates: Vec<&Type<'a>> = members
                    .iter()
                    .filter(|m| matches!(m, Type::Array(_) | Type::Tuple(_)))
                    .collect();
                (candidates.len() == 1).then(|| candidates[0])
            }
            _ => None,
        };

        match chosen {
            Some(member) => self.check_into(value, member, at, out),
            None => self.mismatch(value, ty, at, out),
        }
    }

    /// The single candidate whose literal-typed properties all match the
    /// value, if exactly one does.
    fn discriminate<'c>(
        &self,
        props: &[PropertyAssignment],
        candidates: &[&'c Type<'a>],
    ) -> SchemaResult<Option<&'c Type<'a>>> {
        let mut matching = Vec::new();
        for &candidate in candidates {
            let mut discriminants = 0;
            let mut all_match = true;
            for shape in candidate.shapes() {
                for prop in &shape.props {
                    let Some(assigned) = props.iter().find(|p| p.name == prop.name) else {
                        continue;
                    };
                    let prop_ty = self.eval.eval_opt(prop.ty.as_ref())?;
                    if !prop_ty.members().iter().all(|m| matches!(m, Type::Literal(_))) {
                        continue;
                    }
                    discriminants += 1;
                    if !primitive_accepts(&assigned.value, &prop_ty) {
                        all_match = false;
                    }
                }
            }
            if discriminants > 0 && all_match {
                matching.push(candidate);
            }
        }
        Ok(if matching.len() == 1 {
            Some(matching[0])
        } else {
            None
        })
    }

    fn check_intersection(
        &self,
        value: &Literal,
        ty: &Type<'a>,
        members: &[Type<'a>],
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        let shapes = ty.shapes();
        if let (LiteralKind::Object(props), false) = (&value.kind, shapes.is_empty()) {
            let mut merged = Shape {
                label: ty.to_string(),
                props: Vec::new(),
                index: None,
            };
            for shape in &shapes {
                merge_shape(&mut merged, shape);
            }
            let merged = Rc::new(merged);
            self.check_object(value, props, &merged, ty, at, out)?;
            // A property declared by several members must satisfy each.
            for shape in &shapes {
                for prop in &shape.props {
                    let first = merged.prop(&prop.name).and_then(|p| p.decl);
                    if first == prop.decl {
                        continue;
                    }
                    if let Some(assigned) = props.iter().find(|p| p.name == prop.name) {
                        let prop_ty = self.eval.eval_opt(prop.ty.as_ref())?;
                        self.check_into(&assigned.value, &prop_ty, assigned.name_span.start, out)?;
                    }
                }
            }
            return Ok(());
        }

        for member in members {
            self.check_into(value, member, at, out)?;
        }
        Ok(())
    }

    fn check_tuple(
        &self,
        items: &[Literal],
        slots: &[Slot<'a>],
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        let required = slots.iter().filter(|s| !s.optional).count();
        if items.len() > slots.len() {
            out.push(RawDiagnostic {
                offset: at,
                message: format!(
                    "Source has {} element(s) but target allows only {}.",
                    items.len(),
                    slots.len()
                ),
            });
            return Ok(());
        }
        if items.len() < required {
            out.push(RawDiagnostic {
                offset: at,
                message: format!(
                    "Source has {} element(s) but target requires {}.",
                    items.len(),
                    required
                ),
            });
            return Ok(());
        }
        for (item, slot) in items.iter().zip(slots) {
            let slot_ty = self.eval.eval(&slot.ty)?;
            self.check_into(item, &slot_ty, item.span.start, out)?;
        }
        Ok(())
    }

    fn check_object(
        &self,
        value: &Literal,
        props: &[PropertyAssignment],
        shape: &Shape<'a>,
        ty: &Type<'a>,
        at: usize,
        out: &mut Vec<RawDiagnostic>,
    ) -> SchemaResult<()> {
        if shape.index.is_none() {
            if let Some(excess) = props.iter().find(|p| shape.prop(&p.name).is_none()) {
                out.push(RawDiagnostic {
                    offset: excess.name_span.start,
                    message: format!(
                        "Object literal may only specify known properties, and '{}' does not exist in type '{}'.",
                        quote(&excess.name),
                        shape.label
                    ),
                });
                return Ok(());
            }
        }

        let missing: Vec<&str> = shape
            .props
            .iter()
            .filter(|p| !p.optional && !props.iter().any(|a| a.name == p.name))
            .map(|p| p.name.as_str())
            .collect();
        if !missing.is_empty() {
            let source = self.source_text(value, Some(ty))?;
            let message = if missing.len() == 1 {
                format!(
                    "Property '{}' is missing in type '{source}' but required in type '{}'.",
                    missing[0], shape.label
                )
            } else {
                let mut listed = missing
                    .iter()
                    .take(MAX_LISTED_MISSING)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ");
                if missing.len() > MAX_LISTED_MISSING {
                    listed.push_str(&format!(", and {} more.", missing.len() - MAX_LISTED_MISSING));
                }
                format!(
                    "Type '{source}' is missing the following properties from type '{}': {listed}",
                    shape.label
                )
            };
            out.push(RawDiagnostic {
                offset: at,
                message,
            });
            return Ok(());
        }

        for assigned in props {
            let target = match (shape.prop(&assigned.name), &shape.index) {
                (Some(prop), _) => self.eval.eval_opt(prop.ty.as_ref())?,
                (None, Some(index)) => self.eval.eval(index)?,
                (None, None) => continue,
            };
            self.check_into(&assigned.value, &target, assigned.name_span.start, out)?;
        }
        Ok(())
    }

    /// How a value prints as the source side of a message. Literal texts
    /// are kept when the target contains literal types.
    fn source_text(&self, value: &Literal, target: Option<&Type<'a>>) -> SchemaResult<String> {
        let literal = target.is_some_and(Type::has_literals);
        Ok(match &value.kind {
            LiteralKind::String(s) if literal => quote(s),
            LiteralKind::String(_) => "string".to_string(),
            LiteralKind::Number(n) if literal => n.to_string(),
            LiteralKind::Number(_) => "number".to_string(),
            LiteralKind::Bool(b) if literal => b.to_string(),
            LiteralKind::Bool(_) => "boolean".to_string(),
            LiteralKind::Null => "null".to_string(),
            LiteralKind::Array(items) => {
                let elem = match target {
                    Some(Type::Array(elem)) => Some(self.eval.eval(elem)?),
                    _ => None,
                };
                let mut texts: Vec<String> = Vec::new();
                for item in items {
                    let text = self.source_text(item, elem.as_ref())?;
                    if !texts.contains(&text) {
                        texts.push(text);
                    }
                }
                match texts.len() {
                    0 => "never[]".to_string(),
                    1 => format!("{}[]", texts[0]),
                    _ => format!("({})[]", texts.join(" | ")),
                }
            }
            LiteralKind::Object(props) => {
                if props.is_empty() {
                    return Ok("{}".to_string());
                }
                let shapes = target.map(Type::shapes).unwrap_or_default();
                let mut text = String::from("{ ");
                for assigned in props {
                    let prop_ty = match shapes.iter().find_map(|s| s.prop(&assigned.name)) {
                        Some(prop) => Some(self.eval.eval_opt(prop.ty.as_ref())?),
                        None => None,
                    };
                    text.push_str(&property_name(&assigned.name));
                    text.push_str(": ");
                    text.push_str(&self.source_text(&assigned.value, prop_ty.as_ref())?);
                    text.push_str("; ");
                }
                text.push('}');
                text
            }
        })
    }
}

fn primitive_accepts(value: &Literal, ty: &Type<'_>) -> bool {
    match (&value.kind, ty) {
        (_, Type::Any | Type::Unknown) => true,
        (_, Type::Union(members)) => members.iter().any(|m| primitive_accepts(value, m)),
        (LiteralKind::String(_), Type::String)
        | (LiteralKind::Number(_), Type::Number)
        | (LiteralKind::Bool(_), Type::Boolean)
        | (LiteralKind::Null, Type::Null) => true,
        (LiteralKind::String(s), Type::Literal(LiteralType::String(l))) => s == l,
        (LiteralKind::Number(n), Type::Literal(LiteralType::Number(l))) => n == l,
        (LiteralKind::Bool(b), Type::Literal(LiteralType::Bool(l))) => b == l,
        _ => false,
    }
}
