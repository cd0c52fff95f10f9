//! @unique: a value must not repeat within its group during one call.
//!
//! The group is the tag text when given, so several fields can share one;
//! otherwise it is the tag instance id. Values compare by their canonical
//! JSON text, with object keys sorted, so key order does not matter.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::extensions::{Extension, ExtensionContext, ExtensionError};

pub struct Unique;

#[derive(Default)]
struct Groups(HashMap<String, HashSet<String>>);

impl Extension for Unique {
    fn name(&self) -> &str {
        "unique"
    }

    fn check(
        &self,
        value: &Value,
        text: Option<&str>,
        context: &mut ExtensionContext,
        tag_id: &str,
    ) -> Result<Option<String>, ExtensionError> {
        let group = text.map(str::trim).filter(|g| !g.is_empty());
        let key = group.unwrap_or(tag_id);

        let seen = context.state::<Groups>().0.entry(key.to_string()).or_default();
        if !seen.insert(canonical(value).to_string()) {
            return Ok(Some(format!("Duplicate {} {value}", group.unwrap_or("value"))));
        }
        Ok(None)
    }
}

/// `value` with every object's keys in sorted order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonical(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
