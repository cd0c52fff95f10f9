//! @pattern: string values must match a regular expression.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::extensions::{Extension, ExtensionContext, ExtensionError};

pub struct Pattern;

/// Compiled expressions, reused across occurrences within a call.
#[derive(Default)]
struct Compiled(HashMap<String, Regex>);

impl Extension for Pattern {
    fn name(&self) -> &str {
        "pattern"
    }

    fn check(
        &self,
        value: &Value,
        text: Option<&str>,
        context: &mut ExtensionContext,
        _tag_id: &str,
    ) -> Result<Option<String>, ExtensionError> {
        let Value::String(s) = value else {
            return Ok(None);
        };
        let Some(pattern) = text.map(str::trim).filter(|p| !p.is_empty()) else {
            return Err(ExtensionError::PatternRequired {
                tag: self.name().to_string(),
            });
        };

        let regex = match context.state::<Compiled>().0.entry(pattern.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let regex = Regex::new(pattern).map_err(|source| ExtensionError::InvalidPattern {
                    tag: self.name().to_string(),
                    source,
                })?;
                entry.insert(regex)
            }
        };

        if regex.is_match(s) {
            Ok(None)
        } else {
            Ok(Some(format!("Value {value} does not match pattern {pattern}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn run(value: Value, pattern: Option<&str>) -> Result<Option<String>, ExtensionError> {
        Pattern.check(&value, pattern, &mut ExtensionContext::new(), "schema.ts:0")
    }

    #[rstest]
    #[case::mention(json!("Yoha @you."), r"@\w+")]
    #[case::digits(json!("123"), r"^\d+$")]
    #[case::non_string(json!(123), r"^\d+$")]
    fn test_accepts(#[case] value: Value, #[case] pattern: &str) {
        assert!(matches!(run(value, Some(pattern)), Ok(None)));
    }

    #[test]
    fn test_mismatch_message() {
        let message = run(json!("x123"), Some(r"^\d+$")).ok().flatten();
        assert_eq!(
            message.as_deref(),
            Some(r#"Value "x123" does not match pattern ^\d+$"#)
        );
    }

    #[test]
    fn test_missing_pattern_is_an_error() {
        let err = run(json!(""), None).err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("A regular expression pattern is required for extension `@pattern`")
        );
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(matches!(
            run(json!("a"), Some("[")),
            Err(ExtensionError::InvalidPattern { .. })
        ));
    }
}
