//! @uuid: string values must be hyphenated UUIDs, optionally of a given
//! version, and must not repeat for the same tag within a call.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Variant;

use crate::extensions::{Extension, ExtensionContext, ExtensionError};

pub struct Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    All,
    V3,
    V4,
    V5,
}

impl Version {
    fn parse(text: Option<&str>) -> Result<Self, ExtensionError> {
        match text.map(str::trim) {
            None | Some("") | Some("all") => Ok(Version::All),
            Some("3") => Ok(Version::V3),
            Some("4") => Ok(Version::V4),
            Some("5") => Ok(Version::V5),
            Some(other) => Err(ExtensionError::UnknownUuidVersion(other.to_string())),
        }
    }

    fn number(self) -> Option<usize> {
        match self {
            Version::All => None,
            Version::V3 => Some(3),
            Version::V4 => Some(4),
            Version::V5 => Some(5),
        }
    }

    fn accepts(self, text: &str) -> bool {
        if text.len() != 36 {
            return false;
        }
        let Ok(id) = uuid::Uuid::try_parse(text) else {
            return false;
        };
        match self {
            Version::All => true,
            Version::V3 => id.get_version_num() == 3,
            Version::V4 | Version::V5 => {
                Some(id.get_version_num()) == self.number() && id.get_variant() == Variant::RFC4122
            }
        }
    }
}

/// Seen values per tag instance id.
#[derive(Default)]
struct Seen(HashMap<String, HashSet<String>>);

impl Extension for Uuid {
    fn name(&self) -> &str {
        "uuid"
    }

    fn check(
        &self,
        value: &Value,
        text: Option<&str>,
        context: &mut ExtensionContext,
        tag_id: &str,
    ) -> Result<Option<String>, ExtensionError> {
        let Value::String(s) = value else {
            return Ok(None);
        };
        let version = Version::parse(text)?;

        if !version.accepts(s) {
            let suffix = version.number().map(|n| format!(" (v{n})")).unwrap_or_default();
            return Ok(Some(format!("Value {value} is not a valid UUID{suffix}")));
        }

        let seen = context.state::<Seen>().0.entry(tag_id.to_string()).or_default();
        if !seen.insert(s.to_ascii_lowercase()) {
            return Ok(Some(format!("Duplicate UUID {value}")));
        }
        Ok(None)
    }
}
