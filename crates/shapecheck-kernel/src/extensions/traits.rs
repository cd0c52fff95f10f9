//! The extension trait and its errors.

use serde_json::Value;
use thiserror::Error;

use super::ExtensionContext;

/// Misconfigured annotations. Raised to the caller, never reported as a
/// diagnostic.
#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("A regular expression pattern is required for extension `@{tag}`")]
    PatternRequired { tag: String },

    #[error("invalid regular expression for extension `@{tag}`: {source}")]
    InvalidPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown UUID version {0:?}; expected 3, 4, 5 or all")]
    UnknownUuidVersion(String),

    #[error("extension `@{tag}` failed: {message}")]
    Failed { tag: String, message: String },
}

/// A validator bound to an annotation tag.
///
/// `check` receives one occurrence of an annotated field: its value, the
/// tag's free text, the context shared by the whole `diagnose` call, and
/// the tag instance id (stable for one tag, whichever occurrence is
/// checked). `Ok(Some(message))` reports a diagnostic at the occurrence.
pub trait Extension: Send + Sync {
    /// Tag name without the `@`.
    fn name(&self) -> &str;

    fn check(
        &self,
        value: &Value,
        text: Option<&str>,
        context: &mut ExtensionContext,
        tag_id: &str,
    ) -> Result<Option<String>, ExtensionError>;
}

/// Adapts a closure to [`Extension`].
pub struct FnExtension<F> {
    name: String,
    check: F,
}

impl<F> FnExtension<F>
where
    F: Fn(&Value, Option<&str>, &mut ExtensionContext, &str) -> Result<Option<String>, ExtensionError>
        + Send
        + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Extension for FnExtension<F>
where
    F: Fn(&Value, Option<&str>, &mut ExtensionContext, &str) -> Result<Option<String>, ExtensionError>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(
        &self,
        value: &Value,
        text: Option<&str>,
        context: &mut ExtensionContext,
        tag_id: &str,
    ) -> Result<Option<String>, ExtensionError> {
        (self.check)(value, text, context, tag_id)
    }
}
