//! Validator configuration.
//!
//! Options come from code, or from a `shapecheck.toml` in the project
//! directory:
//!
//! ```toml
//! # Files loaded as global declarations, relative to the project.
//! types = ["./index"]
//! ```
//!
//! Extensions can only be registered from code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shapecheck_schema::CompilerOptions;

use crate::error::{ValidatorError, ValidatorResult};
use crate::extensions::{ExtensionContext, ExtensionError, ExtensionRegistry};

/// File name looked up by [`ValidatorOptions::load`].
pub const CONFIG_FILE: &str = "shapecheck.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorOptions {
    /// Project root. Defaults to the current directory.
    pub project: Option<PathBuf>,
    /// Global declaration files, relative to the project root.
    pub types: Vec<PathBuf>,
    /// Caller-supplied extensions; these override built-ins of the same name.
    #[serde(skip)]
    pub extensions: ExtensionRegistry,
}

impl ValidatorOptions {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    pub fn with_types<P: Into<PathBuf>>(mut self, types: impl IntoIterator<Item = P>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Register a closure extension under `tag`.
    pub fn with_extension<F>(mut self, tag: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, Option<&str>, &mut ExtensionContext, &str) -> Result<Option<String>, ExtensionError>
            + Send
            + Sync
            + 'static,
    {
        self.extensions.register_fn(tag, check);
        self
    }

    /// Parse options from TOML text. A relative `project` is taken
    /// relative to `base`.
    pub fn from_toml_str(text: &str, base: &Path, source: &Path) -> ValidatorResult<Self> {
        let mut options: Self = toml::from_str(text).map_err(|e| ValidatorError::Config {
            path: source.to_path_buf(),
            message: e.message().to_string(),
        })?;
        options.project = Some(match options.project.take() {
            Some(project) if project.is_relative() => base.join(project),
            Some(project) => project,
            None => base.to_path_buf(),
        });
        Ok(options)
    }

    /// Options for `project`, read from its `shapecheck.toml` when present.
    pub fn load(project: &Path) -> ValidatorResult<Self> {
        let path = project.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::new(project));
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ValidatorError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text, project, &path)
    }

    /// Canonical project root.
    pub fn project_root(&self) -> ValidatorResult<PathBuf> {
        let root = match &self.project {
            Some(project) => project.clone(),
            None => std::env::current_dir().map_err(|e| ValidatorError::Config {
                path: PathBuf::from("."),
                message: e.to_string(),
            })?,
        };
        std::fs::canonicalize(&root).map_err(|e| ValidatorError::Config {
            path: root,
            message: e.to_string(),
        })
    }

    /// Identity of the project these options describe. Sessions with equal
    /// keys share one parsed file cache.
    pub fn key(&self) -> ValidatorResult<ConfigKey> {
        Ok(ConfigKey {
            root: self.project_root()?,
            types: self.types.clone(),
        })
    }
}

/// Project identity: canonical root plus global type files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    pub root: PathBuf,
    pub types: Vec<PathBuf>,
}

impl ConfigKey {
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            root: self.root.clone(),
            types: self.types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_file_uses_directory() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let options = ValidatorOptions::load(dir.path()).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(options.project.as_deref(), Some(dir.path()));
        assert!(options.types.is_empty());
    }

    #[test]
    fn test_load_reads_types() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(CONFIG_FILE), "types = [\"./index\"]\n")
            .unwrap_or_else(|e| panic!("write: {e}"));
        let options = ValidatorOptions::load(dir.path()).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(options.types, vec![PathBuf::from("./index")]);
        let key = options.key().unwrap_or_else(|e| panic!("key: {e}"));
        assert_eq!(key.compiler_options().types, vec![PathBuf::from("./index")]);
    }

    #[test]
    fn test_relative_project_is_resolved_against_base() {
        let options = ValidatorOptions::from_toml_str(
            "project = \"schemas\"",
            Path::new("/srv/app"),
            Path::new("/srv/app/shapecheck.toml"),
        )
        .unwrap_or_else(|e| panic!("parse: {e}"));
        assert_eq!(options.project, Some(PathBuf::from("/srv/app/schemas")));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = ValidatorOptions::from_toml_str(
            "typos = []",
            Path::new("/srv"),
            Path::new("/srv/shapecheck.toml"),
        );
        assert!(matches!(err, Err(ValidatorError::Config { .. })));
    }

    #[test]
    fn test_equal_projects_share_a_key() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let a = ValidatorOptions::new(dir.path()).key().ok();
        let b = ValidatorOptions::new(dir.path().join(".")).key().ok();
        assert!(a.is_some());
        assert_eq!(a, b);
    }
}
