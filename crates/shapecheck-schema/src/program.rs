//! Projects, programs, and the files they see.
//!
//! A [`Project`] is the shared, thread-safe cache of parsed declaration files
//! under one root. A [`Program`] is one session's view: the project plus a
//! private in-memory unit whose content is replaced wholesale on every
//! update. Anything derived from the unit is dropped with the old content.

use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, trace};

use crate::ast::{ConstDecl, Item, Module};
use crate::checker::{Checker, RawDiagnostic};
use crate::error::{SchemaError, SchemaResult};
use crate::references::ReferenceIndex;
use crate::types::Evaluator;
use crate::values::{ValueTree, MAX_VALUE_DEPTH};
use crate::{lexer, parser};

/// Identifies a source file within a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

/// A position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub file: FileId,
    pub offset: usize,
}

/// A parsed source file.
#[derive(Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub text: String,
    pub module: Module,
}

/// Where schema sources live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerOptions {
    /// Project root; non-relative module specifiers resolve against it.
    pub root: PathBuf,
    /// Files loaded as global declarations, relative to `root`.
    pub types: Vec<PathBuf>,
}

impl CompilerOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            types: Vec::new(),
        }
    }
}

/// Shared cache of parsed declaration files.
#[derive(Debug)]
pub struct Project {
    options: CompilerOptions,
    state: Mutex<ProjectState>,
}

#[derive(Debug, Default)]
struct ProjectState {
    next_id: u32,
    files: HashMap<PathBuf, Arc<SourceFile>>,
}

impl Project {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            state: Mutex::new(ProjectState::default()),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    fn lock(&self) -> MutexGuard<'_, ProjectState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> FileId {
        let mut state = self.lock();
        let id = FileId(state.next_id);
        state.next_id += 1;
        id
    }

    /// Number of files parsed so far.
    pub fn cached_files(&self) -> usize {
        self.lock().files.len()
    }

    /// Load and parse a file, or return the cached parse.
    pub fn load(&self, path: &Path) -> SchemaResult<Arc<SourceFile>> {
        let canonical = std::fs::canonicalize(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(file) = self.lock().files.get(&canonical) {
            return Ok(Arc::clone(file));
        }

        let text = std::fs::read_to_string(&canonical).map_err(|source| SchemaError::Io {
            path: canonical.clone(),
            source,
        })?;
        let module = parser::parse(&text).map_err(|errs| SchemaError::Parse {
            path: canonical.clone(),
            message: errs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        })?;
        debug!(path = %canonical.display(), items = module.items.len(), "parsed declaration file");

        let mut state = self.lock();
        // Another session may have raced us here; first insert wins.
        if let Some(file) = state.files.get(&canonical) {
            return Ok(Arc::clone(file));
        }
        let file = Arc::new(SourceFile {
            id: FileId(state.next_id),
            path: canonical.clone(),
            text,
            module,
        });
        state.next_id += 1;
        state.files.insert(canonical, Arc::clone(&file));
        Ok(file)
    }

    /// Resolve a module specifier as seen from `from`.
    pub fn resolve(&self, from: &Path, specifier: &str) -> SchemaResult<Arc<SourceFile>> {
        let relative = specifier == "."
            || specifier == ".."
            || specifier.starts_with("./")
            || specifier.starts_with("../");
        let base = if relative {
            from.parent().unwrap_or(Path::new("")).join(specifier)
        } else {
            self.options.root.join(specifier)
        };

        for candidate in module_candidates(&base) {
            if candidate.is_file() {
                trace!(specifier, candidate = %candidate.display(), "resolved module");
                return self.load(&candidate);
            }
        }

        Err(SchemaError::ModuleNotFound {
            specifier: specifier.to_string(),
            from: from.to_path_buf(),
        })
    }

    /// Load the configured global declaration files. Entries may omit the
    /// extension, like module specifiers.
    pub fn globals(&self) -> SchemaResult<Vec<Arc<SourceFile>>> {
        self.options
            .types
            .iter()
            .map(|path| {
                let base = self.options.root.join(path);
                match module_candidates(&base).into_iter().find(|c| c.is_file()) {
                    Some(found) => self.load(&found),
                    None => self.load(&base),
                }
            })
            .collect()
    }
}

fn module_candidates(base: &Path) -> Vec<PathBuf> {
    let with_suffix = |suffix: &str| {
        let mut raw: OsString = base.as_os_str().to_owned();
        raw.push(suffix);
        PathBuf::from(raw)
    };
    let mut candidates = Vec::with_capacity(5);
    if base.extension().is_some_and(|ext| ext == "ts") {
        candidates.push(base.to_path_buf());
    }
    candidates.push(with_suffix(".d.ts"));
    candidates.push(with_suffix(".ts"));
    candidates.push(base.join("index.d.ts"));
    candidates.push(base.join("index.ts"));
    candidates
}

/// Every file a unit can see: the unit, its transitive imports, and the
/// project's globals.
#[derive(Debug)]
pub struct FileSet {
    unit: Arc<SourceFile>,
    files: HashMap<FileId, Arc<SourceFile>>,
    modules: HashMap<(FileId, String), FileId>,
    globals: Vec<FileId>,
}

impl FileSet {
    fn build(project: &Project, unit: Arc<SourceFile>) -> SchemaResult<Self> {
        let globals = project.globals()?;
        let mut set = Self {
            files: HashMap::new(),
            modules: HashMap::new(),
            globals: globals.iter().map(|g| g.id).collect(),
            unit: Arc::clone(&unit),
        };

        let mut queue: VecDeque<Arc<SourceFile>> = VecDeque::new();
        queue.push_back(unit);
        queue.extend(globals);

        while let Some(file) = queue.pop_front() {
            if set.files.contains_key(&file.id) {
                continue;
            }
            for specifier in specifiers(&file.module) {
                let target = project.resolve(&file.path, specifier)?;
                set.modules
                    .insert((file.id, specifier.to_string()), target.id);
                if !set.files.contains_key(&target.id) {
                    queue.push_back(target);
                }
            }
            set.files.insert(file.id, file);
        }

        Ok(set)
    }

    pub fn unit(&self) -> &SourceFile {
        &self.unit
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id).map(|f| f.as_ref())
    }

    /// The file a specifier in `from` resolved to.
    pub fn module(&self, from: FileId, specifier: &str) -> Option<&SourceFile> {
        let id = self.modules.get(&(from, specifier.to_string()))?;
        self.file(*id)
    }

    pub fn globals(&self) -> impl Iterator<Item = &SourceFile> {
        self.globals.iter().filter_map(|id| self.file(*id))
    }
}

fn specifiers(module: &Module) -> impl Iterator<Item = &str> {
    module.items.iter().filter_map(|item| match item {
        Item::Import(import) => Some(import.module.as_str()),
        Item::Export(export) => Some(export.module()),
        _ => None,
    })
}

/// The in-memory unit and everything derived from its current content.
#[derive(Debug)]
struct Unit {
    file: Arc<SourceFile>,
    parse_errors: Vec<RawDiagnostic>,
    tree: Option<ValueTree>,
    /// Set when the content nests past [`MAX_VALUE_DEPTH`]; nothing was parsed.
    too_deep: bool,
    files: OnceLock<Arc<FileSet>>,
    references: OnceLock<ReferenceIndex>,
}

/// One session's program: a shared project plus a private unit file.
#[derive(Debug)]
pub struct Program {
    project: Arc<Project>,
    unit_id: FileId,
    unit_path: PathBuf,
    version: u64,
    unit: Option<Unit>,
}

impl Program {
    pub fn new(project: Arc<Project>) -> Self {
        let unit_id = project.allocate_id();
        let unit_path = project
            .root()
            .join(format!("__shapecheck_unit_{}.ts", unit_id.0));
        Self {
            project,
            unit_id,
            unit_path,
            version: 0,
            unit: None,
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn unit_id(&self) -> FileId {
        self.unit_id
    }

    pub fn unit_path(&self) -> &Path {
        &self.unit_path
    }

    /// Incremented on every [`Program::update_unit`].
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace the unit's content. All state derived from the previous
    /// content is discarded.
    pub fn update_unit(&mut self, text: String) {
        self.version += 1;
        let too_deep = lexer::nesting_depth(&text) > MAX_VALUE_DEPTH;
        let parsed = if too_deep {
            Ok(Module::default())
        } else {
            parser::parse(&text)
        };
        let (module, parse_errors) = match parsed {
            Ok(module) => (module, Vec::new()),
            Err(errs) => (
                Module::default(),
                errs.into_iter()
                    .map(|e| RawDiagnostic {
                        offset: e.span.start,
                        message: e.message,
                    })
                    .collect(),
            ),
        };
        let file = Arc::new(SourceFile {
            id: self.unit_id,
            path: self.unit_path.clone(),
            text,
            module,
        });
        let (tree, too_deep) = match value_decl(&file.module).map(ValueTree::from_const).transpose() {
            Ok(tree) => (tree, too_deep),
            Err(_) => (None, true),
        };
        if too_deep {
            debug!(version = self.version, limit = MAX_VALUE_DEPTH, "unit value is too deep");
        }
        trace!(version = self.version, "unit updated");
        self.unit = Some(Unit {
            file,
            parse_errors,
            tree,
            too_deep,
            files: OnceLock::new(),
            references: OnceLock::new(),
        });
    }

    pub fn unit_text(&self) -> &str {
        self.unit.as_ref().map(|u| u.file.text.as_str()).unwrap_or("")
    }

    /// The unit's value declaration (its last `const`).
    pub fn value_decl(&self) -> Option<&ConstDecl> {
        self.unit.as_ref().and_then(|u| value_decl(&u.file.module))
    }

    pub fn value_tree(&self) -> Option<&ValueTree> {
        self.unit.as_ref().and_then(|u| u.tree.as_ref())
    }

    pub fn syntactic_diagnostics(&self) -> Vec<RawDiagnostic> {
        self.unit
            .as_ref()
            .map(|u| u.parse_errors.clone())
            .unwrap_or_default()
    }

    /// The unit, its imports, and the globals, loaded on first use.
    pub fn file_set(&self) -> SchemaResult<Arc<FileSet>> {
        let Some(unit) = &self.unit else {
            return Err(SchemaError::UnresolvedName {
                name: "<unit>".to_string(),
                path: self.unit_path.clone(),
            });
        };
        if let Some(files) = unit.files.get() {
            return Ok(Arc::clone(files));
        }
        let files = Arc::new(FileSet::build(&self.project, Arc::clone(&unit.file))?);
        Ok(Arc::clone(unit.files.get_or_init(|| files)))
    }

    /// Fails with [`SchemaError::ValueTooDeep`] when the unit's value nests
    /// past [`MAX_VALUE_DEPTH`].
    fn ensure_depth(&self) -> SchemaResult<()> {
        match &self.unit {
            Some(unit) if unit.too_deep => Err(SchemaError::ValueTooDeep {
                limit: MAX_VALUE_DEPTH,
            }),
            _ => Ok(()),
        }
    }

    /// Structural diagnostics for the value against its declared type.
    pub fn semantic_diagnostics(&self) -> SchemaResult<Vec<RawDiagnostic>> {
        self.ensure_depth()?;
        let Some(decl) = self.value_decl() else {
            return Ok(Vec::new());
        };
        let Some(ty) = &decl.ty else {
            return Ok(Vec::new());
        };
        let files = self.file_set()?;
        let eval = Evaluator::new(&files);
        let target = eval.eval_expr(files.unit(), ty, &Default::default())?;
        Checker::new(&eval).check(&decl.init, &target, decl.name_span.start)
    }

    /// Locations in the unit's value literal that realize the field
    /// declared at `decl`.
    pub fn implementations_of(&self, decl: Location) -> SchemaResult<Vec<Location>> {
        Ok(self.references()?.implementations(decl).to_vec())
    }

    fn references(&self) -> SchemaResult<&ReferenceIndex> {
        self.ensure_depth()?;
        let Some(unit) = &self.unit else {
            return Err(SchemaError::UnresolvedName {
                name: "<unit>".to_string(),
                path: self.unit_path.clone(),
            });
        };
        if let Some(index) = unit.references.get() {
            return Ok(index);
        }
        let index = match value_decl(&unit.file.module) {
            Some(ConstDecl {
                ty: Some(ty), init, ..
            }) => {
                let files = self.file_set()?;
                let eval = Evaluator::new(&files);
                let target = eval.eval_expr(files.unit(), ty, &Default::default())?;
                ReferenceIndex::build(&eval, self.unit_id, init, &target)?
            }
            _ => ReferenceIndex::default(),
        };
        Ok(unit.references.get_or_init(|| index))
    }
}

fn value_decl(module: &Module) -> Option<&ConstDecl> {
    module.items.iter().rev().find_map(|item| match item {
        Item::Const(decl) => Some(decl),
        _ => None,
    })
}
