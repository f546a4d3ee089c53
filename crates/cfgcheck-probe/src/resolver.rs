//! # Module Resolution
//!
//! The [`ModuleResolver`] trait is the seam between the import prober and
//! the host's module system. The default [`SourceTreeResolver`] maps a
//! dotted module name onto source files under a list of roots and reads
//! their top-level definitions statically:
//!
//! | Top-level statement | Export |
//! |---|---|
//! | `class Name` | [`ExportKind::Class`] |
//! | `def name` / `async def name` | [`ExportKind::Function`] |
//! | `NAME = ...` / `NAME: T = ...` | [`ExportKind::Constant`] |
//! | `from x import A, B as C` | [`ExportKind::Reexport`] |
//! | `import a.b` | [`ExportKind::Reexport`] (binds `a`) |
//!
//! Module source is never executed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// What a module-level name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// A class definition.
    Class,
    /// A function definition.
    Function,
    /// A plain assignment.
    Constant,
    /// A name imported from elsewhere; its kind is not known statically.
    Reexport,
}

impl ExportKind {
    /// Whether the name can serve as a task class.
    pub fn is_instantiable(&self) -> bool {
        matches!(self, Self::Class | Self::Reexport)
    }

    /// Short label for messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Constant => "constant",
            Self::Reexport => "imported name",
        }
    }
}

/// Names a resolved module defines at top level.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    /// File the exports were read from.
    pub source: PathBuf,
    /// Top-level names, first definition wins.
    pub names: BTreeMap<String, ExportKind>,
}

/// Module resolution failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No source file found for the module.
    #[error("module '{module}' not found (searched {})", format_searched(.searched))]
    NotFound {
        /// Dotted module name.
        module: String,
        /// Candidate files that were checked.
        searched: Vec<PathBuf>,
    },
    /// The module name itself is malformed.
    #[error("'{module}' is not a valid module name")]
    InvalidName {
        /// Dotted module name as written.
        module: String,
    },
    /// The source exists but cannot be read as module source.
    #[error("module '{module}' at {} cannot be loaded: {reason}", .path.display())]
    Unloadable {
        /// Dotted module name.
        module: String,
        /// Source file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "no module roots".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves dotted module names to their exported names.
pub trait ModuleResolver {
    /// Resolve `module`.
    fn resolve(&self, module: &str) -> Result<ModuleExports, ResolveError>;
}

/// Static resolver over Python-style source trees.
#[derive(Debug, Clone)]
pub struct SourceTreeResolver {
    roots: Vec<PathBuf>,
}

impl SourceTreeResolver {
    /// Resolver searching `roots` in order.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    fn candidates(&self, segments: &[&str]) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(self.roots.len() * 2);
        for root in &self.roots {
            let mut package = root.clone();
            package.extend(segments);
            let mut file = package.clone();
            file.set_extension("py");
            out.push(file);
            out.push(package.join("__init__.py"));
        }
        out
    }
}

impl ModuleResolver for SourceTreeResolver {
    fn resolve(&self, module: &str) -> Result<ModuleExports, ResolveError> {
        let segments: Vec<&str> = module.split('.').collect();
        if !segments.iter().all(|s| is_identifier(s)) {
            return Err(ResolveError::InvalidName {
                module: module.to_string(),
            });
        }
        let searched = self.candidates(&segments);
        let found = searched.iter().find(|p| p.is_file()).cloned();
        let Some(path) = found else {
            return Err(ResolveError::NotFound {
                module: module.to_string(),
                searched,
            });
        };
        let unloadable = |reason: String| ResolveError::Unloadable {
            module: module.to_string(),
            path: path.clone(),
            reason,
        };
        let bytes = std::fs::read(&path).map_err(|e| unloadable(e.to_string()))?;
        if bytes.contains(&0) {
            return Err(unloadable("source contains NUL bytes".to_string()));
        }
        let text = String::from_utf8(bytes)
            .map_err(|e| unloadable(format!("source is not valid UTF-8: {e}")))?;
        let names = scan_exports(&text).map_err(unloadable)?;
        Ok(ModuleExports { source: path, names })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn leading_identifier(s: &str) -> Option<&str> {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    let ident = &s[..end];
    is_identifier(ident).then_some(ident)
}

/// Collect top-level names from module source.
fn scan_exports(text: &str) -> Result<BTreeMap<String, ExportKind>, String> {
    let mut names = BTreeMap::new();
    let mut open_string: Option<&str> = None;
    let mut pending_import: Option<String> = None;

    for (offset, line) in text.lines().enumerate() {
        if let Some(delim) = open_string {
            if line.matches(delim).count() % 2 == 1 {
                open_string = None;
            }
            continue;
        }
        if let Some(buffer) = pending_import.as_mut() {
            buffer.push(' ');
            buffer.push_str(line.split('#').next().unwrap_or_default());
            if line.contains(')') {
                if let Some(complete) = pending_import.take() {
                    record_from_import(&complete, &mut names);
                }
            }
            continue;
        }
        for delim in ["\"\"\"", "'''"] {
            if line.matches(delim).count() % 2 == 1 {
                open_string = Some(delim);
            }
        }
        if line.starts_with(|c: char| c.is_whitespace()) || line.is_empty() {
            continue;
        }
        let statement = line.split('#').next().unwrap_or_default().trim_end();

        if let Some(rest) = statement.strip_prefix("class ") {
            let name = leading_identifier(rest.trim_start())
                .ok_or_else(|| format!("invalid class statement on line {}", offset + 1))?;
            names.entry(name.to_string()).or_insert(ExportKind::Class);
        } else if let Some(rest) = statement
            .strip_prefix("def ")
            .or_else(|| statement.strip_prefix("async def "))
        {
            let name = leading_identifier(rest.trim_start())
                .ok_or_else(|| format!("invalid def statement on line {}", offset + 1))?;
            names.entry(name.to_string()).or_insert(ExportKind::Function);
        } else if statement.starts_with("from ") {
            if statement.contains('(') && !statement.contains(')') {
                pending_import = Some(statement.to_string());
            } else {
                record_from_import(statement, &mut names);
            }
        } else if let Some(rest) = statement.strip_prefix("import ") {
            for item in rest.split(',') {
                let item = item.trim();
                let bound = match item.split_once(" as ") {
                    Some((_, alias)) => alias.trim(),
                    None => item.split('.').next().unwrap_or_default(),
                };
                if is_identifier(bound) {
                    names.entry(bound.to_string()).or_insert(ExportKind::Reexport);
                }
            }
        } else if let Some(name) = leading_identifier(statement) {
            let after = statement[name.len()..].trim_start();
            let assigns = (after.starts_with('=') && !after.starts_with("=="))
                || (after.starts_with(':') && after.contains('='));
            if assigns {
                names.entry(name.to_string()).or_insert(ExportKind::Constant);
            }
        }
    }

    if open_string.is_some() {
        return Err("unterminated triple-quoted string".to_string());
    }
    if pending_import.is_some() {
        return Err("unterminated parenthesised import".to_string());
    }
    Ok(names)
}

fn record_from_import(statement: &str, names: &mut BTreeMap<String, ExportKind>) {
    let Some((_, imported)) = statement.split_once(" import ") else {
        return;
    };
    let imported = imported.replace(['(', ')'], " ");
    for item in imported.split(',') {
        let item = item.trim();
        let bound = match item.split_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => item,
        };
        if is_identifier(bound) {
            names.entry(bound.to_string()).or_insert(ExportKind::Reexport);
        }
    }
}

/// Resolver that always succeeds with a fixed export table, for callers
/// that already know what a module exposes.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    modules: BTreeMap<String, BTreeMap<String, ExportKind>>,
}

impl StaticResolver {
    /// Register `module` with its exports.
    pub fn with_module(mut self, module: &str, exports: &[(&str, ExportKind)]) -> Self {
        self.modules.insert(
            module.to_string(),
            exports.iter().map(|(n, k)| (n.to_string(), *k)).collect(),
        );
        self
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(&self, module: &str) -> Result<ModuleExports, ResolveError> {
        self.modules
            .get(module)
            .map(|names| ModuleExports {
                source: Path::new(module).to_path_buf(),
                names: names.clone(),
            })
            .ok_or_else(|| ResolveError::NotFound {
                module: module.to_string(),
                searched: Vec::new(),
            })
    }
}
