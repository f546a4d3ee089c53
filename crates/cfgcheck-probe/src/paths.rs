//! # Path Prober
//!
//! Read-only checks for directory and file parameters.
//!
//! - `watch_folder.dir` is always probed and must be an existing directory.
//! - With dynamic probing enabled, every mapping key ending in `_dir` must
//!   name an existing, listable directory, and every key ending in `_file`
//!   must name an existing, readable regular file. Keys are matched
//!   case-insensitively anywhere in the document.
//!
//! Values are expanded (`~`, `$VAR`, `${VAR}`) and resolved against the
//! configured base directory when relative. Values containing `{` are
//! runtime templates and are not probed. Nothing is ever created.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use cfgcheck_core::{describe_value, ConfigDocument, ConfigPath, Finding, FindingCode};

/// Probes `_dir` / `_file` parameters against the filesystem.
#[derive(Debug, Clone)]
pub struct PathProber {
    base_dir: PathBuf,
    dynamic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Dir,
    File,
}

impl PathProber {
    /// Prober resolving relative paths against `base_dir`. Only
    /// `watch_folder.dir` is checked until dynamic probing is enabled.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            dynamic: false,
        }
    }

    /// Also probe every `_dir` / `_file` key in the document.
    pub fn with_dynamic_paths(mut self, enabled: bool) -> Self {
        self.dynamic = enabled;
        self
    }

    /// Probe `document` and return one finding per problem.
    pub fn probe(&self, document: &ConfigDocument) -> Vec<Finding> {
        let mut findings = Vec::new();
        let Some(root) = document.root_mapping() else {
            return findings;
        };

        let watch_path = ConfigPath::root().key("watch_folder").key("dir");
        if let Some(value) = root
            .get("watch_folder")
            .and_then(Value::as_mapping)
            .and_then(|w| w.get("dir"))
        {
            self.check(value, &watch_path, Expect::Dir, &mut findings);
        }

        if self.dynamic {
            for (key, value) in root {
                if let Some(key) = key.as_str() {
                    self.walk(key, value, &ConfigPath::root().key(key), &mut findings);
                }
            }
        }

        tracing::debug!(
            pass = "paths",
            dynamic = self.dynamic,
            findings = findings.len(),
            "path probing finished"
        );
        findings
    }

    fn walk(&self, key: &str, value: &Value, path: &ConfigPath, findings: &mut Vec<Finding>) {
        if path.as_str() != "watch_folder.dir" {
            let lowered = key.to_ascii_lowercase();
            if lowered.ends_with("_dir") {
                self.check(value, path, Expect::Dir, findings);
            } else if lowered.ends_with("_file") {
                self.check(value, path, Expect::File, findings);
            }
        }
        match value {
            Value::Mapping(map) => {
                for (child_key, child) in map {
                    if let Some(child_key) = child_key.as_str() {
                        self.walk(child_key, child, &path.key(child_key), findings);
                    }
                }
            }
            Value::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let Some(map) = item.as_mapping() {
                        let item_path = path.index(index);
                        for (child_key, child) in map {
                            if let Some(child_key) = child_key.as_str() {
                                self.walk(child_key, child, &item_path.key(child_key), findings);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn check(&self, value: &Value, path: &ConfigPath, expect: Expect, findings: &mut Vec<Finding>) {
        let raw = match value {
            Value::Null => return,
            Value::String(s) => s.trim(),
            other => {
                findings.push(
                    Finding::error(
                        FindingCode::PathValueInvalid,
                        path.clone(),
                        format!("Path value must be a string, found {}", describe_value(other)),
                    )
                    .with_suggestion(format!("Set '{path}' to a non-empty string path."))
                    .with_detail("config_key", path.as_str()),
                );
                return;
            }
        };
        if raw.is_empty() || raw.contains('\0') {
            findings.push(
                Finding::error(
                    FindingCode::PathValueInvalid,
                    path.clone(),
                    "Path value must be a non-empty path without NUL bytes",
                )
                .with_suggestion(format!("Set '{path}' to a non-empty string path."))
                .with_detail("config_key", path.as_str()),
            );
            return;
        }
        if raw.contains('{') {
            return;
        }

        let resolved = resolve_path(raw, &self.base_dir);
        if let Some(finding) = probe_resolved(&resolved, path, expect) {
            findings.push(finding);
        }
    }
}

fn probe_resolved(resolved: &Path, path: &ConfigPath, expect: Expect) -> Option<Finding> {
    let shown = resolved.display().to_string();
    let is_watch = path.as_str() == "watch_folder.dir";
    let located = |finding: Finding| {
        finding
            .with_detail("config_key", path.as_str())
            .with_detail("path", shown.as_str())
    };

    let metadata = match std::fs::metadata(resolved) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let (message, suggestion) = match (expect, is_watch) {
                (Expect::Dir, true) => (
                    "watch_folder.dir directory does not exist".to_string(),
                    format!("Create the watch folder '{shown}' before running the service or update watch_folder.dir."),
                ),
                (Expect::Dir, false) => (
                    format!("Directory does not exist: {shown}"),
                    format!("Create the directory at '{shown}' or update '{path}' to point to an existing directory."),
                ),
                (Expect::File, _) => (
                    format!("File does not exist: {shown}"),
                    format!("Create the file at '{shown}' or update '{path}' to an existing file."),
                ),
            };
            return Some(located(
                Finding::error(FindingCode::FileNotFound, path.clone(), message).with_suggestion(suggestion),
            ));
        }
        Err(err) => {
            return Some(located(Finding::error(
                FindingCode::FileAccessError,
                path.clone(),
                format!("Cannot access {shown}: {err}"),
            )));
        }
    };

    match expect {
        Expect::Dir if !metadata.is_dir() => Some(located(
            Finding::error(
                FindingCode::FileNotDir,
                path.clone(),
                format!("Expected directory but found file: {shown}"),
            )
            .with_suggestion(format!("Update '{path}' so it points to an existing directory.")),
        )),
        Expect::Dir => std::fs::read_dir(resolved).err().map(|err| {
            located(Finding::error(
                FindingCode::FileNotReadable,
                path.clone(),
                format!("Directory cannot be listed: {shown}: {err}"),
            ))
        }),
        Expect::File if !metadata.is_file() => Some(located(
            Finding::error(
                FindingCode::FileNotFile,
                path.clone(),
                format!("Expected file but found directory: {shown}"),
            )
            .with_suggestion(format!("Update '{path}' so it points to an existing file.")),
        )),
        Expect::File => std::fs::File::open(resolved).err().map(|err| {
            located(Finding::error(
                FindingCode::FileNotReadable,
                path.clone(),
                format!("File cannot be opened for reading: {shown}: {err}"),
            ))
        }),
    }
}

/// Expand `~` and environment variables in `raw` and resolve it against
/// `base` when relative.
pub fn resolve_path(raw: &str, base: &Path) -> PathBuf {
    let expanded = expand_user(&expand_vars(raw, |name| std::env::var(name).ok()));
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Replace `$NAME` and `${NAME}` using `lookup`. Unknown variables are
/// left as written.
pub fn expand_vars(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        if let Some(braced) = after.strip_prefix('{') {
            if let Some(close) = braced.find('}') {
                let name = &braced[..close];
                match lookup(name) {
                    Some(value) if !name.is_empty() => out.push_str(&value),
                    _ => out.push_str(&rest[dollar..dollar + close + 3]),
                }
                rest = &braced[close + 1..];
                continue;
            }
        }
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[dollar..dollar + 1 + len]),
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

fn expand_user(raw: &str) -> String {
    let home = || {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
    };
    if raw == "~" {
        return home().unwrap_or_else(|| raw.to_string());
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        if let Some(home) = home() {
            return Path::new(&home).join(rest).display().to_string();
        }
    }
    raw.to_string()
}
