//! # Structural Validation
//!
//! Checks presence, type and shape of every node the later passes rely on.
//! This pass runs first; when the root is not a mapping it reports exactly
//! one `schema-root-not-mapping` error and tells the engine to stop.
//!
//! ## Unknown Keys
//!
//! Keys outside the contract are reported as `schema-unknown-key`. The
//! severity is a run option (`strict`), and so is how deep the check goes:
//!
//! | Scope | Checked |
//! |---|---|
//! | `Shallow` | top level, `web`, `watch_folder`, `authentication`, task bodies |
//! | `Recursive` | the above, plus family `params`, field specs, `csv_match`, clauses |
//!
//! Keys inside a storage `storage:` override are always checked.

use serde_yaml::{Mapping, Value};

use cfgcheck_core::{describe_value, ConfigDocument, ConfigPath, Finding, FindingCode, OnError};

use crate::params;

/// How far unknown-key detection descends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKeyScope {
    /// Top-level sections and task bodies only.
    #[default]
    Shallow,
    /// Also family parameters and nested specs.
    Recursive,
}

const TOP_LEVEL_KEYS: &[&str] = &[
    "web",
    "watch_folder",
    "tasks",
    "pipeline",
    "authentication",
    "logging",
    "secrets",
    "name",
    "description",
    "version",
];
const WEB_KEYS: &[&str] = &["upload_dir", "secret_key", "host", "port"];
const WATCH_FOLDER_KEYS: &[&str] = &["dir", "recursive", "processing_dir"];
const AUTHENTICATION_KEYS: &[&str] = &["username", "password_hash"];
const TASK_KEYS: &[&str] = &["module", "class", "params", "on_error"];

/// Result of the structural pass.
#[derive(Debug, Clone)]
pub struct SchemaReport {
    /// Findings in discovery order.
    pub findings: Vec<Finding>,
    /// False when the root is not a mapping; later passes must not run.
    pub root_is_mapping: bool,
}

/// Structural validator configured for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    strict: bool,
    scope: UnknownKeyScope,
}

impl SchemaValidator {
    /// Create a validator. `strict` turns unknown keys into errors.
    pub fn new(strict: bool, scope: UnknownKeyScope) -> Self {
        Self { strict, scope }
    }

    /// Validate `document`.
    pub fn validate(&self, document: &ConfigDocument) -> SchemaReport {
        let Some(root) = document.root_mapping() else {
            let finding = Finding::error(
                FindingCode::SchemaRootNotMapping,
                ConfigPath::root(),
                format!(
                    "Configuration root must be a mapping, found {}",
                    describe_value(document.root())
                ),
            )
            .with_suggestion("Start the file with top-level keys such as web, watch_folder, tasks and pipeline.");
            return SchemaReport {
                findings: vec![finding],
                root_is_mapping: false,
            };
        };

        let mut checker = Checker::new(self.strict, self.scope);
        checker.root(root);
        tracing::debug!(
            pass = "schema",
            findings = checker.findings.len(),
            "structural validation finished"
        );
        SchemaReport {
            findings: checker.findings,
            root_is_mapping: true,
        }
    }
}

/// Finding accumulator with the shared shape helpers.
pub(crate) struct Checker {
    strict: bool,
    pub(crate) scope: UnknownKeyScope,
    pub(crate) findings: Vec<Finding>,
}

impl Checker {
    fn new(strict: bool, scope: UnknownKeyScope) -> Self {
        Self {
            strict,
            scope,
            findings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub(crate) fn recursive(&self) -> bool {
        self.scope == UnknownKeyScope::Recursive
    }

    fn root(&mut self, root: &Mapping) {
        let top = ConfigPath::root();
        self.non_string_keys(root, &top);
        self.unknown_keys(root, &top, TOP_LEVEL_KEYS);

        if let Some(web) = self.required_mapping(root, "web", &top) {
            let path = top.key("web");
            self.required_string(web, "upload_dir", &path);
            self.optional_string(web, "secret_key", &path);
            self.optional_string(web, "host", &path);
            self.optional_int_range(web, "port", &path, 1, 65535);
            self.unknown_keys(web, &path, WEB_KEYS);
        }

        if let Some(watch) = self.required_mapping(root, "watch_folder", &top) {
            let path = top.key("watch_folder");
            self.required_string(watch, "dir", &path);
            self.optional_bool(watch, "recursive", &path);
            self.optional_string(watch, "processing_dir", &path);
            self.unknown_keys(watch, &path, WATCH_FOLDER_KEYS);
        }

        if let Some(auth) = self.optional_mapping(root, "authentication", &top) {
            let path = top.key("authentication");
            self.required_string(auth, "username", &path);
            if let Some(hash) = self.required_string(auth, "password_hash", &path) {
                if !is_bcrypt_hash(hash) {
                    self.push(
                        Finding::error(
                            FindingCode::SchemaTypeMismatch,
                            path.key("password_hash"),
                            "password_hash must be a bcrypt hash ($2a$, $2b$ or $2y$)",
                        )
                        .with_suggestion("Generate the hash with bcrypt and paste the full 60-character value."),
                    );
                }
            }
            self.unknown_keys(auth, &path, AUTHENTICATION_KEYS);
        }

        self.optional_mapping(root, "logging", &top);
        self.optional_mapping(root, "secrets", &top);
        for key in ["name", "description", "version"] {
            self.optional_string(root, key, &top);
        }

        self.tasks(root, &top);
        self.pipeline(root, &top);
    }

    fn tasks(&mut self, root: &Mapping, top: &ConfigPath) {
        let Some(tasks) = self.required_mapping(root, "tasks", top) else {
            return;
        };
        let path = top.key("tasks");
        if tasks.is_empty() {
            self.push(
                Finding::error(
                    FindingCode::SchemaMissingRequired,
                    path.clone(),
                    "At least one task must be defined",
                )
                .with_suggestion("Define the tasks section as a mapping of task ids to definitions."),
            );
            return;
        }
        self.non_string_keys(tasks, &path);
        for (name, body) in tasks {
            let Some(name) = name.as_str() else {
                continue;
            };
            let task_path = path.key(name);
            let Some(body) = body.as_mapping() else {
                self.push(
                    Finding::error(
                        FindingCode::SchemaTypeMismatch,
                        task_path,
                        format!("Task definition must be a mapping, found {}", describe_value(body)),
                    )
                    .with_suggestion(format!(
                        "Define tasks.{name} as a mapping with module, class, and params."
                    ))
                    .with_detail("task_name", name),
                );
                continue;
            };
            self.task(name, body, &task_path);
        }
    }

    fn task(&mut self, name: &str, body: &Mapping, path: &ConfigPath) {
        let module = self.required_string(body, "module", path);
        self.required_string(body, "class", path);

        if let Some(value) = present(body, "on_error") {
            let valid = value.as_str().and_then(OnError::parse).is_some();
            if !valid {
                self.push(
                    Finding::error(
                        FindingCode::SchemaInvalidEnum,
                        path.key("on_error"),
                        "on_error must be 'stop' or 'continue'",
                    )
                    .with_detail("task_name", name),
                );
            }
        }

        self.unknown_keys(body, path, TASK_KEYS);

        let params_path = path.key("params");
        let empty = Mapping::new();
        let params = match present(body, "params") {
            None => &empty,
            Some(Value::Mapping(params)) => params,
            Some(other) => {
                self.push(
                    Finding::error(
                        FindingCode::SchemaTypeMismatch,
                        params_path,
                        format!("params must be a mapping, found {}", describe_value(other)),
                    )
                    .with_suggestion(format!(
                        "Define tasks.{name}.params as a mapping of parameter names to values."
                    ))
                    .with_detail("task_name", name),
                );
                return;
            }
        };
        self.non_string_keys(params, &params_path);

        if let Some(module) = module {
            let family = cfgcheck_core::TaskFamily::classify(module);
            params::check_family(self, name, family, params, &params_path);
        }
    }

    fn pipeline(&mut self, root: &Mapping, top: &ConfigPath) {
        let path = top.key("pipeline");
        let steps = match present(root, "pipeline") {
            None => {
                self.push(
                    Finding::error(
                        FindingCode::SchemaMissingRequired,
                        path,
                        "Required section 'pipeline' is missing",
                    )
                    .with_suggestion("Define pipeline as a list of task identifiers in execution order."),
                );
                return;
            }
            Some(Value::Sequence(steps)) => steps,
            Some(other) => {
                self.push(
                    Finding::error(
                        FindingCode::SchemaTypeMismatch,
                        path,
                        format!("pipeline must be a list, found {}", describe_value(other)),
                    )
                    .with_suggestion("Define pipeline as a list of task identifiers in execution order."),
                );
                return;
            }
        };
        if steps.is_empty() {
            self.push(
                Finding::error(
                    FindingCode::SchemaMissingRequired,
                    path,
                    "pipeline must contain at least one task reference",
                )
                .with_suggestion("List the task ids to run, in order, under pipeline."),
            );
            return;
        }
        for (index, step) in steps.iter().enumerate() {
            let valid = step.as_str().is_some_and(|s| !s.trim().is_empty());
            if !valid {
                self.push(
                    Finding::error(
                        FindingCode::SchemaTypeMismatch,
                        path.index(index),
                        format!(
                            "pipeline[{index}] must be a non-empty task id string, found {}",
                            describe_value(step)
                        ),
                    )
                    .with_suggestion("Ensure pipeline entries are task ids (non-empty strings)."),
                );
            }
        }
    }

    // ---------------------------------------------------------------------
    // Shape helpers
    // ---------------------------------------------------------------------

    pub(crate) fn required_mapping<'m>(
        &mut self,
        map: &'m Mapping,
        key: &str,
        parent: &ConfigPath,
    ) -> Option<&'m Mapping> {
        match present(map, key) {
            None => {
                self.missing(parent, key);
                None
            }
            Some(value) => self.expect_mapping(value, parent.key(key)),
        }
    }

    pub(crate) fn optional_mapping<'m>(
        &mut self,
        map: &'m Mapping,
        key: &str,
        parent: &ConfigPath,
    ) -> Option<&'m Mapping> {
        present(map, key).and_then(|value| self.expect_mapping(value, parent.key(key)))
    }

    fn expect_mapping<'m>(&mut self, value: &'m Value, path: ConfigPath) -> Option<&'m Mapping> {
        match value.as_mapping() {
            Some(mapping) => Some(mapping),
            None => {
                self.mismatch(path, "a mapping", value);
                None
            }
        }
    }

    /// Non-empty string at `key`; reports missing, mistyped and blank values.
    pub(crate) fn required_string<'m>(
        &mut self,
        map: &'m Mapping,
        key: &str,
        parent: &ConfigPath,
    ) -> Option<&'m str> {
        match present(map, key) {
            None => {
                self.missing(parent, key);
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.push(
                    Finding::error(
                        FindingCode::SchemaMissingRequired,
                        parent.key(key),
                        format!("'{key}' must be a non-empty string"),
                    )
                    .with_suggestion(format!("Provide a value for '{}'.", parent.key(key)))
                    .with_detail("config_key", parent.key(key).as_str()),
                );
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                self.mismatch(parent.key(key), "a string", other);
                None
            }
        }
    }

    pub(crate) fn optional_string<'m>(
        &mut self,
        map: &'m Mapping,
        key: &str,
        parent: &ConfigPath,
    ) -> Option<&'m str> {
        match present(map, key)? {
            Value::String(s) => Some(s.as_str()),
            other => {
                self.mismatch(parent.key(key), "a string", other);
                None
            }
        }
    }

    /// Optional string that must not be blank when given.
    pub(crate) fn optional_non_empty_string(
        &mut self,
        map: &Mapping,
        key: &str,
        parent: &ConfigPath,
    ) {
        if present(map, key).is_some() {
            self.required_string(map, key, parent);
        }
    }

    pub(crate) fn optional_bool(&mut self, map: &Mapping, key: &str, parent: &ConfigPath) {
        if let Some(value) = present(map, key) {
            if !value.is_bool() {
                self.mismatch(parent.key(key), "a boolean (true or false)", value);
            }
        }
    }

    pub(crate) fn optional_int_range(
        &mut self,
        map: &Mapping,
        key: &str,
        parent: &ConfigPath,
        min: i64,
        max: i64,
    ) {
        let Some(value) = present(map, key) else {
            return;
        };
        match value.as_i64() {
            None => self.mismatch(parent.key(key), "an integer", value),
            Some(n) if n < min || n > max => self.push(
                Finding::error(
                    FindingCode::SchemaOutOfRange,
                    parent.key(key),
                    format!("{key} must be between {min} and {max}, found {n}"),
                )
                .with_detail("config_key", parent.key(key).as_str()),
            ),
            Some(_) => {}
        }
    }

    pub(crate) fn missing(&mut self, parent: &ConfigPath, key: &str) {
        let path = parent.key(key);
        self.push(
            Finding::error(
                FindingCode::SchemaMissingRequired,
                path.clone(),
                format!("Required key '{key}' is missing"),
            )
            .with_suggestion(format!("Provide a value for '{path}'."))
            .with_detail("config_key", path.as_str()),
        );
    }

    pub(crate) fn mismatch(&mut self, path: ConfigPath, expected: &str, found: &Value) {
        self.push(
            Finding::error(
                FindingCode::SchemaTypeMismatch,
                path.clone(),
                format!("Expected {expected}, found {}", describe_value(found)),
            )
            .with_detail("config_key", path.as_str()),
        );
    }

    fn non_string_keys(&mut self, map: &Mapping, path: &ConfigPath) {
        for key in map.keys().filter(|k| !k.is_string()) {
            self.push(Finding::error(
                FindingCode::SchemaTypeMismatch,
                path.clone(),
                format!("Keys must be strings, found {} key", describe_value(key)),
            ));
        }
    }

    /// Report keys of `map` not in `allowed`.
    pub(crate) fn unknown_keys(&mut self, map: &Mapping, path: &ConfigPath, allowed: &[&str]) {
        for key in map.keys().filter_map(Value::as_str) {
            if allowed.contains(&key) {
                continue;
            }
            let finding = if self.strict {
                Finding::error(
                    FindingCode::SchemaUnknownKey,
                    path.key(key),
                    "Unknown key is not permitted in strict mode",
                )
            } else {
                Finding::warning(
                    FindingCode::SchemaUnknownKey,
                    path.key(key),
                    "Unknown key not defined by schema",
                )
            };
            self.push(
                finding
                    .with_suggestion(format!(
                        "Remove '{key}' or rename it to one of: {}.",
                        allowed.join(", ")
                    ))
                    .with_detail("key", key),
            );
        }
    }
}

/// Value at `key`, treating explicit `null` as absent.
pub(crate) fn present<'m>(map: &'m Mapping, key: &str) -> Option<&'m Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn is_bcrypt_hash(hash: &str) -> bool {
    let bytes = hash.as_bytes();
    bytes.len() == 60
        && (hash.starts_with("$2a$") || hash.starts_with("$2b$") || hash.starts_with("$2y$"))
        && bytes[4].is_ascii_digit()
        && bytes[5].is_ascii_digit()
        && bytes[6] == b'$'
        && bytes[7..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'.' || *b == b'/')
}
