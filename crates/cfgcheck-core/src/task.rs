//! # Task Views and Families
//!
//! Borrowed views over `tasks.*` entries and `pipeline` steps, plus the
//! classification of a task's `module` string into a [`TaskFamily`].
//!
//! ## Family Resolution
//!
//! Modules are matched by dotted-segment prefix after the namespace root
//! (`standard_step` or `custom_step`, which are equivalent). The longest
//! matching prefix wins, so `storage.store_file_to_localdrive` is picked
//! before the general `storage` family.
//!
//! | Prefix after root | Family |
//! |---|---|
//! | `storage.store_file_to_localdrive` | `Storage(LocalDrive)` |
//! | `extraction.*` | `Extraction` |
//! | `storage.*` | `Storage(Metadata)` |
//! | `context.*` | `Context` |
//! | `archiver.*` | `Archiver` |
//! | `housekeeping.*` | `Housekeeping` |
//! | `rules.*` | `Rules` |

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Context keys every task can reference as `{key}` without an extraction field.
pub const CONTEXT_KEYS: [&str; 6] = [
    "id",
    "nanoid",
    "filename",
    "source",
    "original_filename",
    "file_path",
];

const NAMESPACE_ROOTS: [&str; 2] = ["standard_step", "custom_step"];

/// Storage sub-family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// JSON/CSV metadata writers keyed by `data_dir` + `filename`.
    Metadata,
    /// Copies the processed file itself, keyed by `files_dir` + `filename`.
    LocalDrive,
}

/// Task classification derived from the `module` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
    /// Calls the extraction provider and produces fields.
    Extraction,
    /// Persists extracted data or files.
    Storage(StorageKind),
    /// Adds values such as `nanoid` to the run context.
    Context,
    /// Moves the source file into an archive.
    Archiver,
    /// Cleans up processing state; must run last.
    Housekeeping,
    /// Updates a reference CSV by matching extracted values.
    Rules,
    /// Module outside the known namespaces.
    Unknown,
}

struct FamilyPrefix {
    segments: &'static [&'static str],
    needs_leaf: bool,
    family: TaskFamily,
}

// Ordered longest first.
const FAMILY_PREFIXES: &[FamilyPrefix] = &[
    FamilyPrefix {
        segments: &["storage", "store_file_to_localdrive"],
        needs_leaf: false,
        family: TaskFamily::Storage(StorageKind::LocalDrive),
    },
    FamilyPrefix {
        segments: &["extraction"],
        needs_leaf: true,
        family: TaskFamily::Extraction,
    },
    FamilyPrefix {
        segments: &["storage"],
        needs_leaf: true,
        family: TaskFamily::Storage(StorageKind::Metadata),
    },
    FamilyPrefix {
        segments: &["context"],
        needs_leaf: true,
        family: TaskFamily::Context,
    },
    FamilyPrefix {
        segments: &["archiver"],
        needs_leaf: true,
        family: TaskFamily::Archiver,
    },
    FamilyPrefix {
        segments: &["housekeeping"],
        needs_leaf: true,
        family: TaskFamily::Housekeeping,
    },
    FamilyPrefix {
        segments: &["rules"],
        needs_leaf: true,
        family: TaskFamily::Rules,
    },
];

impl TaskFamily {
    /// Classify a module path.
    pub fn classify(module: &str) -> Self {
        let segments: Vec<&str> = module.trim().split('.').collect();
        let Some((root, rest)) = segments.split_first() else {
            return Self::Unknown;
        };
        if !NAMESPACE_ROOTS.contains(root) {
            return Self::Unknown;
        }
        FAMILY_PREFIXES
            .iter()
            .find(|prefix| {
                rest.len() >= prefix.segments.len() + usize::from(prefix.needs_leaf)
                    && rest[..prefix.segments.len()] == *prefix.segments
                    && rest.iter().all(|s| !s.is_empty())
            })
            .map(|prefix| prefix.family)
            .unwrap_or(Self::Unknown)
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Storage(StorageKind::Metadata) => "storage",
            Self::Storage(StorageKind::LocalDrive) => "storage (local drive)",
            Self::Context => "context",
            Self::Archiver => "archiver",
            Self::Housekeeping => "housekeeping",
            Self::Rules => "rules",
            Self::Unknown => "unknown",
        }
    }

    /// True for families whose templates consume extraction tokens.
    pub fn writes_output(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Archiver)
    }
}

impl std::fmt::Display for TaskFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Abort the pipeline for this document.
    Stop,
    /// Log and carry on with the next step.
    Continue,
}

impl OnError {
    /// Case-insensitive parse of `stop` / `continue`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stop" => Some(Self::Stop),
            "continue" => Some(Self::Continue),
            _ => None,
        }
    }
}

/// Borrowed view of one `tasks.<name>` entry.
#[derive(Debug, Clone)]
pub struct TaskDefinition<'a> {
    /// Key under `tasks`.
    pub name: &'a str,
    /// `module`, when it is a string.
    pub module: Option<&'a str>,
    /// `class`, when it is a string.
    pub class: Option<&'a str>,
    /// `params`, when it is a mapping.
    pub params: Option<&'a Mapping>,
    /// Normalised `on_error`, when present and valid.
    pub on_error: Option<OnError>,
    /// Family derived from `module`.
    pub family: TaskFamily,
    /// The whole task body.
    pub body: &'a Mapping,
}

impl<'a> TaskDefinition<'a> {
    /// Build a view from a task body.
    pub fn from_mapping(name: &'a str, body: &'a Mapping) -> Self {
        let module = body.get("module").and_then(Value::as_str);
        Self {
            name,
            module,
            class: body.get("class").and_then(Value::as_str),
            params: body.get("params").and_then(Value::as_mapping),
            on_error: body
                .get("on_error")
                .and_then(Value::as_str)
                .and_then(OnError::parse),
            family: module.map(TaskFamily::classify).unwrap_or(TaskFamily::Unknown),
            body,
        }
    }

    /// String parameter `key`.
    pub fn param_str(&self, key: &str) -> Option<&'a str> {
        self.params?.get(key).and_then(Value::as_str)
    }

    /// Raw parameter `key`.
    pub fn param(&self, key: &str) -> Option<&'a Value> {
        self.params?.get(key)
    }

    /// Every string-valued parameter, recursing into nested mappings and
    /// lists, as `(dotted key relative to params, value)` pairs.
    pub fn string_params(&self) -> Vec<(String, &'a str)> {
        let mut out = Vec::new();
        if let Some(params) = self.params {
            for (key, value) in params {
                if let Some(key) = key.as_str() {
                    collect_strings(key.to_string(), value, &mut out);
                }
            }
        }
        out
    }
}

fn collect_strings<'a>(prefix: String, value: &'a Value, out: &mut Vec<(String, &'a str)>) {
    match value {
        Value::String(s) => out.push((prefix, s.as_str())),
        Value::Mapping(map) => {
            for (key, child) in map {
                if let Some(key) = key.as_str() {
                    collect_strings(format!("{prefix}.{key}"), child, out);
                }
            }
        }
        Value::Sequence(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_strings(format!("{prefix}[{i}]"), child, out);
            }
        }
        Value::Tagged(tagged) => collect_strings(prefix, &tagged.value, out),
        _ => {}
    }
}

/// One string step of `pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineEntry<'a> {
    /// Position in the `pipeline` list.
    pub index: usize,
    /// Trimmed task name.
    pub name: &'a str,
}
