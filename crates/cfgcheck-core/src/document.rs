//! # Document Loader
//!
//! Loads a YAML configuration into a [`ConfigDocument`]: the parsed
//! `serde_yaml::Value` tree plus a [`PositionIndex`] over the same text.
//!
//! Loading fails only when the file cannot be read, is not UTF-8, or is not
//! YAML. A root that parses but is not a mapping (including an empty file,
//! which parses as `null`) still loads; the schema pass reports it.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{ParseFailure, ParseFailureKind};
use crate::position::PositionIndex;
use crate::task::{PipelineEntry, TaskDefinition};

/// A parsed configuration document. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    source: Option<PathBuf>,
    root: Value,
    positions: PositionIndex,
}

impl ConfigDocument {
    /// Read and parse the document at `path`.
    pub fn load(path: &Path) -> Result<Self, ParseFailure> {
        let bytes = std::fs::read(path).map_err(|e| {
            ParseFailure::new(
                ParseFailureKind::Unreadable,
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let mut failure = ParseFailure::new(
                ParseFailureKind::InvalidEncoding,
                format!("{} is not valid UTF-8", path.display()),
            );
            failure.line = Some(line_of_offset(e.as_bytes(), e.utf8_error().valid_up_to()));
            failure
        })?;
        let mut document = Self::parse(&text)?;
        document.source = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            nodes = document.positions.len(),
            "loaded configuration document"
        );
        Ok(document)
    }

    /// Parse YAML text that did not come from a file.
    pub fn parse(text: &str) -> Result<Self, ParseFailure> {
        let root: Value = serde_yaml::from_str(text).map_err(|e| ParseFailure::from_yaml(&e))?;
        Ok(Self {
            source: None,
            root,
            positions: PositionIndex::scan(text),
        })
    }

    /// File the document was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The raw root value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The root as a mapping, or `None` when it has any other shape.
    pub fn root_mapping(&self) -> Option<&Mapping> {
        self.root.as_mapping()
    }

    /// Top-level value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root_mapping().and_then(|m| m.get(key))
    }

    /// Source positions for this document.
    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    /// Task definitions in declaration order.
    ///
    /// Entries whose key is not a string or whose body is not a mapping are
    /// skipped; the schema pass reports them.
    pub fn tasks(&self) -> Vec<TaskDefinition<'_>> {
        let Some(tasks) = self.get("tasks").and_then(Value::as_mapping) else {
            return Vec::new();
        };
        tasks
            .iter()
            .filter_map(|(name, body)| {
                let name = name.as_str()?;
                let body = body.as_mapping()?;
                Some(TaskDefinition::from_mapping(name, body))
            })
            .collect()
    }

    /// Task definition named `name`.
    pub fn task<'a>(&'a self, name: &'a str) -> Option<TaskDefinition<'a>> {
        let body = self
            .get("tasks")
            .and_then(Value::as_mapping)
            .and_then(|tasks| tasks.get(name))
            .and_then(Value::as_mapping)?;
        Some(TaskDefinition::from_mapping(name, body))
    }

    /// String entries of `pipeline`, trimmed, with their original indices.
    pub fn pipeline(&self) -> Vec<PipelineEntry<'_>> {
        let Some(steps) = self.get("pipeline").and_then(Value::as_sequence) else {
            return Vec::new();
        };
        steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| {
                let name = step.as_str()?.trim();
                (!name.is_empty()).then_some(PipelineEntry { index, name })
            })
            .collect()
    }
}

/// Short type name of a YAML value for diagnostics.
pub fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn line_of_offset(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset.min(bytes.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_mapping_root() {
        let doc = ConfigDocument::parse("tasks:\n  a:\n    module: m\npipeline:\n  - a\n").unwrap();
        assert!(doc.root_mapping().is_some());
        assert_eq!(doc.tasks().len(), 1);
        assert_eq!(doc.pipeline()[0].name, "a");
    }

    #[test]
    fn empty_document_is_null_not_failure() {
        let doc = ConfigDocument::parse("").unwrap();
        assert!(doc.root().is_null());
        assert!(doc.root_mapping().is_none());
    }

    #[test]
    fn list_root_loads() {
        let doc = ConfigDocument::parse("- a\n- b\n").unwrap();
        assert!(doc.root().is_sequence());
        assert!(doc.tasks().is_empty());
        assert!(doc.pipeline().is_empty());
    }

    #[test]
    fn syntax_error_carries_location() {
        let err = ConfigDocument::parse("tasks:\n  a: [1, 2\n").unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::Syntax);
        assert!(err.line.is_some());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigDocument::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::Unreadable);
    }

    #[test]
    fn invalid_utf8_is_reported_with_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"web:\n  upload_dir: \xff\xfe\n").unwrap();
        let err = ConfigDocument::load(&path).unwrap_err();
        assert_eq!(err.kind, ParseFailureKind::InvalidEncoding);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn load_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "pipeline: []\n").unwrap();
        let doc = ConfigDocument::load(&path).unwrap();
        assert_eq!(doc.source(), Some(path.as_path()));
    }

    #[test]
    fn task_looks_up_by_name() {
        let doc = ConfigDocument::parse(
            "tasks:\n  extract:\n    module: standard_step.extraction.extract_pdf\n    class: ExtractPdfTask\n  broken: 3\n",
        )
        .unwrap();
        let name = String::from("extract");
        let task = doc.task(&name).unwrap();
        assert_eq!(task.name, "extract");
        assert_eq!(task.family, crate::task::TaskFamily::Extraction);
        assert!(doc.task("broken").is_none());
        assert!(doc.task("missing").is_none());
    }

    #[test]
    fn pipeline_skips_non_strings_and_blanks() {
        let doc = ConfigDocument::parse("pipeline:\n  - a\n  - 3\n  - '  '\n  - ' b '\n").unwrap();
        let names: Vec<(usize, &str)> = doc.pipeline().iter().map(|e| (e.index, e.name)).collect();
        assert_eq!(names, vec![(0, "a"), (3, "b")]);
    }

    #[test]
    fn describe_value_names_shapes() {
        assert_eq!(describe_value(&Value::from(3)), "integer");
        assert_eq!(describe_value(&Value::from(1.5)), "number");
        assert_eq!(describe_value(&Value::Sequence(Vec::new())), "list");
    }
}
