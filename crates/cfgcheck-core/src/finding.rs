//! # Findings
//!
//! A `Finding` is a single reported issue: severity, code, config path,
//! message, and optionally a suggestion, a source line, and structured
//! details. Passes construct findings through the builder methods below and
//! hand them to the engine; nothing mutates a finding after that.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::code::FindingCode;
use crate::path::ConfigPath;
use crate::position::PositionIndex;

/// Finding severity. Declaration order is report order: errors first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Configuration cannot be used as written.
    Error,
    /// Configuration works but is probably wrong.
    Warning,
    /// Observation only.
    Info,
}

impl Severity {
    /// Upper-case label used by the text report.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Config path the finding is about.
    pub path: ConfigPath,
    /// Human-readable description.
    pub message: String,
    /// Diagnostic code.
    pub code: FindingCode,
    /// Severity.
    pub severity: Severity,
    /// 1-based source line of `path` (or its nearest located ancestor).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Actionable fix, when one can be stated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Structured context (`task_name`, `token`, `config_key`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    /// Create a finding with no suggestion, line, or details.
    pub fn new(
        severity: Severity,
        code: FindingCode,
        path: ConfigPath,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            message: message.into(),
            code,
            severity,
            line: None,
            suggestion: None,
            details: BTreeMap::new(),
        }
    }

    /// Shorthand for an error finding.
    pub fn error(code: FindingCode, path: ConfigPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, path, message)
    }

    /// Shorthand for a warning finding.
    pub fn warning(code: FindingCode, path: ConfigPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, path, message)
    }

    /// Shorthand for an info finding.
    pub fn info(code: FindingCode, path: ConfigPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, path, message)
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach one detail entry.
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Resolve the source line of this finding's path through `positions`.
    pub fn located(mut self, positions: &PositionIndex) -> Self {
        if self.line.is_none() {
            self.line = positions.locate(&self.path).map(|p| p.line);
        }
        self
    }

    /// Report ordering: severity, then path, then code, then message.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.code.as_str().cmp(other.code.as_str()))
            .then_with(|| self.message.cmp(&other.message))
    }

    /// True for error-severity findings.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_errors_first() {
        let mut levels = vec![Severity::Info, Severity::Error, Severity::Warning];
        levels.sort();
        assert_eq!(levels, vec![Severity::Error, Severity::Warning, Severity::Info]);
    }

    #[test]
    fn report_order_sorts_by_severity_then_path() {
        let mut findings = vec![
            Finding::warning(FindingCode::PipelineDuplicateStep, "pipeline[1]".into(), "dup"),
            Finding::error(FindingCode::SchemaMissingRequired, "web".into(), "missing"),
            Finding::error(FindingCode::PipelineUnknownTask, "pipeline[0]".into(), "unknown"),
        ];
        findings.sort_by(Finding::report_order);
        let paths: Vec<&str> = findings.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["pipeline[0]", "web", "pipeline[1]"]);
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let finding = Finding::error(
            FindingCode::PipelineUnknownToken,
            "tasks.store.params.filename".into(),
            "unknown token",
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["code"], "pipeline-unknown-token");
        assert_eq!(json["severity"], "error");
        assert!(json.get("details").is_none());
        assert!(json.get("suggestion").is_none());
    }

    #[test]
    fn details_are_kept_in_key_order() {
        let finding = Finding::info(FindingCode::RulesContextReuse, "x".into(), "m")
            .with_detail("task_name", "rules")
            .with_detail("index", 2);
        let keys: Vec<&String> = finding.details.keys().collect();
        assert_eq!(keys, vec!["index", "task_name"]);
    }
}
