//! # Report
//!
//! The aggregated result of a run and its two renderings.
//!
//! Findings arrive sorted (`Finding::report_order`) and are split by
//! severity into `errors`, `warnings`, and `info`. The exit code is derived
//! from the split: `1` with any error, `2` with warnings but no errors,
//! `0` otherwise. Info findings never change the exit code.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use cfgcheck_core::{Finding, Severity};

/// Exit code for a run with no errors or warnings.
pub const EXIT_VALID: u8 = 0;
/// Exit code for a run with at least one error.
pub const EXIT_ERRORS: u8 = 1;
/// Exit code for a run with warnings but no errors.
pub const EXIT_WARNINGS: u8 = 2;
/// Exit code for invocation failures (bad flags, unreadable config).
pub const EXIT_USAGE: u8 = 64;

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No errors or warnings.
    Valid,
    /// Warnings but no errors.
    Warning,
    /// At least one error.
    Invalid,
}

impl Status {
    /// Lower-case name used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Warning => "warning",
            Self::Invalid => "invalid",
        }
    }

    /// Process exit code for this status.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Valid => EXIT_VALID,
            Self::Warning => EXIT_WARNINGS,
            Self::Invalid => EXIT_ERRORS,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for the JSON report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// All findings.
    pub total: usize,
    /// Error findings.
    pub errors: usize,
    /// Warning findings.
    pub warnings: usize,
    /// Info findings.
    pub info: usize,
    /// Task definitions in the document.
    pub tasks: usize,
    /// Entries in `pipeline`.
    pub pipeline_steps: usize,
    /// Passes that ran, in order.
    pub passes: Vec<String>,
}

/// Result of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Overall verdict.
    pub status: Status,
    /// Error findings in report order.
    pub errors: Vec<Finding>,
    /// Warning findings in report order.
    pub warnings: Vec<Finding>,
    /// Info findings in report order.
    pub info: Vec<Finding>,
    /// Counts.
    pub stats: Stats,
    /// Process exit code.
    pub exit_code: u8,
}

impl Report {
    /// Build a report from findings already in report order.
    pub fn new(findings: Vec<Finding>, tasks: usize, pipeline_steps: usize, passes: Vec<String>) -> Self {
        let total = findings.len();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut info = Vec::new();
        for finding in findings {
            match finding.severity {
                Severity::Error => errors.push(finding),
                Severity::Warning => warnings.push(finding),
                Severity::Info => info.push(finding),
            }
        }
        let status = if !errors.is_empty() {
            Status::Invalid
        } else if !warnings.is_empty() {
            Status::Warning
        } else {
            Status::Valid
        };
        let stats = Stats {
            total,
            errors: errors.len(),
            warnings: warnings.len(),
            info: info.len(),
            tasks,
            pipeline_steps,
            passes,
        };
        Self {
            status,
            errors,
            warnings,
            info,
            stats,
            exit_code: status.exit_code(),
        }
    }

    /// All findings in report order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.errors.iter().chain(&self.warnings).chain(&self.info)
    }

    /// True when nothing at all was reported.
    pub fn is_clean(&self) -> bool {
        self.stats.total == 0
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "Validation passed with no issues found.".to_string();
        }
        let verdict = if self.status == Status::Invalid {
            "failed"
        } else {
            "passed"
        };
        format!(
            "Validation {verdict} with {}, {}, {}.",
            plural(self.stats.errors, "error"),
            plural(self.stats.warnings, "warning"),
            plural(self.stats.info, "info message"),
        )
    }

    /// Human-readable report grouped by severity.
    pub fn render_text(&self) -> String {
        if self.is_clean() {
            return format!("{}\n", self.summary());
        }
        let mut out = String::new();
        let sections = [
            ("ERRORS:", &self.errors),
            ("WARNINGS:", &self.warnings),
            ("INFO:", &self.info),
        ];
        for (heading, findings) in sections {
            if findings.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{heading}");
            let _ = writeln!(out, "{}", "=".repeat(heading.len()));
            for finding in findings.iter() {
                render_finding(&mut out, finding);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary());
        out
    }

    /// Pretty-printed JSON report.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn render_finding(out: &mut String, finding: &Finding) {
    let _ = write!(out, "  [{}] {}", finding.severity.label(), finding.path);
    if let Some(line) = finding.line {
        let _ = write!(out, " (line {line})");
    }
    let _ = writeln!(out, ": {}", finding.message);
    if let Some(suggestion) = &finding.suggestion {
        let _ = writeln!(out, "    Suggestion: {suggestion}");
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
