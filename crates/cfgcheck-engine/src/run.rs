//! # Validation Run
//!
//! Sequences the passes over one document:
//!
//! 1. load (syntax and encoding failures become a single `yaml-error`),
//! 2. schema (stops the run when the root is not a mapping),
//! 3. paths, imports, pipeline, rules,
//! 4. performance and security when enabled.
//!
//! Each pass returns its own findings; the run locates them in the source,
//! sorts them into report order, and builds the [`Report`]. The same
//! document, options, and filesystem state always give the same report.

use std::path::Path;

use cfgcheck_audit::{PerformanceAnalyzer, SecurityAnalyzer};
use cfgcheck_core::{ConfigDocument, ConfigPath, Finding, FindingCode, ParseFailure, ParseFailureKind};
use cfgcheck_pipeline::PipelineAnalyzer;
use cfgcheck_probe::{ImportProber, PathProber, SourceTreeResolver};
use cfgcheck_rules::RulesValidator;
use cfgcheck_schema::SchemaValidator;

use crate::error::EngineError;
use crate::options::ValidationOptions;
use crate::report::Report;

/// One configured validation run. Holds no state between documents.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    options: ValidationOptions,
}

struct Collector {
    findings: Vec<Finding>,
    passes: Vec<String>,
}

impl Collector {
    fn new() -> Self {
        Self {
            findings: Vec::new(),
            passes: Vec::new(),
        }
    }

    fn add(&mut self, pass: &str, findings: Vec<Finding>) {
        tracing::trace!(pass, collected = findings.len(), "findings collected");
        self.passes.push(pass.to_string());
        self.findings.extend(findings);
    }
}

impl ValidationRun {
    /// Run configured by `options`.
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// The run's options.
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Load and validate the file at `path`.
    ///
    /// Only an unreadable file is an `Err`; syntax and encoding failures
    /// are reported as a `yaml-error` finding.
    pub fn validate_file(&self, path: &Path) -> Result<Report, EngineError> {
        match ConfigDocument::load(path) {
            Ok(document) => Ok(self.validate_document(&document)),
            Err(failure) if failure.kind == ParseFailureKind::Unreadable => {
                Err(EngineError::Unreadable {
                    path: path.to_path_buf(),
                    reason: failure.message,
                })
            }
            Err(failure) => Ok(parse_failure_report(&failure)),
        }
    }

    /// Validate YAML text.
    pub fn validate_text(&self, text: &str) -> Report {
        match ConfigDocument::parse(text) {
            Ok(document) => self.validate_document(&document),
            Err(failure) => parse_failure_report(&failure),
        }
    }

    /// Validate an already loaded document.
    pub fn validate_document(&self, document: &ConfigDocument) -> Report {
        let options = &self.options;
        let mut collector = Collector::new();

        let schema = SchemaValidator::new(options.strict, options.unknown_keys).validate(document);
        collector.add("schema", schema.findings);

        if schema.root_is_mapping {
            collector.add(
                "paths",
                PathProber::new(&options.base_dir)
                    .with_dynamic_paths(options.check_files)
                    .probe(document),
            );

            let tasks = document.tasks();
            if options.import_checks {
                let resolver = SourceTreeResolver::new(options.module_roots());
                collector.add("imports", ImportProber::new(resolver).probe(&tasks));
            }

            collector.add("pipeline", PipelineAnalyzer::new().analyze(document));
            collector.add(
                "rules",
                RulesValidator::new(&options.base_dir)
                    .with_file_checks(options.check_files)
                    .validate(document),
            );

            if options.performance_analysis {
                collector.add("performance", PerformanceAnalyzer::default().analyze(document));
            }
            if options.security_analysis {
                collector.add("security", SecurityAnalyzer::new(&options.base_dir).analyze(document));
            }
        }

        let positions = document.positions();
        let mut findings: Vec<Finding> = collector
            .findings
            .into_iter()
            .map(|finding| finding.located(positions))
            .collect();
        findings.sort_by(Finding::report_order);

        let pipeline_steps = document
            .get("pipeline")
            .and_then(|p| p.as_sequence())
            .map_or(0, |steps| steps.len());
        let report = Report::new(findings, document.tasks().len(), pipeline_steps, collector.passes);
        tracing::info!(
            status = %report.status,
            errors = report.stats.errors,
            warnings = report.stats.warnings,
            info = report.stats.info,
            "validation finished"
        );
        report
    }
}

fn parse_failure_report(failure: &ParseFailure) -> Report {
    tracing::debug!(kind = %failure.kind, "document failed to parse");
    let mut finding = Finding::error(
        FindingCode::YamlError,
        ConfigPath::root(),
        format!("Configuration could not be parsed ({}): {}", failure.kind, failure.message),
    )
    .with_suggestion("Fix the YAML syntax at the reported line.");
    finding.line = failure.line;
    if let Some(column) = failure.column {
        finding = finding.with_detail("column", column);
    }
    Report::new(vec![finding], 0, 0, vec!["load".to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Status, EXIT_ERRORS};

    const VALID: &str = "\
web:
  upload_dir: uploads
watch_folder:
  dir: inbox
tasks:
  extract:
    module: standard_step.extraction.extract_pdf
    class: ExtractPdfTask
    params:
      api_key: key
      agent_id: agent
      fields:
        supplier_name:
          alias: Supplier
          type: str
  store:
    module: standard_step.storage.store_metadata_as_json
    class: StoreMetadataAsJson
    params:
      data_dir: out
      filename: \"{supplier_name}\"
  cleanup:
    module: standard_step.housekeeping.cleanup
    class: CleanupTask
pipeline:
  - extract
  - store
  - cleanup
";

    #[test]
    fn root_not_mapping_stops_after_schema() {
        let run = ValidationRun::new(ValidationOptions::default());
        let report = run.validate_text("- a\n- b\n");
        assert_eq!(report.stats.total, 1);
        assert_eq!(report.errors[0].code, FindingCode::SchemaRootNotMapping);
        assert_eq!(report.stats.passes, vec!["schema".to_string()]);
    }

    #[test]
    fn syntax_error_becomes_single_finding() {
        let run = ValidationRun::new(ValidationOptions::default());
        let report = run.validate_text("tasks:\n  a: [unclosed\n");
        assert_eq!(report.stats.total, 1);
        assert_eq!(report.errors[0].code, FindingCode::YamlError);
        assert!(report.errors[0].line.is_some());
        assert_eq!(report.exit_code, EXIT_ERRORS);
    }

    #[test]
    fn unreadable_file_is_an_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let run = ValidationRun::new(ValidationOptions::with_base_dir(dir.path()));
        let err = run.validate_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, EngineError::Unreadable { .. }));
    }

    #[test]
    fn optional_passes_follow_flags() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = ValidationOptions::with_base_dir(dir.path());
        let base = ValidationRun::new(options.clone()).validate_text(VALID);
        assert_eq!(base.stats.passes, vec!["schema", "paths", "pipeline", "rules"]);

        options.import_checks = true;
        options.performance_analysis = true;
        options.security_analysis = true;
        let full = ValidationRun::new(options).validate_text(VALID);
        assert_eq!(
            full.stats.passes,
            vec!["schema", "paths", "imports", "pipeline", "rules", "performance", "security"]
        );
        assert!(full
            .findings()
            .any(|f| f.code == FindingCode::TaskImportModuleNotFound));
    }

    #[test]
    fn findings_are_located_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inbox")).unwrap();
        let yaml = VALID.replace("\"{supplier_name}\"", "\"{supplier_name}_{invoice_amount}\"");
        let report = ValidationRun::new(ValidationOptions::with_base_dir(dir.path())).validate_text(&yaml);
        let unknown: Vec<_> = report
            .errors
            .iter()
            .filter(|f| f.code == FindingCode::PipelineUnknownToken)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].line.is_some());
        let all: Vec<&Finding> = report.findings().collect();
        assert!(all.windows(2).all(|w| w[0].report_order(w[1]).is_le()));
        assert_eq!(report.stats.tasks, 3);
        assert_eq!(report.stats.pipeline_steps, 3);
    }

    #[test]
    fn clean_document_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inbox")).unwrap();
        let report = ValidationRun::new(ValidationOptions::with_base_dir(dir.path())).validate_text(VALID);
        assert_eq!(report.status, Status::Valid, "{:#?}", report.errors);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn runs_are_idempotent(extra in "[a-z_]{1,10}", step in "[a-z]{1,6}") {
                let yaml = format!("{VALID}  - {step}\n{extra}: 1\n");
                let run = ValidationRun::new(ValidationOptions::with_base_dir("/nonexistent-base"));
                prop_assert_eq!(run.validate_text(&yaml), run.validate_text(&yaml));
            }
        }
    }
}
