//! # Configuration Scenarios
//!
//! End-to-end runs over complete configuration files: each test writes a
//! document (and any files it references) into a temporary base directory,
//! validates it with every relevant pass enabled, and checks the exact
//! findings and exit code.

use std::path::Path;

use cfgcheck_core::{Finding, FindingCode, Severity};
use cfgcheck_engine::{Report, ValidationOptions, ValidationRun};

const HEADER: &str = "\
web:
  upload_dir: uploads
watch_folder:
  dir: inbox
";

const EXTRACT: &str = "  extract:
    module: standard_step.extraction.extract_pdf
    class: ExtractPdfTask
    params:
      api_key: test-key
      agent_id: agent-1
      fields:
        supplier_name:
          alias: Supplier
          type: str
";

const CLEANUP: &str = "  cleanup:
    module: standard_step.housekeeping.cleanup
    class: CleanupTask
";

fn store(filename: &str) -> String {
    format!(
        "  store:\n    module: standard_step.storage.store_metadata_as_json\n    class: StoreMetadataAsJson\n    params:\n      data_dir: out\n      filename: \"{filename}\"\n"
    )
}

fn rules(update_field: &str, clauses: &[(&str, &str)]) -> String {
    let mut out = format!(
        "  update:\n    module: standard_step.rules.update_reference\n    class: UpdateReference\n    params:\n      reference_file: ref.csv\n      update_field: {update_field}\n      write_value: done\n      csv_match:\n        type: column_equals_all\n        clauses:\n"
    );
    for (column, context) in clauses {
        out.push_str(&format!("          - column: {column}\n            from_context: {context}\n"));
    }
    out
}

fn document(tasks: &[String], pipeline: &[&str]) -> String {
    let mut out = format!("{HEADER}tasks:\n");
    for task in tasks {
        out.push_str(task);
    }
    out.push_str("pipeline:\n");
    for step in pipeline {
        out.push_str(&format!("  - {step}\n"));
    }
    out
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for sub in ["inbox", "uploads", "out"] {
        std::fs::create_dir(dir.path().join(sub)).unwrap();
    }
    std::fs::write(dir.path().join("ref.csv"), "supplier_name,status\nAcme,open\n").unwrap();
    dir
}

fn validate(base: &Path, yaml: &str) -> Report {
    let config = base.join("config.yaml");
    std::fs::write(&config, yaml).unwrap();
    let options = ValidationOptions {
        check_files: true,
        ..ValidationOptions::with_base_dir(base)
    };
    ValidationRun::new(options).validate_file(&config).unwrap()
}

fn with_code(report: &Report, code: FindingCode) -> Vec<&Finding> {
    report.findings().filter(|f| f.code == code).collect()
}

#[test]
fn task_fragments_nest_under_tasks() {
    let yaml = document(
        &[EXTRACT.to_string(), store("{supplier_name}"), CLEANUP.to_string()],
        &["extract", "store", "cleanup"],
    );
    let doc = cfgcheck_core::ConfigDocument::parse(&yaml).unwrap();
    let names: Vec<&str> = doc.tasks().iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["extract", "store", "cleanup"]);
}

#[test]
fn complete_configuration_is_valid() {
    let dir = workspace();
    let yaml = document(
        &[
            EXTRACT.to_string(),
            store("{supplier_name}"),
            rules("status", &[("supplier_name", "supplier_name")]),
            CLEANUP.to_string(),
        ],
        &["extract", "store", "update", "cleanup"],
    );
    let report = validate(dir.path(), &yaml);
    assert!(report.errors.is_empty(), "{:#?}", report.errors);
    assert!(report.warnings.is_empty(), "{:#?}", report.warnings);
    assert_eq!(report.exit_code, 0);
}

#[test]
fn empty_tasks_and_pipeline_fail() {
    let dir = workspace();
    let report = validate(dir.path(), &format!("{HEADER}tasks: {{}}\npipeline: []\n"));
    assert_eq!(report.exit_code, 1);
    assert!(
        !with_code(&report, FindingCode::SchemaMissingRequired).is_empty()
            || !with_code(&report, FindingCode::PipelineMissingExtraction).is_empty(),
        "{:#?}",
        report.errors
    );
}

#[test]
fn undeclared_filename_token_is_reported_once() {
    let dir = workspace();
    let yaml = document(
        &[
            EXTRACT.to_string(),
            store("{supplier_name}_{invoice_amount}"),
            CLEANUP.to_string(),
        ],
        &["extract", "store", "cleanup"],
    );
    let report = validate(dir.path(), &yaml);
    let unknown = with_code(&report, FindingCode::PipelineUnknownToken);
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].details["token"], "invoice_amount");
    assert_eq!(unknown[0].path.as_str(), "tasks.store.params.filename");
    assert!(report
        .findings()
        .all(|f| f.details.get("token").and_then(|t| t.as_str()) != Some("supplier_name")));
}

#[test]
fn clause_count_outside_bounds_is_a_schema_error() {
    let dir = workspace();
    let six = vec![("supplier_name", "supplier_name"); 6];
    for clauses in [six, Vec::new()] {
        let yaml = document(
            &[EXTRACT.to_string(), rules("status", &clauses), CLEANUP.to_string()],
            &["extract", "update", "cleanup"],
        )
        .replace("        clauses:\n  cleanup:", "        clauses: []\n  cleanup:");
        let report = validate(dir.path(), &yaml);
        let cardinality: Vec<_> = with_code(&report, FindingCode::SchemaTypeMismatch)
            .into_iter()
            .filter(|f| f.path.as_str() == "tasks.update.params.csv_match.clauses")
            .collect();
        assert_eq!(cardinality.len(), 1, "{:#?}", report.errors);
        assert_eq!(report.exit_code, 1);
    }
}

#[test]
fn misplaced_housekeeping_is_a_positional_warning() {
    let dir = workspace();
    let yaml = document(
        &[EXTRACT.to_string(), store("{supplier_name}"), CLEANUP.to_string()],
        &["extract", "cleanup", "store"],
    );
    let report = validate(dir.path(), &yaml);
    let misplaced = with_code(&report, FindingCode::PipelineHousekeepingNotLast);
    assert_eq!(misplaced.len(), 1);
    assert_eq!(misplaced[0].severity, Severity::Warning);
    assert_eq!(misplaced[0].path.as_str(), "pipeline[1]");
    let suggestion = misplaced[0].suggestion.as_deref().unwrap();
    assert!(suggestion.contains("'cleanup'"), "{suggestion}");
    assert!(suggestion.contains("position 2"), "{suggestion}");
    assert!(with_code(&report, FindingCode::PipelineMissingHousekeeping).is_empty());
}

#[test]
fn column_case_mismatch_is_named() {
    let dir = workspace();
    let yaml = document(
        &[
            EXTRACT.to_string(),
            rules("Status", &[("supplier_name", "supplier_name")]),
            CLEANUP.to_string(),
        ],
        &["extract", "update", "cleanup"],
    );
    let report = validate(dir.path(), &yaml);
    let missing = with_code(&report, FindingCode::RulesColumnNotFound);
    assert_eq!(missing.len(), 1);
    assert!(missing[0].is_error());
    assert_eq!(missing[0].path.as_str(), "tasks.update.params.update_field");
    assert!(missing[0].message.contains("'status'"), "{}", missing[0].message);
    assert_eq!(missing[0].suggestion.as_deref(), Some("Change 'Status' to 'status'."));
}

#[test]
fn findings_carry_source_lines() {
    let dir = workspace();
    let yaml = document(
        &[EXTRACT.to_string(), store("{missing}"), CLEANUP.to_string()],
        &["extract", "store", "cleanup"],
    );
    let report = validate(dir.path(), &yaml);
    let unknown = with_code(&report, FindingCode::PipelineUnknownToken);
    let line = unknown[0].line.unwrap();
    assert_eq!(yaml.lines().nth(line - 1).map(str::trim), Some("filename: \"{missing}\""));
}
