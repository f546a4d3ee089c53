//! # Validation Invariants
//!
//! Properties that must hold for every run regardless of document
//! content: a non-mapping root short-circuits, runs are repeatable,
//! missing housekeeping is reported exactly once, duplicate clauses are
//! counted independently of their order, and escaped braces are never
//! tokens.

use cfgcheck_core::FindingCode;
use cfgcheck_engine::{Report, ValidationOptions, ValidationRun};
use proptest::prelude::*;

fn run(yaml: &str) -> Report {
    ValidationRun::new(ValidationOptions::with_base_dir("/nonexistent-base")).validate_text(yaml)
}

fn count(report: &Report, code: FindingCode) -> usize {
    report.findings().filter(|f| f.code == code).count()
}

const TASKS: &str = "\
web:
  upload_dir: uploads
watch_folder:
  dir: inbox
tasks:
  extract:
    module: standard_step.extraction.extract_pdf
    class: ExtractPdfTask
    params:
      api_key: k
      agent_id: a
      fields:
        supplier_name: {alias: Supplier, type: str}
        invoice_number: {alias: Number, type: str}
  store:
    module: standard_step.storage.store_metadata_as_json
    class: StoreMetadataAsJson
    params:
      data_dir: out
      filename: \"{supplier_name}\"
  cleanup:
    module: standard_step.housekeeping.cleanup
    class: CleanupTask
";

#[test]
fn non_mapping_roots_yield_exactly_one_finding() {
    for yaml in ["", "~\n", "- a\n- b\n", "plain text\n", "42\n", "true\n"] {
        let report = run(yaml);
        assert_eq!(report.stats.total, 1, "{yaml:?}: {:#?}", report.errors);
        assert_eq!(report.errors[0].code, FindingCode::SchemaRootNotMapping);
        assert_eq!(report.exit_code, 1);
    }
}

#[test]
fn missing_housekeeping_is_reported_once() {
    let report = run(&format!("{TASKS}pipeline: [extract, store]\n"));
    assert_eq!(count(&report, FindingCode::PipelineMissingHousekeeping), 1);
    assert_eq!(count(&report, FindingCode::PipelineHousekeepingNotLast), 0);
    assert_eq!(count(&report, FindingCode::PipelineExtractionBeforeStorage), 0);
}

#[test]
fn missing_housekeeping_is_not_masked_by_ordering_errors() {
    let report = run(&format!("{TASKS}pipeline: [store, extract]\n"));
    assert_eq!(count(&report, FindingCode::PipelineMissingHousekeeping), 1);
    assert_eq!(count(&report, FindingCode::PipelineExtractionBeforeStorage), 1);
}

fn with_rules(clauses: &[(&str, &str)]) -> String {
    let mut yaml = format!(
        "{TASKS}  update:\n    module: standard_step.rules.update_reference\n    class: UpdateReference\n    params:\n      reference_file: ref.csv\n      update_field: status\n      csv_match:\n        type: column_equals_all\n        clauses:\n"
    );
    for (column, context) in clauses {
        yaml.push_str(&format!("          - {{column: {column}, from_context: {context}}}\n"));
    }
    yaml.push_str("pipeline: [extract, store, update, cleanup]\n");
    yaml
}

#[test]
fn duplicate_clause_counted_independently_of_order() {
    let orders: [&[(&str, &str)]; 3] = [
        &[("x", "supplier_name"), ("x", "supplier_name"), ("y", "invoice_number")],
        &[("x", "supplier_name"), ("y", "invoice_number"), ("x", "supplier_name")],
        &[("y", "invoice_number"), ("x", "supplier_name"), ("x", "supplier_name")],
    ];
    for clauses in orders {
        let report = run(&with_rules(clauses));
        assert_eq!(count(&report, FindingCode::RulesDuplicateClause), 1, "{clauses:?}");
    }
}

#[test]
fn escaped_tokens_are_never_unknown() {
    let yaml = format!("{TASKS}pipeline: [extract, store, cleanup]\n").replace(
        "filename: \"{supplier_name}\"",
        "filename: \"{{escaped}}_{supplier_name}_{{also_escaped}}\"",
    );
    let report = run(&yaml);
    assert_eq!(count(&report, FindingCode::PipelineUnknownToken), 0, "{:#?}", report.errors);
    assert_eq!(count(&report, FindingCode::PipelineMalformedToken), 0);
}

#[test]
fn repeated_runs_are_identical_with_filesystem_probes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("inbox")).unwrap();
    std::fs::write(dir.path().join("ref.csv"), "supplier_name,status\n").unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, with_rules(&[("Supplier_Name", "data.supplier_name")])).unwrap();
    let options = ValidationOptions {
        check_files: true,
        import_checks: true,
        performance_analysis: true,
        security_analysis: true,
        ..ValidationOptions::with_base_dir(dir.path())
    };
    let run = ValidationRun::new(options);
    let first = run.validate_file(&config).unwrap();
    let second = run.validate_file(&config).unwrap();
    assert!(first.stats.total > 0);
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn runs_are_repeatable(
        filename in "[a-z_{}]{0,24}",
        steps in proptest::collection::vec(prop_oneof!["extract", "store", "cleanup", "ghost"], 0..6),
    ) {
        let yaml = format!("{TASKS}pipeline: [{}]\n", steps.join(", "))
            .replace("\"{supplier_name}\"", &format!("{filename:?}"));
        prop_assert_eq!(run(&yaml), run(&yaml));
    }

    #[test]
    fn double_braced_names_never_surface_as_unknown(name in "[a-z][a-z0-9_]{0,12}") {
        let yaml = format!("{TASKS}pipeline: [extract, store, cleanup]\n")
            .replace("\"{supplier_name}\"", &format!("\"{{{{{name}}}}}\""));
        let report = run(&yaml);
        prop_assert_eq!(count(&report, FindingCode::PipelineUnknownToken), 0);
    }
}
