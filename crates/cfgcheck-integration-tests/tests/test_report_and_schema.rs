//! # Reports and Exported Schema
//!
//! The JSON report shape consumed by tooling, the text report layout, and
//! the exported JSON Schema checked against real configuration documents.

use cfgcheck_engine::{ValidationOptions, ValidationRun};
use cfgcheck_schema::config_schema;
use serde_json::Value;

const CONFIG: &str = "\
web:
  upload_dir: uploads
watch_folder:
  dir: inbox
  surprise: true
tasks:
  extract:
    module: standard_step.extraction.extract_pdf
    class: ExtractPdfTask
    params:
      api_key: k
      agent_id: a
      fields:
        supplier_name: {alias: Supplier, type: str}
  store:
    module: standard_step.storage.store_metadata_as_json
    class: StoreMetadataAsJson
    params:
      data_dir: out
      filename: \"{supplier_name}_{total}\"
  cleanup:
    module: standard_step.housekeeping.cleanup
    class: CleanupTask
pipeline:
  - extract
  - store
  - cleanup
";

fn run() -> cfgcheck_engine::Report {
    ValidationRun::new(ValidationOptions::with_base_dir("/nonexistent-base")).validate_text(CONFIG)
}

#[test]
fn json_report_has_the_documented_shape() {
    let json: Value = serde_json::from_str(&run().render_json().unwrap()).unwrap();
    for key in ["status", "errors", "warnings", "info", "stats", "exit_code"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["status"], "invalid");
    assert_eq!(json["exit_code"], 1);

    let error = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["code"] == "pipeline-unknown-token")
        .unwrap();
    assert_eq!(error["path"], "tasks.store.params.filename");
    assert_eq!(error["severity"], "error");
    assert_eq!(error["details"]["token"], "total");
    assert!(error["message"].is_string());

    let warning = json["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["code"] == "schema-unknown-key")
        .unwrap();
    assert_eq!(warning["path"], "watch_folder.surprise");

    let stats = &json["stats"];
    assert_eq!(stats["tasks"], 3);
    assert_eq!(stats["pipeline_steps"], 3);
    assert_eq!(
        stats["total"].as_u64().unwrap(),
        stats["errors"].as_u64().unwrap()
            + stats["warnings"].as_u64().unwrap()
            + stats["info"].as_u64().unwrap()
    );
}

#[test]
fn text_report_lists_errors_before_warnings() {
    let text = run().render_text();
    let errors = text.find("ERRORS:").unwrap();
    let warnings = text.find("WARNINGS:").unwrap();
    assert!(errors < warnings);
    assert!(text.contains("[ERROR] tasks.store.params.filename (line "));
    assert!(text.contains("    Suggestion: "));
    assert!(text.trim_end().ends_with("info messages."));
    assert!(text.contains("Validation failed with "));
}

#[test]
fn exported_schema_accepts_and_rejects_documents() {
    let schema = config_schema();
    let validator = jsonschema::options()
        .with_draft(jsonschema::Draft::Draft7)
        .build(&schema)
        .unwrap();

    let valid: serde_yaml::Value = serde_yaml::from_str(&CONFIG.replace("  surprise: true\n", "")).unwrap();
    let valid = serde_json::to_value(valid).unwrap();
    assert!(validator.is_valid(&valid));

    let invalid = serde_json::json!({"tasks": {}, "pipeline": "extract"});
    assert!(!validator.is_valid(&invalid));
}

#[test]
fn schema_subcommand_output_parses() {
    use cfgcheck_cli::schema::{render_schema, SchemaArgs, SchemaFormat};
    let text = render_schema(&SchemaArgs {
        format: SchemaFormat::Json,
    })
    .unwrap();
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, config_schema());
}
