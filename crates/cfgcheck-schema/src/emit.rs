//! # JSON Schema Emitter
//!
//! Produces a draft-07 JSON Schema for the configuration format, for editor
//! completion and CI linting outside of config-check itself. The emitted
//! schema mirrors the structural contract enforced by
//! [`SchemaValidator`](crate::SchemaValidator); semantic checks (token
//! resolution, ordering, CSV cross-references) cannot be expressed in JSON
//! Schema and are not part of it.
//!
//! Family parameter contracts are expressed as `if`/`then` rules keyed on
//! the task's `module` pattern.

use serde_json::{json, Value};

use crate::params::{CLAUSE_COUNT_RANGE, CONTEXT_LENGTH_RANGE, CSV_MATCH_TYPE};

const TYPE_EXPR_PATTERN: &str =
    r"^\s*(str|int|float|bool|Any|(Optional|List)\s*\[\s*(str|int|float|bool|Any)\s*\])\s*$";
const ON_ERROR_PATTERN: &str = r"^\s*([Ss][Tt][Oo][Pp]|[Cc][Oo][Nn][Tt][Ii][Nn][Uu][Ee])\s*$";
const BCRYPT_PATTERN: &str = r"^\$2[aby]\$\d{2}\$[./A-Za-z0-9]{53}$";

fn module_pattern(family: &str) -> String {
    format!(r"^(standard_step|custom_step)\.{family}\.[^.]+")
}

fn non_empty_string(description: &str) -> Value {
    json!({ "type": "string", "minLength": 1, "description": description })
}

/// `if module matches pattern then params must satisfy params_schema`.
fn family_rule(module: Value, params_schema: Value) -> Value {
    json!({
        "if": {
            "required": ["module"],
            "properties": { "module": module }
        },
        "then": {
            "required": ["params"],
            "properties": { "params": params_schema }
        }
    })
}

fn task_definition() -> Value {
    let local_drive = r"^(standard_step|custom_step)\.storage\.store_file_to_localdrive(\.|$)";
    let (min_len, max_len) = CONTEXT_LENGTH_RANGE;
    // data_dir and filename may each come from params or the storage override.
    let storage_key_rules: Vec<Value> = ["data_dir", "filename"]
        .iter()
        .map(|key| {
            json!({
                "anyOf": [
                    { "required": [key], "properties": { (*key): { "minLength": 1 } } },
                    { "required": ["storage"], "properties": { "storage": { "required": [key] } } }
                ]
            })
        })
        .collect();
    json!({
        "type": "object",
        "description": "A single task under tasks.*",
        "required": ["module", "class"],
        "properties": {
            "module": non_empty_string("Module implementing the task, e.g. standard_step.extraction.extract_pdf"),
            "class": non_empty_string("Class implementing the task"),
            "params": {
                "type": ["object", "null"],
                "description": "Keyword arguments passed to the task"
            },
            "on_error": {
                "type": "string",
                "pattern": ON_ERROR_PATTERN,
                "description": "stop or continue (case-insensitive)"
            }
        },
        "allOf": [
            family_rule(
                json!({ "pattern": module_pattern("extraction") }),
                json!({
                    "type": "object",
                    "required": ["api_key", "agent_id", "fields"],
                    "properties": {
                        "api_key": non_empty_string("Extraction provider API key"),
                        "agent_id": non_empty_string("Extraction agent identifier"),
                        "fields": {
                            "type": "object",
                            "minProperties": 1,
                            "additionalProperties": { "$ref": "#/definitions/extractionField" }
                        }
                    }
                }),
            ),
            family_rule(
                json!({ "pattern": module_pattern("storage"), "not": { "pattern": local_drive } }),
                json!({
                    "type": "object",
                    "properties": {
                        "data_dir": { "type": "string" },
                        "filename": { "type": "string" },
                        "task_slug": { "type": "string" },
                        "storage": {
                            "type": "object",
                            "properties": {
                                "data_dir": non_empty_string("Output directory override"),
                                "filename": non_empty_string("Filename template override")
                            },
                            "additionalProperties": false
                        }
                    },
                    "allOf": storage_key_rules
                }),
            ),
            family_rule(
                json!({ "pattern": local_drive }),
                json!({
                    "type": "object",
                    "required": ["files_dir", "filename"],
                    "properties": {
                        "files_dir": non_empty_string("Directory receiving the processed file"),
                        "filename": non_empty_string("Filename template")
                    }
                }),
            ),
            family_rule(
                json!({ "pattern": module_pattern("archiver") }),
                json!({
                    "type": "object",
                    "required": ["archive_dir"],
                    "properties": { "archive_dir": non_empty_string("Archive directory") }
                }),
            ),
            {
                "if": {
                    "required": ["module"],
                    "properties": { "module": { "pattern": module_pattern("context") } }
                },
                "then": {
                    "properties": {
                        "params": {
                            "type": ["object", "null"],
                            "properties": {
                                "length": { "type": "integer", "minimum": min_len, "maximum": max_len, "default": 10 }
                            }
                        }
                    }
                }
            },
            {
                "if": {
                    "required": ["module"],
                    "properties": { "module": { "pattern": module_pattern("housekeeping") } }
                },
                "then": {
                    "properties": {
                        "params": {
                            "type": ["object", "null"],
                            "properties": {
                                "processing_dir": non_empty_string("Processing directory to clean up")
                            }
                        }
                    }
                }
            },
            family_rule(
                json!({ "pattern": module_pattern("rules") }),
                json!({
                    "type": "object",
                    "required": ["reference_file", "update_field", "csv_match"],
                    "properties": {
                        "reference_file": non_empty_string("CSV file to update"),
                        "update_field": non_empty_string("Column written on match"),
                        "write_value": { "type": "string", "default": "Updated" },
                        "backup": { "type": "boolean", "default": true },
                        "task_slug": { "type": "string", "default": "update_csv_reference" },
                        "csv_match": { "$ref": "#/definitions/csvMatch" }
                    }
                }),
            ),
        ]
    })
}

fn field_definition(allow_table: bool) -> Value {
    let mut field = json!({
        "type": "object",
        "required": ["alias", "type"],
        "properties": {
            "alias": non_empty_string("Label requested from the extraction provider"),
            "type": {
                "type": "string",
                "pattern": TYPE_EXPR_PATTERN,
                "description": "str, int, float, bool, Any, Optional[T] or List[T]"
            },
            "is_table": { "type": "boolean", "default": false }
        }
    });
    if allow_table {
        field["properties"]["item_fields"] = json!({
            "type": "object",
            "minProperties": 1,
            "additionalProperties": { "$ref": "#/definitions/tableItemField" }
        });
        field["if"] = json!({
            "required": ["is_table"],
            "properties": { "is_table": { "const": true } }
        });
        field["then"] = json!({ "required": ["item_fields"] });
    } else {
        field["properties"]["is_table"] = json!({ "const": false });
    }
    field
}

/// The full draft-07 JSON Schema document.
pub fn config_schema() -> Value {
    let (min_clauses, max_clauses) = CLAUSE_COUNT_RANGE;
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Pipeline configuration",
        "description": "Configuration consumed by the document processing pipeline and validated by config-check.",
        "type": "object",
        "required": ["web", "watch_folder", "tasks", "pipeline"],
        "properties": {
            "web": {
                "type": "object",
                "required": ["upload_dir"],
                "properties": {
                    "upload_dir": non_empty_string("Directory where uploaded files are stored"),
                    "secret_key": { "type": "string" },
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
                }
            },
            "watch_folder": {
                "type": "object",
                "required": ["dir"],
                "properties": {
                    "dir": non_empty_string("Directory monitored for new files"),
                    "recursive": { "type": "boolean", "default": false },
                    "processing_dir": { "type": "string" }
                }
            },
            "authentication": {
                "type": "object",
                "required": ["username", "password_hash"],
                "properties": {
                    "username": non_empty_string("Web interface user"),
                    "password_hash": { "type": "string", "pattern": BCRYPT_PATTERN }
                }
            },
            "tasks": {
                "type": "object",
                "minProperties": 1,
                "additionalProperties": { "$ref": "#/definitions/task" }
            },
            "pipeline": {
                "type": "array",
                "minItems": 1,
                "items": { "type": "string", "pattern": r"\S" }
            },
            "logging": { "type": "object" },
            "secrets": { "type": "object" },
            "name": { "type": "string" },
            "description": { "type": "string" },
            "version": { "type": "string" }
        },
        "definitions": {
            "task": task_definition(),
            "extractionField": field_definition(true),
            "tableItemField": field_definition(false),
            "clause": {
                "type": "object",
                "required": ["column", "from_context"],
                "properties": {
                    "column": non_empty_string("CSV column compared by this clause"),
                    "from_context": non_empty_string("Dotted path into the extracted data"),
                    "number": { "type": "boolean" }
                }
            },
            "csvMatch": {
                "type": "object",
                "required": ["type", "clauses"],
                "properties": {
                    "type": { "const": CSV_MATCH_TYPE },
                    "clauses": {
                        "type": "array",
                        "minItems": min_clauses,
                        "maxItems": max_clauses,
                        "items": { "$ref": "#/definitions/clause" }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
web: {upload_dir: ./uploads}
watch_folder: {dir: ./watch}
tasks:
  extract:
    module: standard_step.extraction.extract_pdf
    class: ExtractPdfTask
    params:
      api_key: key
      agent_id: agent
      fields:
        supplier_name: {alias: Supplier, type: str}
        items:
          alias: Items
          type: List[Any]
          is_table: true
          item_fields:
            amount: {alias: Amount, type: 'Optional[float]'}
  store:
    module: standard_step.storage.store_metadata_as_json_v2
    class: StoreJson
    params:
      filename: "{supplier_name}.json"
      storage: {data_dir: ./out}
  rules:
    module: standard_step.rules.update_reference
    class: UpdateReference
    params:
      reference_file: ref.csv
      update_field: status
      csv_match:
        type: column_equals_all
        clauses:
          - {column: supplier, from_context: supplier_name}
  cleanup:
    module: standard_step.housekeeping.cleanup_task
    class: CleanupTask
    on_error: Continue
pipeline: [extract, store, rules, cleanup]
"#;

    fn validator() -> jsonschema::Validator {
        jsonschema::options()
            .with_draft(jsonschema::Draft::Draft7)
            .build(&config_schema())
            .unwrap()
    }

    fn instance(yaml: &str) -> serde_json::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn schema_compiles_and_lists_definitions() {
        let schema = config_schema();
        for name in ["task", "extractionField", "tableItemField", "clause", "csvMatch"] {
            assert!(schema["definitions"].get(name).is_some(), "missing {name}");
        }
        validator();
    }

    #[test]
    fn accepts_valid_configuration() {
        assert!(validator().is_valid(&instance(VALID)));
    }

    #[test]
    fn rejects_clause_count_out_of_bounds() {
        let six = (0..6)
            .map(|i| format!("          - {{column: c{i}, from_context: f{i}}}\n"))
            .collect::<String>();
        let yaml = VALID.replace(
            "          - {column: supplier, from_context: supplier_name}\n",
            &six,
        );
        assert!(!validator().is_valid(&instance(&yaml)));
    }

    #[test]
    fn rejects_missing_extraction_fields() {
        let yaml = VALID.replace("      agent_id: agent\n", "");
        assert!(!validator().is_valid(&instance(&yaml)));
    }

    #[test]
    fn rejects_bad_type_expression_and_nested_table() {
        let bad_type = VALID.replace("type: str}", "type: string}");
        assert!(!validator().is_valid(&instance(&bad_type)));
        let nested = VALID.replace("type: 'Optional[float]'}", "type: Any, is_table: true}");
        assert!(!validator().is_valid(&instance(&nested)));
    }

    #[test]
    fn storage_requires_data_dir_somewhere() {
        let yaml = VALID.replace("      storage: {data_dir: ./out}\n", "");
        assert!(!validator().is_valid(&instance(&yaml)));
        let top_level = VALID.replace("storage: {data_dir: ./out}", "data_dir: ./out");
        assert!(validator().is_valid(&instance(&top_level)));
    }

    #[test]
    fn filename_may_come_from_storage_override() {
        let moved = VALID.replace(
            "      filename: \"{supplier_name}.json\"\n      storage: {data_dir: ./out}\n",
            "      storage: {data_dir: ./out, filename: out.json}\n",
        );
        assert_ne!(moved, VALID);
        assert!(validator().is_valid(&instance(&moved)));
        let missing = VALID.replace("      filename: \"{supplier_name}.json\"\n", "");
        assert!(!validator().is_valid(&instance(&missing)));
    }

    #[test]
    fn bracketed_type_expressions_survive_flow_mappings() {
        let value = instance(VALID);
        let amount = &value["tasks"]["extract"]["params"]["fields"]["items"]["item_fields"]["amount"];
        assert_eq!(amount["type"], "Optional[float]");
    }

    #[test]
    fn rejects_non_mapping_root() {
        assert!(!validator().is_valid(&instance("- a\n- b\n")));
    }
}
