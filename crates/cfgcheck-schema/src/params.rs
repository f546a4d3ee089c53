//! Family-specific parameter contracts.
//!
//! Each task's `params` is checked against the contract of the family its
//! `module` resolves to. Tasks in `TaskFamily::Unknown` carry arbitrary
//! parameters and are not checked here.

use serde_yaml::{Mapping, Value};

use cfgcheck_core::{describe_value, ConfigPath, Finding, FindingCode, StorageKind, TaskFamily, TypeExpr};

use crate::validate::{present, Checker};

const EXTRACTION_PARAMS: &[&str] = &["api_key", "agent_id", "fields"];
const METADATA_STORAGE_PARAMS: &[&str] = &["data_dir", "filename", "storage", "extraction", "task_slug"];
const LOCAL_DRIVE_PARAMS: &[&str] = &["files_dir", "filename"];
const STORAGE_OVERRIDE_KEYS: &[&str] = &["data_dir", "filename"];
const ARCHIVER_PARAMS: &[&str] = &["archive_dir"];
const CONTEXT_PARAMS: &[&str] = &["length"];
const HOUSEKEEPING_PARAMS: &[&str] = &["processing_dir"];
const RULES_PARAMS: &[&str] = &[
    "reference_file",
    "update_field",
    "write_value",
    "backup",
    "task_slug",
    "csv_match",
];
const CSV_MATCH_KEYS: &[&str] = &["type", "clauses"];
const CLAUSE_KEYS: &[&str] = &["column", "from_context", "number"];
const FIELD_KEYS: &[&str] = &["alias", "type", "is_table", "item_fields"];

/// The only supported `csv_match.type`.
pub const CSV_MATCH_TYPE: &str = "column_equals_all";
/// Inclusive bounds on `csv_match.clauses` length.
pub const CLAUSE_COUNT_RANGE: (usize, usize) = (1, 5);
/// Inclusive bounds on context `length`.
pub const CONTEXT_LENGTH_RANGE: (i64, i64) = (5, 21);

pub(crate) fn check_family(
    checker: &mut Checker,
    task: &str,
    family: TaskFamily,
    params: &Mapping,
    path: &ConfigPath,
) {
    let allowed = match family {
        TaskFamily::Extraction => {
            extraction(checker, task, params, path);
            EXTRACTION_PARAMS
        }
        TaskFamily::Storage(StorageKind::Metadata) => {
            metadata_storage(checker, params, path);
            METADATA_STORAGE_PARAMS
        }
        TaskFamily::Storage(StorageKind::LocalDrive) => {
            checker.required_string(params, "files_dir", path);
            checker.required_string(params, "filename", path);
            LOCAL_DRIVE_PARAMS
        }
        TaskFamily::Archiver => {
            checker.required_string(params, "archive_dir", path);
            ARCHIVER_PARAMS
        }
        TaskFamily::Context => {
            let (min, max) = CONTEXT_LENGTH_RANGE;
            checker.optional_int_range(params, "length", path, min, max);
            CONTEXT_PARAMS
        }
        TaskFamily::Housekeeping => {
            checker.optional_non_empty_string(params, "processing_dir", path);
            HOUSEKEEPING_PARAMS
        }
        TaskFamily::Rules => {
            rules(checker, params, path);
            RULES_PARAMS
        }
        TaskFamily::Unknown => return,
    };
    if checker.recursive() {
        checker.unknown_keys(params, path, allowed);
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

fn extraction(checker: &mut Checker, task: &str, params: &Mapping, path: &ConfigPath) {
    checker.required_string(params, "api_key", path);
    checker.required_string(params, "agent_id", path);

    let fields_path = path.key("fields");
    let Some(fields) = checker.required_mapping(params, "fields", path) else {
        return;
    };
    if fields.is_empty() {
        checker.push(
            Finding::error(
                FindingCode::SchemaMissingRequired,
                fields_path,
                "Extraction task must declare at least one field",
            )
            .with_suggestion("Add a 'fields' mapping describing the data to extract.")
            .with_detail("task_name", task),
        );
        return;
    }

    let mut tables = Vec::new();
    for (key, spec) in fields {
        let Some(key) = key.as_str() else {
            continue;
        };
        if field(checker, key, spec, &fields_path.key(key), false) {
            tables.push(key.to_string());
        }
    }

    if tables.len() > 1 {
        checker.push(
            Finding::warning(
                FindingCode::SchemaTableCardinality,
                fields_path,
                format!(
                    "Only one table field is supported per extraction task; found {} ({})",
                    tables.len(),
                    tables.join(", ")
                ),
            )
            .with_suggestion(format!(
                "Leave only one field with is_table: true (currently: {}) or split tables into separate extraction tasks.",
                tables.join(", ")
            ))
            .with_detail("task_name", task)
            .with_detail("fields", tables),
        );
    }
}

/// Check one field spec. Returns true when it is a table field.
fn field(checker: &mut Checker, key: &str, spec: &Value, path: &ConfigPath, nested: bool) -> bool {
    let Some(spec) = spec.as_mapping() else {
        checker.push(
            Finding::error(
                FindingCode::SchemaTypeMismatch,
                path.clone(),
                format!("Field definition must be a mapping, found {}", describe_value(spec)),
            )
            .with_suggestion(format!("Define field '{key}' as a mapping with alias and type."))
            .with_detail("field", key),
        );
        return false;
    };

    match present(spec, "alias") {
        Some(Value::String(alias)) if !alias.trim().is_empty() => {}
        Some(other) if !other.is_string() => checker.mismatch(path.key("alias"), "a string", other),
        _ => checker.push(
            Finding::error(
                FindingCode::SchemaMissingRequired,
                path.key("alias"),
                "Field alias must be a non-empty string",
            )
            .with_suggestion(format!("Add an 'alias' for field '{key}' (e.g., alias: Supplier)."))
            .with_detail("field", key),
        ),
    }

    match present(spec, "type") {
        None => {
            checker.missing(path, "type");
        }
        Some(Value::String(expr)) => {
            if let Err(err) = expr.parse::<TypeExpr>() {
                checker.push(
                    Finding::error(FindingCode::SchemaInvalidEnum, path.key("type"), err.to_string())
                        .with_suggestion(format!(
                            "Set the type for field '{key}' to one of str, int, float, bool, Any, Optional[T], or List[T]."
                        ))
                        .with_detail("field", key),
                );
            }
        }
        Some(other) => checker.mismatch(path.key("type"), "a type expression string", other),
    }

    let is_table = match present(spec, "is_table") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            checker.mismatch(path.key("is_table"), "a boolean (true or false)", other);
            false
        }
    };

    if checker.recursive() {
        checker.unknown_keys(spec, path, FIELD_KEYS);
    }

    if !is_table {
        return false;
    }
    if nested {
        checker.push(
            Finding::error(
                FindingCode::SchemaTypeMismatch,
                path.key("is_table"),
                "Table item fields cannot themselves be tables",
            )
            .with_detail("field", key),
        );
        return false;
    }

    let items_path = path.key("item_fields");
    match present(spec, "item_fields") {
        Some(Value::Mapping(items)) if !items.is_empty() => {
            for (sub_key, sub_spec) in items {
                if let Some(sub_key) = sub_key.as_str() {
                    field(checker, sub_key, sub_spec, &items_path.key(sub_key), true);
                }
            }
        }
        Some(Value::Mapping(_)) | None => checker.push(
            Finding::error(
                FindingCode::SchemaMissingRequired,
                items_path,
                "item_fields must be provided for table fields",
            )
            .with_suggestion(format!(
                "Define item_fields for table field '{key}' describing the columns returned."
            ))
            .with_detail("field", key),
        ),
        Some(other) => checker.mismatch(items_path, "a mapping", other),
    }
    true
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

fn metadata_storage(checker: &mut Checker, params: &Mapping, path: &ConfigPath) {
    let override_map = checker.optional_mapping(params, "storage", path);
    if let Some(storage) = override_map {
        checker.unknown_keys(storage, &path.key("storage"), STORAGE_OVERRIDE_KEYS);
    }
    for key in ["data_dir", "filename"] {
        match override_map.filter(|m| present(m, key).is_some()) {
            Some(storage) => {
                checker.required_string(storage, key, &path.key("storage"));
            }
            None => {
                checker.required_string(params, key, path);
            }
        }
    }
    checker.optional_string(params, "task_slug", path);
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn rules(checker: &mut Checker, params: &Mapping, path: &ConfigPath) {
    checker.required_string(params, "reference_file", path);
    checker.required_string(params, "update_field", path);
    checker.optional_string(params, "write_value", path);
    checker.optional_bool(params, "backup", path);
    checker.optional_string(params, "task_slug", path);

    let match_path = path.key("csv_match");
    let Some(csv_match) = checker.required_mapping(params, "csv_match", path) else {
        return;
    };

    match present(csv_match, "type") {
        None => checker.missing(&match_path, "type"),
        Some(Value::String(kind)) if kind == CSV_MATCH_TYPE => {}
        Some(other) => checker.push(
            Finding::error(
                FindingCode::SchemaInvalidEnum,
                match_path.key("type"),
                format!(
                    "csv_match.type must be '{CSV_MATCH_TYPE}', found {}",
                    other.as_str().map(|s| format!("'{s}'")).unwrap_or_else(|| describe_value(other).to_string())
                ),
            )
            .with_suggestion(format!("Set csv_match.type to '{CSV_MATCH_TYPE}'.")),
        ),
    }

    if checker.recursive() {
        checker.unknown_keys(csv_match, &match_path, CSV_MATCH_KEYS);
    }

    let clauses_path = match_path.key("clauses");
    let clauses = match present(csv_match, "clauses") {
        None => {
            checker.missing(&match_path, "clauses");
            return;
        }
        Some(Value::Sequence(clauses)) => clauses,
        Some(other) => {
            checker.mismatch(clauses_path, "a list of clause mappings", other);
            return;
        }
    };

    let (min, max) = CLAUSE_COUNT_RANGE;
    if clauses.len() < min || clauses.len() > max {
        checker.push(
            Finding::error(
                FindingCode::SchemaTypeMismatch,
                clauses_path.clone(),
                format!(
                    "csv_match.clauses must contain between {min} and {max} clauses, found {}",
                    clauses.len()
                ),
            )
            .with_suggestion(format!(
                "Provide between {min} and {max} clause definitions in csv_match.clauses."
            ))
            .with_detail("count", clauses.len()),
        );
    }

    for (index, clause) in clauses.iter().enumerate() {
        let clause_path = clauses_path.index(index);
        let Some(clause) = clause.as_mapping() else {
            checker.push(
                Finding::error(
                    FindingCode::SchemaTypeMismatch,
                    clause_path,
                    format!("Clause must be a mapping, found {}", describe_value(clause)),
                )
                .with_suggestion(format!(
                    "Ensure clause[{index}] is a mapping with column and from_context entries."
                ))
                .with_detail("index", index),
            );
            continue;
        };
        checker.required_string(clause, "column", &clause_path);
        checker.required_string(clause, "from_context", &clause_path);
        checker.optional_bool(clause, "number", &clause_path);
        if checker.recursive() {
            checker.unknown_keys(clause, &clause_path, CLAUSE_KEYS);
        }
    }
}
