//! # Rules-Task Validation
//!
//! Checks every `rules`-family task (CSV update-by-match):
//!
//! 1. With file checks on, the reference CSV is read once for its header
//!    row. Empty, headerless, and unparseable files are findings.
//! 2. `update_field` and each clause `column` must be a CSV header. Headers
//!    are case-sensitive; near misses are named in the message.
//! 3. Clauses are compared pairwise: verbatim duplicates, columns matched
//!    against several context values, and context values feeding several
//!    columns.
//! 4. Each `from_context` is parsed as a dotted path and its first segment
//!    is looked up among the declared extraction fields.
//! 5. Type and naming heuristics: `number: false` against a numeric field,
//!    and references that resemble no declared field.
//!
//! A missing reference file is left to the path prober, which probes every
//! `_file` parameter under the same flag.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use cfgcheck_core::{
    extraction_fields, ConfigDocument, ConfigPath, Finding, FindingCode, TaskDefinition,
    TaskFamily, TypeExpr,
};
use cfgcheck_probe::resolve_path;

use crate::context::ContextPath;
use crate::reference::{probe_csv, CsvProbeError, CsvShape};

/// Column-name fragments that usually mean numeric content.
const NUMERIC_COLUMN_HINTS: &[&str] = &[
    "amount", "total", "price", "cost", "value", "sum", "count", "number", "qty", "quantity",
    "rate", "percent", "tax", "fee", "balance", "credit", "debit", "subtotal",
];

/// Field-name fragments typical of document extraction.
const COMMON_FIELD_HINTS: &[&str] = &[
    "invoice", "date", "amount", "total", "supplier", "vendor", "customer", "address", "phone",
    "email", "number", "id", "reference", "order", "purchase", "tax", "description", "item",
    "quantity", "price", "cost", "name", "status",
];

/// Jaro-Winkler similarity at or above which two names count as the same
/// name misspelt.
const SIMILARITY_THRESHOLD: f64 = 0.85;

/// One `csv_match.clauses` item.
#[derive(Debug, Clone, Copy)]
struct Clause<'a> {
    index: usize,
    column: Option<&'a str>,
    from_context: Option<&'a str>,
    number: Option<bool>,
}

impl<'a> Clause<'a> {
    fn from_mapping(index: usize, map: &'a Mapping) -> Self {
        Self {
            index,
            column: map.get("column").and_then(Value::as_str).map(str::trim),
            from_context: map.get("from_context").and_then(Value::as_str).map(str::trim),
            number: map.get("number").and_then(Value::as_bool),
        }
    }
}

/// Extraction field keys and declared types across all extraction tasks.
#[derive(Debug, Default)]
struct DeclaredFields<'a> {
    types: BTreeMap<&'a str, Option<TypeExpr>>,
}

impl<'a> DeclaredFields<'a> {
    fn collect(tasks: &[TaskDefinition<'a>]) -> Self {
        let mut types = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.family == TaskFamily::Extraction) {
            if let Some(params) = task.params {
                for field in extraction_fields(params) {
                    types.entry(field.key).or_insert(field.type_expr);
                }
            }
        }
        Self { types }
    }

    fn contains(&self, key: &str) -> bool {
        self.types.contains_key(key)
    }

    fn is_numeric(&self, key: &str) -> bool {
        matches!(self.types.get(key), Some(Some(t)) if t.is_numeric())
    }

    fn closest(&self, name: &str) -> Option<&'a str> {
        closest_match(name, self.types.keys().copied())
    }
}

fn closest_match<'n>(name: &str, candidates: impl Iterator<Item = &'n str>) -> Option<&'n str> {
    let lowered = name.to_lowercase();
    candidates
        .map(|c| (c, strsim::jaro_winkler(&lowered, &c.to_lowercase())))
        .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
}

/// Validates rules-family tasks.
#[derive(Debug, Clone)]
pub struct RulesValidator {
    base_dir: PathBuf,
    check_files: bool,
}

impl RulesValidator {
    /// Validator resolving `reference_file` against `base_dir`. The CSV is
    /// not opened until file checks are enabled.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            check_files: false,
        }
    }

    /// Read reference CSVs and check column names against their headers.
    pub fn with_file_checks(mut self, enabled: bool) -> Self {
        self.check_files = enabled;
        self
    }

    /// Validate every rules task in `document`.
    pub fn validate(&self, document: &ConfigDocument) -> Vec<Finding> {
        let tasks = document.tasks();
        let fields = DeclaredFields::collect(&tasks);
        let mut findings = Vec::new();
        for task in tasks.iter().filter(|t| t.family == TaskFamily::Rules) {
            self.validate_task(task, &fields, &mut findings);
        }
        tracing::debug!(pass = "rules", findings = findings.len(), "pass complete");
        findings
    }

    fn validate_task(
        &self,
        task: &TaskDefinition<'_>,
        fields: &DeclaredFields<'_>,
        findings: &mut Vec<Finding>,
    ) {
        let params = ConfigPath::root().key("tasks").key(task.name).key("params");
        let clauses_path = params.key("csv_match").key("clauses");
        let clauses: Vec<Clause<'_>> = task
            .param("csv_match")
            .and_then(Value::as_mapping)
            .and_then(|m| m.get("clauses"))
            .and_then(Value::as_sequence)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| item.as_mapping().map(|m| Clause::from_mapping(i, m)))
                    .collect()
            })
            .unwrap_or_default();

        let shape = if self.check_files {
            self.probe_reference(task, &params, findings)
        } else {
            None
        };
        if let Some(shape) = &shape {
            check_columns(task, shape, &params, &clauses_path, &clauses, findings);
        }
        check_clause_uniqueness(task, &clauses_path, &clauses, findings);
        for clause in &clauses {
            check_context(task, &clauses_path, clause, fields, findings);
        }
    }

    fn probe_reference(
        &self,
        task: &TaskDefinition<'_>,
        params: &ConfigPath,
        findings: &mut Vec<Finding>,
    ) -> Option<CsvShape> {
        let raw = task.param_str("reference_file")?.trim();
        if raw.is_empty() || raw.contains('{') {
            return None;
        }
        let path = params.key("reference_file");
        let resolved = resolve_path(raw, &self.base_dir);

        let shape = match probe_csv(&resolved) {
            Ok(shape) => shape,
            Err(CsvProbeError::NotFound(_)) => return None,
            Err(err) => {
                let (code, suggestion) = match &err {
                    CsvProbeError::Empty(_) => (
                        FindingCode::RulesCsvEmpty,
                        "Add a header row and the reference rows to the CSV file.",
                    ),
                    CsvProbeError::MissingHeaders(_) => (
                        FindingCode::RulesCsvMissingHeaders,
                        "Make the first row of the CSV file the column names.",
                    ),
                    _ => (
                        FindingCode::RulesCsvNotReadable,
                        "Check that the file is readable, UTF-8 encoded, and has the same number of fields on every row.",
                    ),
                };
                findings.push(
                    Finding::error(code, path, format!("Reference CSV for task '{}': {err}", task.name))
                        .with_suggestion(suggestion)
                        .with_detail("task_name", task.name)
                        .with_detail("path", resolved.display().to_string()),
                );
                return None;
            }
        };

        if shape.rows == 0 {
            findings.push(
                Finding::warning(
                    FindingCode::RulesCsvEmpty,
                    path,
                    format!(
                        "Reference CSV '{raw}' has a header row but no data rows; task '{}' will never match",
                        task.name
                    ),
                )
                .with_suggestion("Add reference rows to the CSV file.")
                .with_detail("task_name", task.name)
                .with_detail("path", resolved.display().to_string()),
            );
        }
        Some(shape)
    }
}

fn check_columns(
    task: &TaskDefinition<'_>,
    shape: &CsvShape,
    params: &ConfigPath,
    clauses_path: &ConfigPath,
    clauses: &[Clause<'_>],
    findings: &mut Vec<Finding>,
) {
    let mut targets: Vec<(ConfigPath, &str, &str)> = Vec::new();
    if let Some(update) = task.param_str("update_field").map(str::trim) {
        targets.push((params.key("update_field"), update, "Update field"));
    }
    for clause in clauses {
        if let Some(column) = clause.column {
            targets.push((clauses_path.index(clause.index).key("column"), column, "Clause column"));
        }
    }

    for (path, column, label) in targets {
        if column.is_empty() || shape.has_column(column) {
            continue;
        }
        let headers = shape.headers.join(", ");
        let case_match = shape.headers.iter().find(|h| h.eq_ignore_ascii_case(column));
        let (message, suggestion) = match case_match {
            Some(actual) => (
                format!(
                    "{label} '{column}' not found in CSV headers ({headers}); the header is '{actual}' (column names are case-sensitive)"
                ),
                format!("Change '{column}' to '{actual}'."),
            ),
            None => {
                let near = closest_match(column, shape.headers.iter().map(String::as_str));
                let suggestion = match near {
                    Some(near) => format!("Did you mean '{near}'? Use one of: {headers}."),
                    None => format!("Use one of: {headers}."),
                };
                (
                    format!("{label} '{column}' not found in CSV headers ({headers})"),
                    suggestion,
                )
            }
        };
        findings.push(
            Finding::error(FindingCode::RulesColumnNotFound, path, message)
                .with_suggestion(suggestion)
                .with_detail("task_name", task.name)
                .with_detail("column", column)
                .with_detail("available_columns", shape.headers.clone()),
        );
    }
}

fn check_clause_uniqueness(
    task: &TaskDefinition<'_>,
    clauses_path: &ConfigPath,
    clauses: &[Clause<'_>],
    findings: &mut Vec<Finding>,
) {
    let mut seen: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut contexts_by_column: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut columns_by_context: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut indices_by_column: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut indices_by_context: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for clause in clauses {
        let (Some(column), Some(context)) = (clause.column, clause.from_context) else {
            continue;
        };
        if let Some(first) = seen.get(&(column, context)) {
            findings.push(
                Finding::error(
                    FindingCode::RulesDuplicateClause,
                    clauses_path.index(clause.index),
                    format!(
                        "Duplicate clause: column='{column}', from_context='{context}' repeats clause {first}"
                    ),
                )
                .with_suggestion(format!("Remove clause {} from csv_match.clauses.", clause.index))
                .with_detail("task_name", task.name)
                .with_detail("duplicate_of", *first),
            );
            continue;
        }
        seen.insert((column, context), clause.index);
        contexts_by_column.entry(column).or_default().insert(context);
        columns_by_context.entry(context).or_default().insert(column);
        indices_by_column.entry(column).or_default().push(clause.index);
        indices_by_context.entry(context).or_default().push(clause.index);
    }

    for (column, contexts) in &contexts_by_column {
        if contexts.len() < 2 {
            continue;
        }
        let indices = &indices_by_column[column];
        findings.push(
            Finding::warning(
                FindingCode::RulesImpossibleCondition,
                clauses_path.clone(),
                format!(
                    "Multiple clauses match column '{column}' (clauses {indices:?}); all must hold at once, so a row matches only when the context values agree"
                ),
            )
            .with_suggestion(format!("Keep one clause for column '{column}'."))
            .with_detail("task_name", task.name)
            .with_detail("column", *column)
            .with_detail("clauses", indices.clone()),
        );
    }

    for (context, columns) in &columns_by_context {
        if columns.len() < 2 {
            continue;
        }
        let indices = &indices_by_context[context];
        findings.push(
            Finding::info(
                FindingCode::RulesContextReuse,
                clauses_path.clone(),
                format!(
                    "Multiple clauses read context '{context}' (clauses {indices:?}); this may be intentional"
                ),
            )
            .with_detail("task_name", task.name)
            .with_detail("from_context", *context)
            .with_detail("clauses", indices.clone()),
        );
    }
}

fn check_context(
    task: &TaskDefinition<'_>,
    clauses_path: &ConfigPath,
    clause: &Clause<'_>,
    fields: &DeclaredFields<'_>,
    findings: &mut Vec<Finding>,
) {
    let Some(raw) = clause.from_context else { return };
    let clause_path = clauses_path.index(clause.index);
    let path = clause_path.key("from_context");

    let context = match ContextPath::parse(raw) {
        Ok(context) => context,
        Err(err) => {
            findings.push(
                Finding::error(
                    FindingCode::RulesContextPathInvalid,
                    path,
                    format!("Invalid context path: {err}"),
                )
                .with_suggestion(
                    "Write from_context as dot-separated identifiers, e.g. supplier_name or invoice.total.",
                )
                .with_detail("task_name", task.name)
                .with_detail("from_context", raw),
            );
            return;
        }
    };

    if context.has_data_prefix() {
        let replacement = context.without_prefix();
        findings.push(
            Finding::warning(
                FindingCode::RulesDeprecatedDataPrefix,
                path.clone(),
                format!(
                    "Deprecated 'data.' prefix in context path '{raw}'; use '{replacement}' instead"
                ),
            )
            .with_suggestion(format!("Change from_context to '{replacement}'."))
            .with_detail("task_name", task.name)
            .with_detail("suggested_replacement", replacement),
        );
    }

    let field = context.field();
    let declared = fields.contains(field);
    let near = if declared { None } else { fields.closest(field) };

    if !declared && !fields.types.is_empty() {
        let mut finding = Finding::warning(
            FindingCode::RulesFieldNotFound,
            path.clone(),
            format!("Field '{field}' is not declared by any extraction task"),
        )
        .with_detail("task_name", task.name)
        .with_detail("field", field);
        finding = match near {
            Some(near) => finding.with_suggestion(format!("Did you mean '{near}'?")),
            None => finding.with_suggestion(format!(
                "Declare '{field}' under the fields of an extraction task."
            )),
        };
        findings.push(finding);
    }

    if clause.number == Some(false) {
        let column = clause.column.unwrap_or_default();
        let reason = if fields.is_numeric(field) {
            Some(format!("extraction field '{field}' is declared numeric"))
        } else if !declared && looks_numeric(column) {
            Some(format!("column '{column}' looks numeric"))
        } else {
            None
        };
        if let Some(reason) = reason {
            findings.push(
                Finding::warning(
                    FindingCode::RulesSemanticTypeMismatch,
                    clause_path.clone(),
                    format!("Clause compares as text (number: false) but {reason}"),
                )
                .with_suggestion("Remove 'number: false' or check the declared field type.")
                .with_detail("task_name", task.name)
                .with_detail("field", field),
            );
        }
    }

    if !declared && near.is_none() && !looks_common(field) {
        findings.push(
            Finding::info(
                FindingCode::RulesUnrealisticFieldReference,
                path,
                format!(
                    "Field reference '{field}' does not resemble any declared extraction field or common extraction name"
                ),
            )
            .with_suggestion("Verify this field exists in your extraction configuration.")
            .with_detail("task_name", task.name)
            .with_detail("field", field),
        );
    }
}

fn looks_numeric(column: &str) -> bool {
    let lowered = column.to_lowercase();
    NUMERIC_COLUMN_HINTS.iter().any(|hint| lowered.contains(hint))
}

fn looks_common(field: &str) -> bool {
    let lowered = field.to_lowercase();
    COMMON_FIELD_HINTS.iter().any(|hint| lowered.contains(hint))
}
