//! # Pipeline Dependency Analysis
//!
//! The pipeline is a total order, so dependency checking is a single
//! forward pass. The analyzer carries an accumulator of what earlier steps
//! have produced (extraction field keys, whether a context task has run)
//! and evaluates each step against it.
//!
//! ## Token Resolution
//!
//! Every task definition is first checked on its own. A token name
//! resolves to, in order of precedence:
//!
//! 1. a scalar extraction field declared by any extraction task,
//! 2. a table field (`pipeline-non-scalar-token`, warning),
//! 3. a context key (`id`, `nanoid`, `filename`, ...).
//!
//! Anything else is `pipeline-unknown-token`.
//!
//! Field tokens are then resolved again at each pipeline step, against the
//! fields produced by the extraction steps before it. A storage or archiver
//! step with unresolved field tokens is `pipeline-extraction-before-storage`;
//! any other step gets `pipeline-unknown-token` at the parameter that uses
//! the token. A field that is also a context key falls back to the context
//! value until an extraction step produces it.
//!
//! ## Ordering Invariants
//!
//! - At least one extraction task runs.
//! - A storage or archiver task using extraction-field tokens runs after an
//!   extraction task declaring those fields.
//! - A task using `{nanoid}` runs after a context task.
//! - A housekeeping task runs, and runs last.
//! - Repeated steps are flagged but allowed.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cfgcheck_core::{
    extraction_fields, ConfigDocument, ConfigPath, Finding, FindingCode, TaskDefinition,
    TaskFamily, CONTEXT_KEYS,
};

use crate::token::scan_tokens;

/// How a token name resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A scalar extraction field.
    ScalarField,
    /// An `is_table: true` extraction field.
    TableField,
    /// A runtime context key.
    Context,
    /// Nothing provides it.
    Unknown,
}

/// Extraction fields declared across all extraction tasks.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog<'a> {
    scalars: BTreeSet<&'a str>,
    tables: BTreeSet<&'a str>,
    by_task: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> FieldCatalog<'a> {
    /// Collect the fields of every extraction task in `tasks`.
    pub fn collect(tasks: &[TaskDefinition<'a>]) -> Self {
        let mut catalog = Self::default();
        for task in tasks {
            if task.family != TaskFamily::Extraction {
                continue;
            }
            let Some(params) = task.params else { continue };
            let fields = extraction_fields(params);
            let keys = catalog.by_task.entry(task.name).or_default();
            for field in &fields {
                keys.push(field.key);
                if field.is_table {
                    catalog.tables.insert(field.key);
                } else {
                    catalog.scalars.insert(field.key);
                }
            }
        }
        catalog
    }

    /// Resolve `name` by precedence: scalar field, table field, context key.
    pub fn classify(&self, name: &str) -> TokenKind {
        if self.scalars.contains(name) {
            TokenKind::ScalarField
        } else if self.tables.contains(name) {
            TokenKind::TableField
        } else if CONTEXT_KEYS.contains(&name) {
            TokenKind::Context
        } else {
            TokenKind::Unknown
        }
    }

    /// Whether `name` is any declared field.
    pub fn is_field(&self, name: &str) -> bool {
        self.scalars.contains(name) || self.tables.contains(name)
    }

    /// Field keys declared by extraction task `task`.
    pub fn fields_of(&self, task: &str) -> &[&'a str] {
        self.by_task.get(task).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Walks `pipeline` against `tasks` and reports ordering and token problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineAnalyzer;

#[derive(Debug, Default)]
struct Accumulator<'a> {
    available_fields: BTreeSet<&'a str>,
    extraction_seen: bool,
    context_seen: bool,
    housekeeping_at: Option<usize>,
    occurrences: HashMap<&'a str, usize>,
}

impl PipelineAnalyzer {
    /// Analyzer with default behaviour.
    pub fn new() -> Self {
        Self
    }

    /// Analyze `document`. Does nothing unless `pipeline` is a list; the
    /// schema pass reports other shapes.
    pub fn analyze(&self, document: &ConfigDocument) -> Vec<Finding> {
        let Some(raw_pipeline) = document.get("pipeline").and_then(|v| v.as_sequence()) else {
            return Vec::new();
        };
        let tasks = document.tasks();
        let catalog = FieldCatalog::collect(&tasks);
        let mut findings = Vec::new();

        let mut task_tokens: HashMap<&str, TokenUses<'_>> = HashMap::new();
        for task in &tasks {
            let tokens = self.check_task_tokens(task, &catalog, &mut findings);
            task_tokens.insert(task.name, tokens);
        }

        let by_name: HashMap<&str, &TaskDefinition<'_>> =
            tasks.iter().map(|t| (t.name, t)).collect();
        let pipeline_path = ConfigPath::root().key("pipeline");
        let mut acc = Accumulator::default();
        let mut unresolved_reported: BTreeSet<(&str, &str)> = BTreeSet::new();

        for entry in document.pipeline() {
            let path = pipeline_path.index(entry.index);
            let count = acc.occurrences.entry(entry.name).or_insert(0);
            *count += 1;
            if *count > 1 {
                findings.push(
                    Finding::warning(
                        FindingCode::PipelineDuplicateStep,
                        path.clone(),
                        format!(
                            "Task '{}' appears multiple times in pipeline (occurrence {})",
                            entry.name, count
                        ),
                    )
                    .with_suggestion(format!(
                        "Confirm whether '{}' needs to run twice or remove the duplicate pipeline entry.",
                        entry.name
                    ))
                    .with_detail("task_name", entry.name),
                );
            }

            let Some(task) = by_name.get(entry.name) else {
                findings.push(
                    Finding::error(
                        FindingCode::PipelineUnknownTask,
                        path,
                        format!("Task name '{}' not found under tasks", entry.name),
                    )
                    .with_suggestion(format!(
                        "Add tasks.{0} or remove '{0}' from the pipeline.",
                        entry.name
                    ))
                    .with_detail("task_name", entry.name),
                );
                continue;
            };
            let empty = TokenUses::new();
            let tokens = task_tokens.get(task.name).unwrap_or(&empty);
            let pending: Vec<&str> = tokens
                .keys()
                .copied()
                .filter(|t| {
                    catalog.is_field(t)
                        && !acc.available_fields.contains(t)
                        && !CONTEXT_KEYS.contains(t)
                })
                .collect();

            if task.family.writes_output() {
                if !pending.is_empty() {
                    findings.push(
                        Finding::error(
                            FindingCode::PipelineExtractionBeforeStorage,
                            path.clone(),
                            format!(
                                "{} task '{}' uses extracted data tokens ({}) but no extraction task providing them runs earlier",
                                family_label(task.family),
                                task.name,
                                pending.join(", ")
                            ),
                        )
                        .with_suggestion(format!(
                            "Move an extraction task before '{}' or remove extraction tokens from its parameters.",
                            task.name
                        ))
                        .with_detail("task_name", task.name)
                        .with_detail("tokens", pending),
                    );
                }
            } else {
                for token in pending {
                    if !unresolved_reported.insert((task.name, token)) {
                        continue;
                    }
                    let keys = tokens.get(token).map(Vec::as_slice).unwrap_or(&[]);
                    for key in keys {
                        findings.push(unresolved_field_token(task.name, key, token));
                    }
                }
            }

            if task.family != TaskFamily::Context
                && tokens.contains_key("nanoid")
                && !acc.available_fields.contains("nanoid")
                && !acc.context_seen
            {
                findings.push(
                    Finding::error(
                        FindingCode::PipelineContextBeforeToken,
                        path.clone(),
                        format!(
                            "Task '{}' references {{nanoid}} but no context initializer task precedes it",
                            task.name
                        ),
                    )
                    .with_suggestion(format!(
                        "Schedule a context initializer (e.g., assign_nanoid) before '{}'.",
                        task.name
                    ))
                    .with_detail("task_name", task.name)
                    .with_detail("token", "nanoid"),
                );
            }

            match task.family {
                TaskFamily::Extraction => {
                    acc.extraction_seen = true;
                    acc.available_fields.extend(catalog.fields_of(task.name));
                }
                TaskFamily::Context => acc.context_seen = true,
                TaskFamily::Housekeeping => acc.housekeeping_at = Some(entry.index),
                _ => {}
            }
        }

        if !acc.extraction_seen {
            findings.push(
                Finding::error(
                    FindingCode::PipelineMissingExtraction,
                    pipeline_path.clone(),
                    "Pipeline must include at least one extraction task to produce metadata for downstream steps",
                )
                .with_suggestion(
                    "Add an extraction task (e.g., standard_step.extraction.extract_pdf) before downstream steps.",
                ),
            );
        }

        let last_index = raw_pipeline.len().saturating_sub(1);
        match acc.housekeeping_at {
            None => {
                let defined: Vec<&str> = tasks
                    .iter()
                    .filter(|t| t.family == TaskFamily::Housekeeping)
                    .map(|t| t.name)
                    .collect();
                let suggestion = match defined.first() {
                    Some(name) => format!("Append '{name}' as the last pipeline step."),
                    None => "Define a housekeeping task (e.g., standard_step.housekeeping.cleanup) and append it as the last pipeline step.".to_string(),
                };
                findings.push(
                    Finding::error(
                        FindingCode::PipelineMissingHousekeeping,
                        pipeline_path,
                        "Pipeline must include a housekeeping task as the final step",
                    )
                    .with_suggestion(suggestion),
                );
            }
            Some(index) if index != last_index => {
                let name = raw_pipeline
                    .get(index)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .unwrap_or_default();
                let last = raw_pipeline
                    .get(last_index)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .unwrap_or_default();
                findings.push(
                    Finding::warning(
                        FindingCode::PipelineHousekeepingNotLast,
                        pipeline_path.index(index),
                        format!(
                            "Housekeeping task '{name}' is step {} of {}; it should be the final pipeline step",
                            index + 1,
                            raw_pipeline.len()
                        ),
                    )
                    .with_suggestion(format!(
                        "Move '{name}' from position {} to the end of the pipeline, after '{last}'.",
                        index + 1
                    ))
                    .with_detail("task_name", name)
                    .with_detail("position", index + 1),
                );
            }
            Some(_) => {}
        }

        tracing::debug!(pass = "pipeline", findings = findings.len(), "pass complete");
        findings
    }

    /// Report token problems in one task's string parameters and return the
    /// distinct token names it uses, each with the parameter keys using it.
    fn check_task_tokens<'a>(
        &self,
        task: &TaskDefinition<'a>,
        catalog: &FieldCatalog<'_>,
        findings: &mut Vec<Finding>,
    ) -> TokenUses<'a> {
        let mut names = TokenUses::new();
        let params_path = ConfigPath::root().key("tasks").key(task.name).key("params");

        for (key, value) in task.string_params() {
            let path = params_path.key(&key);
            let scan = scan_tokens(value);
            let mut reported = BTreeSet::new();

            for token in &scan.tokens {
                if !reported.insert(token.name) {
                    continue;
                }
                names.entry(token.name).or_default().push(key.clone());
                match catalog.classify(token.name) {
                    TokenKind::ScalarField | TokenKind::Context => {}
                    TokenKind::TableField => findings.push(
                        Finding::warning(
                            FindingCode::PipelineNonScalarToken,
                            path.clone(),
                            format!(
                                "Token '{{{}}}' refers to table field '{}', which holds a list of rows rather than a single value",
                                token.name, token.name
                            ),
                        )
                        .with_suggestion(format!(
                            "Expose '{}' as a scalar extraction field before '{}' runs or update {} to remove the '{{{}}}' placeholder.",
                            token.name, task.name, path, token.name
                        ))
                        .with_detail("task_name", task.name)
                        .with_detail("token", token.name)
                        .with_detail("config_key", path.as_str()),
                    ),
                    TokenKind::Unknown => findings.push(
                        Finding::error(
                            FindingCode::PipelineUnknownToken,
                            path.clone(),
                            format!(
                                "Unknown template token '{}'. Add an extraction field or update the template.",
                                token.name
                            ),
                        )
                        .with_suggestion(format!(
                            "Add scalar extraction field '{}' or update {} to remove the '{{{}}}' placeholder.",
                            token.name, path, token.name
                        ))
                        .with_detail("task_name", task.name)
                        .with_detail("token", token.name)
                        .with_detail("config_key", path.as_str()),
                    ),
                }
            }

            for bad in &scan.malformed {
                findings.push(
                    Finding::warning(
                        FindingCode::PipelineMalformedToken,
                        path.clone(),
                        format!("Malformed placeholder '{}': {}", bad.fragment, bad.reason),
                    )
                    .with_suggestion(
                        "Write placeholders as {name}, or double the braces ({{...}}) for literal text.",
                    )
                    .with_detail("task_name", task.name)
                    .with_detail("fragment", bad.fragment.as_str())
                    .with_detail("offset", bad.offset),
                );
            }
        }
        names
    }
}

/// Token name to the parameter keys (relative to `params`) that use it.
type TokenUses<'a> = BTreeMap<&'a str, Vec<String>>;

fn unresolved_field_token(task: &str, key: &str, token: &str) -> Finding {
    let path = ConfigPath::root().key("tasks").key(task).key("params").key(key);
    Finding::error(
        FindingCode::PipelineUnknownToken,
        path.clone(),
        format!(
            "Token '{token}' is not produced by any extraction step that runs before '{task}'"
        ),
    )
    .with_suggestion(format!(
        "Schedule the extraction task declaring '{token}' before '{task}' or update {path} to remove the '{{{token}}}' placeholder."
    ))
    .with_detail("task_name", task)
    .with_detail("token", token)
    .with_detail("config_key", path.as_str())
}

fn family_label(family: TaskFamily) -> &'static str {
    match family {
        TaskFamily::Archiver => "Archiver",
        _ => "Storage",
    }
}
