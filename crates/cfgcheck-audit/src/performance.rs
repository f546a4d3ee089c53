//! Performance analysis: flags configurations whose size is likely to make
//! extraction or the pipeline slow.

use serde_yaml::Value;

use cfgcheck_core::{
    extraction_fields, ConfigDocument, ConfigPath, Finding, FindingCode, TaskDefinition,
    TaskFamily,
};

/// Size limits the performance pass checks against. A count above a
/// limit triggers the finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceThresholds {
    /// Fields per extraction task (warning).
    pub fields_warning: usize,
    /// Fields per extraction task (error).
    pub fields_error: usize,
    /// Table fields per extraction task (info).
    pub tables_info: usize,
    /// Table fields per extraction task (warning).
    pub tables_warning: usize,
    /// Pipeline steps (warning).
    pub pipeline_warning: usize,
    /// Pipeline steps (error).
    pub pipeline_error: usize,
    /// Extraction steps in the pipeline (warning).
    pub extraction_steps: usize,
    /// Rules steps in the pipeline (info).
    pub rules_steps: usize,
    /// Segments in a clause's `from_context` (info).
    pub context_depth: usize,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            fields_warning: 20,
            fields_error: 50,
            tables_info: 1,
            tables_warning: 3,
            pipeline_warning: 15,
            pipeline_error: 30,
            extraction_steps: 2,
            rules_steps: 5,
            context_depth: 4,
        }
    }
}

/// The `--performance-analysis` pass.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    thresholds: PerformanceThresholds,
}

impl PerformanceAnalyzer {
    /// Analyzer with custom thresholds.
    pub fn with_thresholds(thresholds: PerformanceThresholds) -> Self {
        Self { thresholds }
    }

    /// Analyze `document`.
    pub fn analyze(&self, document: &ConfigDocument) -> Vec<Finding> {
        let tasks = document.tasks();
        let mut findings = Vec::new();
        for task in &tasks {
            match task.family {
                TaskFamily::Extraction => self.extraction(task, &mut findings),
                TaskFamily::Rules => self.rules(task, &mut findings),
                _ => {}
            }
        }
        self.pipeline(document, &tasks, &mut findings);
        tracing::debug!(pass = "performance", findings = findings.len(), "pass complete");
        findings
    }

    fn extraction(&self, task: &TaskDefinition<'_>, findings: &mut Vec<Finding>) {
        let Some(params) = task.params else { return };
        let fields = extraction_fields(params);
        let path = ConfigPath::root()
            .key("tasks")
            .key(task.name)
            .key("params")
            .key("fields");
        let t = &self.thresholds;

        let count = fields.len();
        if count > t.fields_error {
            findings.push(
                Finding::error(
                    FindingCode::PerformanceExcessiveFieldsCritical,
                    path.clone(),
                    format!(
                        "Extraction task '{}' has {count} fields, which may severely impact performance",
                        task.name
                    ),
                )
                .with_suggestion(format!("Reduce to under {} fields or split the task.", t.fields_warning))
                .with_detail("task_name", task.name)
                .with_detail("field_count", count)
                .with_detail("critical_threshold", t.fields_error),
            );
        } else if count > t.fields_warning {
            findings.push(
                Finding::warning(
                    FindingCode::PerformanceExcessiveFields,
                    path.clone(),
                    format!("Extraction task '{}' has {count} fields", task.name),
                )
                .with_suggestion(format!("Reduce to under {} fields for optimal performance.", t.fields_warning))
                .with_detail("task_name", task.name)
                .with_detail("field_count", count)
                .with_detail("recommended_max", t.fields_warning),
            );
        }

        let tables = fields.iter().filter(|f| f.is_table).count();
        let table_finding = if tables > t.tables_warning {
            Some(Finding::warning(
                FindingCode::PerformanceMultipleTables,
                path,
                format!(
                    "Extraction task '{}' has {tables} table fields, which may impact performance",
                    task.name
                ),
            ))
        } else if tables > t.tables_info {
            Some(Finding::info(
                FindingCode::PerformanceMultipleTables,
                path,
                format!("Extraction task '{}' has {tables} table fields", task.name),
            ))
        } else {
            None
        };
        if let Some(finding) = table_finding {
            findings.push(
                finding
                    .with_suggestion("Consolidate table data or split it into separate extraction tasks.")
                    .with_detail("task_name", task.name)
                    .with_detail("table_field_count", tables),
            );
        }
    }

    fn rules(&self, task: &TaskDefinition<'_>, findings: &mut Vec<Finding>) {
        let Some(clauses) = task
            .param("csv_match")
            .and_then(Value::as_mapping)
            .and_then(|m| m.get("clauses"))
            .and_then(Value::as_sequence)
        else {
            return;
        };
        let deep = clauses
            .iter()
            .filter_map(|c| c.get("from_context").and_then(Value::as_str))
            .filter(|ctx| ctx.split('.').count() > self.thresholds.context_depth)
            .count();
        if deep == 0 {
            return;
        }
        findings.push(
            Finding::info(
                FindingCode::PerformanceComplexContextPaths,
                ConfigPath::root()
                    .key("tasks")
                    .key(task.name)
                    .key("params")
                    .key("csv_match")
                    .key("clauses"),
                format!(
                    "Rules task '{}' has {deep} clause(s) with context paths deeper than {} segments",
                    task.name, self.thresholds.context_depth
                ),
            )
            .with_suggestion("Flatten the context path structure.")
            .with_detail("task_name", task.name)
            .with_detail("complex_clause_count", deep)
            .with_detail("total_clauses", clauses.len()),
        );
    }

    fn pipeline(
        &self,
        document: &ConfigDocument,
        tasks: &[TaskDefinition<'_>],
        findings: &mut Vec<Finding>,
    ) {
        let Some(raw) = document.get("pipeline").and_then(Value::as_sequence) else {
            return;
        };
        let t = &self.thresholds;
        let path = ConfigPath::root().key("pipeline");
        let steps = raw.len();

        if steps > t.pipeline_error {
            findings.push(
                Finding::error(
                    FindingCode::PerformanceExcessivePipelineLengthCritical,
                    path.clone(),
                    format!("Pipeline has {steps} steps, which may severely impact processing time"),
                )
                .with_suggestion(format!("Reduce the pipeline to under {} steps.", t.pipeline_warning))
                .with_detail("task_count", steps)
                .with_detail("critical_threshold", t.pipeline_error),
            );
        } else if steps > t.pipeline_warning {
            findings.push(
                Finding::warning(
                    FindingCode::PerformanceExcessivePipelineLength,
                    path.clone(),
                    format!("Pipeline has {steps} steps (recommended: at most {})", t.pipeline_warning),
                )
                .with_suggestion("Remove or merge pipeline steps.")
                .with_detail("task_count", steps)
                .with_detail("recommended_max", t.pipeline_warning),
            );
        }

        let family_of = |name: &str| tasks.iter().find(|task| task.name == name).map(|task| task.family);
        let mut extraction = Vec::new();
        let mut rules = Vec::new();
        for entry in document.pipeline() {
            match family_of(entry.name) {
                Some(TaskFamily::Extraction) => extraction.push(entry.name),
                Some(TaskFamily::Rules) => rules.push(entry.name),
                _ => {}
            }
        }

        if extraction.len() > t.extraction_steps {
            findings.push(
                Finding::warning(
                    FindingCode::PerformanceMultipleExtractionTasks,
                    path.clone(),
                    format!(
                        "Pipeline runs {} extraction steps ({}); each one calls the extraction provider",
                        extraction.len(),
                        extraction.join(", ")
                    ),
                )
                .with_suggestion("Merge the field sets into fewer extraction tasks.")
                .with_detail("extraction_tasks", extraction),
            );
        }
        if rules.len() > t.rules_steps {
            findings.push(
                Finding::info(
                    FindingCode::PerformanceMultipleRulesTasks,
                    path,
                    format!("Pipeline runs {} rules steps", rules.len()),
                )
                .with_suggestion("Consolidate rules logic into fewer tasks.")
                .with_detail("rules_tasks", rules),
            );
        }
    }
}
