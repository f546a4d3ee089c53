//! # Import Prober
//!
//! Confirms that each task's `module` resolves and that `class` names an
//! instantiable export of it. Checks stop at the first failing stage:
//! module resolution, then name lookup, then kind.

use cfgcheck_core::{ConfigPath, Finding, FindingCode, TaskDefinition};

use crate::resolver::{ModuleResolver, ResolveError};

/// How many available names a class-not-found message lists.
const LISTED_ATTRIBUTES: usize = 5;

/// Checks task `module`/`class` references through a [`ModuleResolver`].
#[derive(Debug, Clone)]
pub struct ImportProber<R> {
    resolver: R,
}

impl<R: ModuleResolver> ImportProber<R> {
    /// Prober backed by `resolver`.
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Probe every task with a string `module` and `class`. Tasks missing
    /// either are left to structural validation.
    pub fn probe(&self, tasks: &[TaskDefinition<'_>]) -> Vec<Finding> {
        tasks.iter().filter_map(|task| self.probe_task(task)).collect()
    }

    fn probe_task(&self, task: &TaskDefinition<'_>) -> Option<Finding> {
        let module = task.module.map(str::trim).filter(|m| !m.is_empty())?;
        let class = task.class.map(str::trim).filter(|c| !c.is_empty())?;
        let task_path = ConfigPath::root().key("tasks").key(task.name);

        let exports = match self.resolver.resolve(module) {
            Ok(exports) => exports,
            Err(err) => return Some(module_failure(&task_path, task.name, module, &err)),
        };
        tracing::debug!(task = task.name, module, source = %exports.source.display(), "module resolved");

        let class_path = task_path.key("class");
        let Some(kind) = exports.names.get(class) else {
            let available: Vec<&str> = exports
                .names
                .keys()
                .map(String::as_str)
                .filter(|name| !name.starts_with('_'))
                .collect();
            let mut listed = available
                .iter()
                .take(LISTED_ATTRIBUTES)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            if available.len() > LISTED_ATTRIBUTES {
                listed.push_str("...");
            }
            if listed.is_empty() {
                listed.push_str("none");
            }
            return Some(
                Finding::error(
                    FindingCode::TaskImportClassNotFound,
                    class_path,
                    format!(
                        "Class '{class}' not found in module '{module}'. Available attributes: {listed}."
                    ),
                )
                .with_suggestion(format!(
                    "Verify that class '{class}' is defined in module '{module}'."
                ))
                .with_detail("task_name", task.name)
                .with_detail("module", module)
                .with_detail("class", class)
                .with_detail("available_attributes", available),
            );
        };

        if kind.is_instantiable() {
            return None;
        }
        Some(
            Finding::error(
                FindingCode::TaskImportNotCallable,
                class_path,
                format!(
                    "Attribute '{class}' in module '{module}' is not a class (found {}).",
                    kind.as_str()
                ),
            )
            .with_suggestion(format!(
                "Ensure '{class}' references a task class, not a function or constant."
            ))
            .with_detail("task_name", task.name)
            .with_detail("module", module)
            .with_detail("class", class)
            .with_detail("actual_type", kind.as_str()),
        )
    }
}

fn module_failure(task_path: &ConfigPath, task: &str, module: &str, err: &ResolveError) -> Finding {
    let path = task_path.key("module");
    let finding = match err {
        ResolveError::NotFound { .. } | ResolveError::InvalidName { .. } => Finding::error(
            FindingCode::TaskImportModuleNotFound,
            path,
            format!("Module '{module}' not found: {err}."),
        )
        .with_suggestion(format!(
            "Check that module '{module}' is installed and available on the module search path."
        )),
        ResolveError::Unloadable { .. } => Finding::error(
            FindingCode::TaskImportModuleSyntaxError,
            path,
            format!("Module '{module}' cannot be loaded: {err}."),
        )
        .with_suggestion(format!("Fix the source of module '{module}'.")),
    };
    finding
        .with_detail("task_name", task)
        .with_detail("module", module)
        .with_detail("error", err.to_string())
}
