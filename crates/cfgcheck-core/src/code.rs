//! # Finding Codes — Closed Diagnostic Taxonomy
//!
//! Every diagnostic the validator can emit has exactly one `FindingCode`
//! variant. Codes are grouped into families that mirror the passes that
//! produce them, so a reporter or a test can ask "did the rules pass
//! complain?" without string matching.
//!
//! The serialized form is kebab-case and is part of the JSON report
//! contract; `as_str()` and serde must agree.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pass family a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFamily {
    /// Document loading.
    Document,
    /// Structural schema checks.
    Schema,
    /// Filesystem probing of `_dir`/`_file` parameters.
    Path,
    /// Module/class resolution.
    Import,
    /// Pipeline ordering and token resolution.
    Pipeline,
    /// CSV-backed rules tasks.
    Rules,
    /// Optional performance analysis.
    Performance,
    /// Optional security analysis.
    Security,
}

/// Every diagnostic code the validator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCode {
    /// YAML could not be parsed.
    YamlError,

    /// Root value is not a mapping.
    SchemaRootNotMapping,
    /// A required key is absent.
    SchemaMissingRequired,
    /// A value has the wrong type or shape.
    SchemaTypeMismatch,
    /// A value is outside its enumerated set.
    SchemaInvalidEnum,
    /// A key is not part of the contract.
    SchemaUnknownKey,
    /// More than one table field in one extraction task.
    SchemaTableCardinality,
    /// A numeric value is outside its permitted range.
    SchemaOutOfRange,

    /// Referenced path does not exist.
    FileNotFound,
    /// `_file` parameter names something that is not a regular file.
    FileNotFile,
    /// `_dir` parameter names something that is not a directory.
    FileNotDir,
    /// File exists but cannot be opened for reading.
    FileNotReadable,
    /// Any other filesystem error while probing.
    FileAccessError,
    /// A `_dir`/`_file` parameter is not a usable path string.
    PathValueInvalid,

    /// Task module cannot be located.
    TaskImportModuleNotFound,
    /// Task module exists but cannot be read as source.
    TaskImportModuleSyntaxError,
    /// Module has no attribute named by `class`.
    TaskImportClassNotFound,
    /// Attribute exists but is not a class.
    TaskImportNotCallable,

    /// Pipeline names a task that is not defined.
    PipelineUnknownTask,
    /// Pipeline contains no extraction task.
    PipelineMissingExtraction,
    /// Extraction token used before any extraction task ran.
    PipelineExtractionBeforeStorage,
    /// `{nanoid}` used before any context task ran.
    PipelineContextBeforeToken,
    /// Pipeline has no housekeeping task.
    PipelineMissingHousekeeping,
    /// Housekeeping task is not the final step.
    PipelineHousekeepingNotLast,
    /// Token resolves to neither a field nor a context key.
    PipelineUnknownToken,
    /// Token resolves to a table field.
    PipelineNonScalarToken,
    /// Same task appears more than once in the pipeline.
    PipelineDuplicateStep,
    /// Unbalanced or invalid brace sequence in a template.
    PipelineMalformedToken,

    /// Reference CSV has no data rows or no content.
    RulesCsvEmpty,
    /// Reference CSV has no usable header row.
    RulesCsvMissingHeaders,
    /// Reference CSV cannot be read or parsed.
    RulesCsvNotReadable,
    /// Column is not present in the CSV header.
    RulesColumnNotFound,
    /// Identical clause repeated.
    RulesDuplicateClause,
    /// Several clauses constrain the same column.
    RulesImpossibleCondition,
    /// Several clauses read the same context path.
    RulesContextReuse,
    /// `from_context` is not a well-formed dotted path.
    RulesContextPathInvalid,
    /// `from_context` uses the legacy `data.` prefix.
    RulesDeprecatedDataPrefix,
    /// `from_context` root is not a declared extraction field.
    RulesFieldNotFound,
    /// `number: false` against a numeric field.
    RulesSemanticTypeMismatch,
    /// `from_context` looks unlike any declared or common field.
    RulesUnrealisticFieldReference,

    /// Extraction task declares many fields.
    PerformanceExcessiveFields,
    /// Extraction task declares a very large number of fields.
    PerformanceExcessiveFieldsCritical,
    /// Extraction task declares several table fields.
    PerformanceMultipleTables,
    /// Pipeline is long.
    PerformanceExcessivePipelineLength,
    /// Pipeline is very long.
    PerformanceExcessivePipelineLengthCritical,
    /// Several extraction tasks in one pipeline.
    PerformanceMultipleExtractionTasks,
    /// Many rules tasks in one pipeline.
    PerformanceMultipleRulesTasks,
    /// Deeply nested context paths in rules clauses.
    PerformanceComplexContextPaths,

    /// Path contains traversal or shell metacharacters.
    SecurityPathTraversalRisk,
    /// Path points into a system location.
    SecuritySuspiciousSystemPath,
    /// Absolute path into a system tree.
    SecurityUnsafeAbsolutePath,
    /// Relative path escapes the base directory.
    SecurityUnsafeRelativePath,
    /// Directory lives under a temporary location.
    SecurityUnsafeDirectoryLocation,
}

impl FindingCode {
    /// Returns every code in declaration order.
    pub fn all() -> &'static [FindingCode] {
        &[
            Self::YamlError,
            Self::SchemaRootNotMapping,
            Self::SchemaMissingRequired,
            Self::SchemaTypeMismatch,
            Self::SchemaInvalidEnum,
            Self::SchemaUnknownKey,
            Self::SchemaTableCardinality,
            Self::SchemaOutOfRange,
            Self::FileNotFound,
            Self::FileNotFile,
            Self::FileNotDir,
            Self::FileNotReadable,
            Self::FileAccessError,
            Self::PathValueInvalid,
            Self::TaskImportModuleNotFound,
            Self::TaskImportModuleSyntaxError,
            Self::TaskImportClassNotFound,
            Self::TaskImportNotCallable,
            Self::PipelineUnknownTask,
            Self::PipelineMissingExtraction,
            Self::PipelineExtractionBeforeStorage,
            Self::PipelineContextBeforeToken,
            Self::PipelineMissingHousekeeping,
            Self::PipelineHousekeepingNotLast,
            Self::PipelineUnknownToken,
            Self::PipelineNonScalarToken,
            Self::PipelineDuplicateStep,
            Self::PipelineMalformedToken,
            Self::RulesCsvEmpty,
            Self::RulesCsvMissingHeaders,
            Self::RulesCsvNotReadable,
            Self::RulesColumnNotFound,
            Self::RulesDuplicateClause,
            Self::RulesImpossibleCondition,
            Self::RulesContextReuse,
            Self::RulesContextPathInvalid,
            Self::RulesDeprecatedDataPrefix,
            Self::RulesFieldNotFound,
            Self::RulesSemanticTypeMismatch,
            Self::RulesUnrealisticFieldReference,
            Self::PerformanceExcessiveFields,
            Self::PerformanceExcessiveFieldsCritical,
            Self::PerformanceMultipleTables,
            Self::PerformanceExcessivePipelineLength,
            Self::PerformanceExcessivePipelineLengthCritical,
            Self::PerformanceMultipleExtractionTasks,
            Self::PerformanceMultipleRulesTasks,
            Self::PerformanceComplexContextPaths,
            Self::SecurityPathTraversalRisk,
            Self::SecuritySuspiciousSystemPath,
            Self::SecurityUnsafeAbsolutePath,
            Self::SecurityUnsafeRelativePath,
            Self::SecurityUnsafeDirectoryLocation,
        ]
    }

    /// Returns the kebab-case identifier used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YamlError => "yaml-error",
            Self::SchemaRootNotMapping => "schema-root-not-mapping",
            Self::SchemaMissingRequired => "schema-missing-required",
            Self::SchemaTypeMismatch => "schema-type-mismatch",
            Self::SchemaInvalidEnum => "schema-invalid-enum",
            Self::SchemaUnknownKey => "schema-unknown-key",
            Self::SchemaTableCardinality => "schema-table-cardinality",
            Self::SchemaOutOfRange => "schema-out-of-range",
            Self::FileNotFound => "file-not-found",
            Self::FileNotFile => "file-not-file",
            Self::FileNotDir => "file-not-dir",
            Self::FileNotReadable => "file-not-readable",
            Self::FileAccessError => "file-access-error",
            Self::PathValueInvalid => "path-value-invalid",
            Self::TaskImportModuleNotFound => "task-import-module-not-found",
            Self::TaskImportModuleSyntaxError => "task-import-module-syntax-error",
            Self::TaskImportClassNotFound => "task-import-class-not-found",
            Self::TaskImportNotCallable => "task-import-not-callable",
            Self::PipelineUnknownTask => "pipeline-unknown-task",
            Self::PipelineMissingExtraction => "pipeline-missing-extraction",
            Self::PipelineExtractionBeforeStorage => "pipeline-extraction-before-storage",
            Self::PipelineContextBeforeToken => "pipeline-context-before-token",
            Self::PipelineMissingHousekeeping => "pipeline-missing-housekeeping",
            Self::PipelineHousekeepingNotLast => "pipeline-housekeeping-not-last",
            Self::PipelineUnknownToken => "pipeline-unknown-token",
            Self::PipelineNonScalarToken => "pipeline-non-scalar-token",
            Self::PipelineDuplicateStep => "pipeline-duplicate-step",
            Self::PipelineMalformedToken => "pipeline-malformed-token",
            Self::RulesCsvEmpty => "rules-csv-empty",
            Self::RulesCsvMissingHeaders => "rules-csv-missing-headers",
            Self::RulesCsvNotReadable => "rules-csv-not-readable",
            Self::RulesColumnNotFound => "rules-column-not-found",
            Self::RulesDuplicateClause => "rules-duplicate-clause",
            Self::RulesImpossibleCondition => "rules-impossible-condition",
            Self::RulesContextReuse => "rules-context-reuse",
            Self::RulesContextPathInvalid => "rules-context-path-invalid",
            Self::RulesDeprecatedDataPrefix => "rules-deprecated-data-prefix",
            Self::RulesFieldNotFound => "rules-field-not-found",
            Self::RulesSemanticTypeMismatch => "rules-semantic-type-mismatch",
            Self::RulesUnrealisticFieldReference => "rules-unrealistic-field-reference",
            Self::PerformanceExcessiveFields => "performance-excessive-fields",
            Self::PerformanceExcessiveFieldsCritical => "performance-excessive-fields-critical",
            Self::PerformanceMultipleTables => "performance-multiple-tables",
            Self::PerformanceExcessivePipelineLength => "performance-excessive-pipeline-length",
            Self::PerformanceExcessivePipelineLengthCritical => {
                "performance-excessive-pipeline-length-critical"
            }
            Self::PerformanceMultipleExtractionTasks => "performance-multiple-extraction-tasks",
            Self::PerformanceMultipleRulesTasks => "performance-multiple-rules-tasks",
            Self::PerformanceComplexContextPaths => "performance-complex-context-paths",
            Self::SecurityPathTraversalRisk => "security-path-traversal-risk",
            Self::SecuritySuspiciousSystemPath => "security-suspicious-system-path",
            Self::SecurityUnsafeAbsolutePath => "security-unsafe-absolute-path",
            Self::SecurityUnsafeRelativePath => "security-unsafe-relative-path",
            Self::SecurityUnsafeDirectoryLocation => "security-unsafe-directory-location",
        }
    }

    /// Returns the pass family this code belongs to.
    pub fn family(&self) -> CodeFamily {
        match self {
            Self::YamlError => CodeFamily::Document,
            Self::SchemaRootNotMapping
            | Self::SchemaMissingRequired
            | Self::SchemaTypeMismatch
            | Self::SchemaInvalidEnum
            | Self::SchemaUnknownKey
            | Self::SchemaTableCardinality
            | Self::SchemaOutOfRange => CodeFamily::Schema,
            Self::FileNotFound
            | Self::FileNotFile
            | Self::FileNotDir
            | Self::FileNotReadable
            | Self::FileAccessError
            | Self::PathValueInvalid => CodeFamily::Path,
            Self::TaskImportModuleNotFound
            | Self::TaskImportModuleSyntaxError
            | Self::TaskImportClassNotFound
            | Self::TaskImportNotCallable => CodeFamily::Import,
            Self::PipelineUnknownTask
            | Self::PipelineMissingExtraction
            | Self::PipelineExtractionBeforeStorage
            | Self::PipelineContextBeforeToken
            | Self::PipelineMissingHousekeeping
            | Self::PipelineHousekeepingNotLast
            | Self::PipelineUnknownToken
            | Self::PipelineNonScalarToken
            | Self::PipelineDuplicateStep
            | Self::PipelineMalformedToken => CodeFamily::Pipeline,
            Self::RulesCsvEmpty
            | Self::RulesCsvMissingHeaders
            | Self::RulesCsvNotReadable
            | Self::RulesColumnNotFound
            | Self::RulesDuplicateClause
            | Self::RulesImpossibleCondition
            | Self::RulesContextReuse
            | Self::RulesContextPathInvalid
            | Self::RulesDeprecatedDataPrefix
            | Self::RulesFieldNotFound
            | Self::RulesSemanticTypeMismatch
            | Self::RulesUnrealisticFieldReference => CodeFamily::Rules,
            Self::PerformanceExcessiveFields
            | Self::PerformanceExcessiveFieldsCritical
            | Self::PerformanceMultipleTables
            | Self::PerformanceExcessivePipelineLength
            | Self::PerformanceExcessivePipelineLengthCritical
            | Self::PerformanceMultipleExtractionTasks
            | Self::PerformanceMultipleRulesTasks
            | Self::PerformanceComplexContextPaths => CodeFamily::Performance,
            Self::SecurityPathTraversalRisk
            | Self::SecuritySuspiciousSystemPath
            | Self::SecurityUnsafeAbsolutePath
            | Self::SecurityUnsafeRelativePath
            | Self::SecurityUnsafeDirectoryLocation => CodeFamily::Security,
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingCode {
    type Err = String;

    /// Parse a code from its kebab-case identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| format!("unknown finding code: {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_codes_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in FindingCode::all() {
            assert!(seen.insert(code.as_str()), "duplicate code: {code}");
        }
    }

    #[test]
    fn serde_format_matches_as_str() {
        for code in FindingCode::all() {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn from_str_accepts_every_identifier() {
        for code in FindingCode::all() {
            assert_eq!(code.as_str().parse::<FindingCode>().unwrap(), *code);
        }
        assert!("SCHEMA-MISSING-REQUIRED".parse::<FindingCode>().is_err());
        assert!("".parse::<FindingCode>().is_err());
    }

    #[test]
    fn identifier_prefix_matches_family() {
        for code in FindingCode::all() {
            let id = code.as_str();
            let expected = match code.family() {
                CodeFamily::Document => "yaml-",
                CodeFamily::Schema => "schema-",
                CodeFamily::Path => {
                    if id.starts_with("path-") {
                        "path-"
                    } else {
                        "file-"
                    }
                }
                CodeFamily::Import => "task-import-",
                CodeFamily::Pipeline => "pipeline-",
                CodeFamily::Rules => "rules-",
                CodeFamily::Performance => "performance-",
                CodeFamily::Security => "security-",
            };
            assert!(id.starts_with(expected), "{id} not in {:?}", code.family());
        }
    }
}
