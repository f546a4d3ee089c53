//! # cfgcheck-rules — Rules-Task Validation
//!
//! Validation for CSV update-by-match tasks (`*.rules.*` modules): the
//! reference file's structure, the columns clauses name, the clauses
//! against each other, and the context paths they read.
//!
//! - [`RulesValidator`] runs all checks over a document.
//! - [`probe_csv`] reads a reference CSV once for its header row.
//! - [`ContextPath`] parses `from_context` values.

pub mod context;
pub mod reference;
pub mod validate;

pub use context::{ContextPath, ContextPathError};
pub use reference::{probe_csv, CsvProbeError, CsvShape};
pub use validate::RulesValidator;
