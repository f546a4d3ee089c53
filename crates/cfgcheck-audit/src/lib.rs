//! # cfgcheck-audit — Performance & Security Analysis
//!
//! Two opt-in passes that look past correctness:
//!
//! - [`PerformanceAnalyzer`]: field, table, pipeline, and context-path
//!   size limits ([`PerformanceThresholds`]).
//! - [`SecurityAnalyzer`]: traversal patterns, system locations, and
//!   temporary directories in path-like parameters.
//!
//! Neither pass runs unless the validation run enables it.

pub mod performance;
pub mod security;

pub use performance::{PerformanceAnalyzer, PerformanceThresholds};
pub use security::SecurityAnalyzer;
