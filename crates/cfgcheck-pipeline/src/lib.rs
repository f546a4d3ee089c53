//! # cfgcheck-pipeline — Pipeline Dependency Analysis
//!
//! Treats `pipeline` as an ordered walk over task definitions and checks
//! what each step needs from the steps before it.
//!
//! ## Modules
//!
//! - `token`: scanner for `{name}` placeholders, `{{...}}` escapes, and
//!   malformed braces. Never fails.
//! - `analyze`: [`PipelineAnalyzer`], the forward pass over the pipeline,
//!   and [`FieldCatalog`], the extraction fields tokens resolve against.

pub mod analyze;
pub mod token;

pub use analyze::{FieldCatalog, PipelineAnalyzer, TokenKind};
pub use token::{scan_tokens, Malformed, Token, TokenScan};
