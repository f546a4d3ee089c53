//! # cfgcheck-core — Foundational Types for config-check
//!
//! This crate defines the vocabulary every validation pass speaks. Every
//! other crate in the workspace depends on `cfgcheck-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One closed code set.** `FindingCode` enumerates every diagnostic the
//!    validator can emit. Passes cannot invent ad-hoc string codes, and the
//!    reporter can match exhaustively.
//!
//! 2. **Findings are values.** A `Finding` is built once through its
//!    constructors and then only moved. Source lines are attached while the
//!    finding is still being built, never patched afterwards.
//!
//! 3. **Positions live beside the tree.** `ConfigDocument` keeps the parsed
//!    `serde_yaml::Value` untouched and records source positions in a
//!    separate `PositionIndex` keyed by canonical config paths
//!    (`tasks.store.params.filename`, `pipeline[2]`).
//!
//! 4. **Tagged task families.** Module strings are classified into
//!    `TaskFamily` variants by longest-prefix match. Unrecognised modules
//!    land in `TaskFamily::Unknown` instead of falling through silently.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cfgcheck-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

#![deny(missing_docs)]

pub mod code;
pub mod document;
pub mod error;
pub mod field;
pub mod finding;
pub mod path;
pub mod position;
pub mod task;

// Re-export primary types for ergonomic imports.
pub use code::{CodeFamily, FindingCode};
pub use document::{describe_value, ConfigDocument};
pub use error::{ParseFailure, ParseFailureKind, TypeExprError};
pub use field::{extraction_fields, ExtractionField, TypeExpr};
pub use finding::{Finding, Severity};
pub use path::ConfigPath;
pub use position::{Position, PositionIndex};
pub use task::{OnError, PipelineEntry, StorageKind, TaskDefinition, TaskFamily, CONTEXT_KEYS};
