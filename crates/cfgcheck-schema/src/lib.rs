//! # cfgcheck-schema — Structural Validation & Schema Export
//!
//! ## Structural Validation (`validate`)
//!
//! [`SchemaValidator::validate`] checks the root shape, the required
//! top-level sections (`web.upload_dir`, `watch_folder.dir`, `tasks`,
//! `pipeline`), every task body, and the parameter contract of each task
//! family. It is the first pass of every run, and the only one allowed to
//! halt the run: a non-mapping root yields a single
//! `schema-root-not-mapping` finding and `root_is_mapping == false`.
//!
//! ## Schema Export (`emit`)
//!
//! [`config_schema`] returns a draft-07 JSON Schema describing the same
//! contract, for editors and CI tooling.
//!
//! ## Crate Policy
//!
//! - Depends only on `cfgcheck-core` internally.
//! - Every structural problem becomes a `Finding`; nothing here returns `Err`.

pub mod emit;
mod params;
pub mod validate;

pub use emit::config_schema;
pub use params::{CLAUSE_COUNT_RANGE, CONTEXT_LENGTH_RANGE, CSV_MATCH_TYPE};
pub use validate::{SchemaReport, SchemaValidator, UnknownKeyScope};
