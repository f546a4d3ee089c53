//! # cfgcheck-probe — Filesystem & Module Probes
//!
//! The two validation passes that look outside the configuration text.
//! Both are read-only: no directory is created and no module code runs.
//!
//! ## Path Probing (`paths`)
//!
//! [`PathProber`] checks `watch_folder.dir` and, when enabled, every
//! `_dir` / `_file` parameter in the document after `~` and environment
//! expansion.
//!
//! ## Import Probing (`imports`, `resolver`)
//!
//! [`ImportProber`] resolves each task's `module` through a
//! [`ModuleResolver`] and confirms that `class` names a class. The
//! [`SourceTreeResolver`] reads source files under configured roots.

pub mod imports;
pub mod paths;
pub mod resolver;

pub use imports::ImportProber;
pub use paths::{expand_vars, resolve_path, PathProber};
pub use resolver::{
    ExportKind, ModuleExports, ModuleResolver, ResolveError, SourceTreeResolver, StaticResolver,
};
