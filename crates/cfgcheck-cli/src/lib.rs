//! # cfgcheck-cli — The `config-check` Tool
//!
//! ## Subcommands
//!
//! - `config-check validate` — Validate a pipeline configuration file.
//! - `config-check schema` — Print the configuration JSON Schema.
//!
//! ```bash
//! config-check validate --config config.yaml
//! config-check validate --config config.yaml --format json --strict
//! config-check validate --config config.yaml --check-files --import-checks --module-root src
//! config-check schema --format json > config.schema.json
//! ```
//!
//! Reports go to stdout; logs (`-v`, `-vv`, `-vvv`) go to stderr.

pub mod schema;
pub mod validate;

use clap::ValueEnum;

/// Report format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Grouped, human-readable list.
    #[default]
    Text,
    /// Structured document for tooling.
    Json,
}
