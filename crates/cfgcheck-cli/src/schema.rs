//! # Schema Subcommand
//!
//! Prints the draft-07 JSON Schema of the configuration format.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use cfgcheck_schema::config_schema;

/// Formats the schema can be written in.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaFormat {
    /// JSON Schema document.
    #[default]
    Json,
}

/// Arguments for the `config-check schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = SchemaFormat::Json)]
    pub format: SchemaFormat,
}

/// Render the schema in the requested format.
pub fn render_schema(args: &SchemaArgs) -> Result<String> {
    match args.format {
        SchemaFormat::Json => {
            serde_json::to_string_pretty(&config_schema()).context("failed to serialize schema")
        }
    }
}

/// Execute the schema subcommand.
pub fn run_schema(args: &SchemaArgs) -> Result<u8> {
    println!("{}", render_schema(args)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_draft_07_json() {
        let text = render_schema(&SchemaArgs {
            format: SchemaFormat::Json,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["$schema"], "http://json-schema.org/draft-07/schema#");
        assert!(value["definitions"]["clause"].is_object());
    }
}
