//! # Validate Subcommand
//!
//! Builds [`ValidationOptions`] from flags, runs the validator over one
//! configuration file, and prints the report. The returned code is the
//! report's exit code, or 64 when the file cannot be read.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use cfgcheck_engine::{EngineError, ValidationOptions, ValidationRun, EXIT_USAGE};
use cfgcheck_schema::UnknownKeyScope;

use crate::OutputFormat;

/// How far unknown-key detection descends.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyScope {
    /// Top-level sections and task bodies.
    #[default]
    Shallow,
    /// Also task parameters and field specs.
    Recursive,
}

impl From<KeyScope> for UnknownKeyScope {
    fn from(scope: KeyScope) -> Self {
        match scope {
            KeyScope::Shallow => UnknownKeyScope::Shallow,
            KeyScope::Recursive => UnknownKeyScope::Recursive,
        }
    }
}

/// Arguments for the `config-check validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate.
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Treat unknown keys as errors.
    #[arg(long)]
    pub strict: bool,

    /// How deep unknown-key detection goes.
    #[arg(long, value_enum, default_value_t = KeyScope::Shallow)]
    pub unknown_keys: KeyScope,

    /// Directory relative paths resolve against (default: current directory).
    #[arg(long, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Resolve each task's module and class.
    #[arg(long)]
    pub import_checks: bool,

    /// Source root for module resolution. Repeatable; defaults to the base directory.
    #[arg(long = "module-root", value_name = "PATH")]
    pub module_roots: Vec<PathBuf>,

    /// Check every _dir/_file parameter and read reference CSVs.
    #[arg(long)]
    pub check_files: bool,

    /// Report configurations likely to process slowly.
    #[arg(long)]
    pub performance_analysis: bool,

    /// Report risky paths.
    #[arg(long)]
    pub security_analysis: bool,
}

impl ValidateArgs {
    /// Run options for these arguments, with `cwd` as the fallback base directory.
    pub fn options(&self, cwd: &Path) -> ValidationOptions {
        let base_dir = match &self.base_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };
        ValidationOptions {
            strict: self.strict,
            unknown_keys: self.unknown_keys.into(),
            base_dir,
            import_checks: self.import_checks,
            module_roots: self.module_roots.clone(),
            check_files: self.check_files,
            performance_analysis: self.performance_analysis,
            security_analysis: self.security_analysis,
        }
    }
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, cwd: &Path) -> Result<u8> {
    let options = args.options(cwd);
    tracing::info!(
        config = %args.config.display(),
        base_dir = %options.base_dir.display(),
        "validating configuration"
    );

    let report = match ValidationRun::new(options).validate_file(&args.config) {
        Ok(report) => report,
        Err(e @ EngineError::Unreadable { .. }) => {
            eprintln!("config-check: {e}");
            return Ok(EXIT_USAGE);
        }
    };

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => {
            let json = report.render_json().context("failed to serialize report")?;
            println!("{json}");
        }
    }
    Ok(report.exit_code)
}
