//! Errors that abort a run before any finding can be produced.

use std::path::PathBuf;

use thiserror::Error;

/// A run that could not start.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration file could not be opened or read.
    #[error("cannot read configuration {path}: {reason}")]
    Unreadable {
        /// Path as given.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
}
