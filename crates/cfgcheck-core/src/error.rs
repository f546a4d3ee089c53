//! # Error Types
//!
//! Errors that escape a validation pass. Everything else a pass runs into
//! (missing files, broken CSVs, unresolvable modules) is converted into a
//! [`Finding`](crate::Finding) and never surfaces as an `Err`.
//!
//! Only two things abort a run: a document that cannot be loaded at all,
//! and a type expression that a caller asked to parse directly.

use thiserror::Error;

/// Why a configuration document could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailureKind {
    /// The file could not be opened or read.
    Unreadable,
    /// The bytes are not valid UTF-8.
    InvalidEncoding,
    /// The text is not well-formed YAML.
    Syntax,
}

impl ParseFailureKind {
    /// Short label used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::InvalidEncoding => "invalid encoding",
            Self::Syntax => "syntax error",
        }
    }
}

impl std::fmt::Display for ParseFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal load failure. No validation pass runs after one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ParseFailure {
    /// Failure category; decides between usage-level and error-level reporting.
    pub kind: ParseFailureKind,
    /// Human-readable cause.
    pub message: String,
    /// 1-based source line, when the parser reported one.
    pub line: Option<usize>,
    /// 1-based source column, when the parser reported one.
    pub column: Option<usize>,
}

impl ParseFailure {
    /// Build a failure without position information.
    pub fn new(kind: ParseFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Convert a `serde_yaml` error, keeping its location.
    pub fn from_yaml(err: &serde_yaml::Error) -> Self {
        let location = err.location();
        Self {
            kind: ParseFailureKind::Syntax,
            message: err.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }
}

/// A field `type` string that is not a supported type expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported type expression {expr:?}: {reason}")]
pub struct TypeExprError {
    /// The rejected expression, as written.
    pub expr: String,
    /// What was wrong with it.
    pub reason: String,
}
