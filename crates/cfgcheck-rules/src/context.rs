//! # Context Paths
//!
//! `from_context` values are dotted paths into the runtime context:
//! `segment(.segment)*`, each segment an identifier. The first segment is
//! the extraction field the clause reads. A leading `data.` is the old
//! spelling and is stripped before the field is taken.

use std::fmt;

use thiserror::Error;

const DATA_PREFIX: &str = "data";

/// A parsed `from_context` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPath<'a> {
    raw: &'a str,
    segments: Vec<&'a str>,
    data_prefixed: bool,
}

/// Why a `from_context` value is not a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextPathError {
    /// Blank value.
    #[error("context path is empty")]
    Empty,
    /// Starts or ends with `.`.
    #[error("context path '{0}' has a leading or trailing dot")]
    DanglingDot(String),
    /// Contains `..`.
    #[error("context path '{0}' has an empty segment")]
    EmptySegment(String),
    /// A segment is not an identifier.
    #[error("segment '{segment}' of context path '{path}' is not an identifier")]
    InvalidSegment {
        /// Full path.
        path: String,
        /// Offending segment.
        segment: String,
    },
}

fn is_segment(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl<'a> ContextPath<'a> {
    /// Parse `raw`.
    pub fn parse(raw: &'a str) -> Result<Self, ContextPathError> {
        if raw.trim().is_empty() {
            return Err(ContextPathError::Empty);
        }
        if raw.starts_with('.') || raw.ends_with('.') {
            return Err(ContextPathError::DanglingDot(raw.to_string()));
        }
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ContextPathError::EmptySegment(raw.to_string()));
        }
        if let Some(bad) = segments.iter().find(|s| !is_segment(s)) {
            return Err(ContextPathError::InvalidSegment {
                path: raw.to_string(),
                segment: (*bad).to_string(),
            });
        }
        let data_prefixed = segments.len() > 1 && segments[0] == DATA_PREFIX;
        Ok(Self {
            raw,
            segments,
            data_prefixed,
        })
    }

    /// Whether the path uses the `data.` prefix.
    pub fn has_data_prefix(&self) -> bool {
        self.data_prefixed
    }

    /// Segments after any `data.` prefix.
    pub fn segments(&self) -> &[&'a str] {
        if self.data_prefixed {
            &self.segments[1..]
        } else {
            &self.segments
        }
    }

    /// The extraction field the path reads.
    pub fn field(&self) -> &'a str {
        self.segments()[0]
    }

    /// Number of segments after any `data.` prefix.
    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// The path without its `data.` prefix.
    pub fn without_prefix(&self) -> String {
        self.segments().join(".")
    }

    /// The path as written.
    pub fn as_str(&self) -> &'a str {
        self.raw
    }
}

impl fmt::Display for ContextPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_prefixed_paths() {
        let plain = ContextPath::parse("supplier_name").unwrap();
        assert_eq!(plain.field(), "supplier_name");
        assert!(!plain.has_data_prefix());
        assert_eq!(plain.depth(), 1);

        let prefixed = ContextPath::parse("data.invoice.total").unwrap();
        assert!(prefixed.has_data_prefix());
        assert_eq!(prefixed.field(), "invoice");
        assert_eq!(prefixed.without_prefix(), "invoice.total");
        assert_eq!(prefixed.depth(), 2);
    }

    #[test]
    fn bare_data_is_a_field_not_a_prefix() {
        let path = ContextPath::parse("data").unwrap();
        assert!(!path.has_data_prefix());
        assert_eq!(path.field(), "data");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(ContextPath::parse(" "), Err(ContextPathError::Empty));
        assert!(matches!(ContextPath::parse(".a"), Err(ContextPathError::DanglingDot(_))));
        assert!(matches!(ContextPath::parse("a."), Err(ContextPathError::DanglingDot(_))));
        assert!(matches!(ContextPath::parse("a..b"), Err(ContextPathError::EmptySegment(_))));
        assert!(matches!(
            ContextPath::parse("a.1b"),
            Err(ContextPathError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ContextPath::parse("a b"),
            Err(ContextPathError::InvalidSegment { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn identifier_paths_parse(path in "[a-z_][a-z0-9_]{0,8}(\\.[a-z_][a-z0-9_]{0,8}){0,4}") {
                let parsed = ContextPath::parse(&path);
                prop_assert!(parsed.is_ok());
                let parsed = parsed.unwrap();
                prop_assert!(parsed.depth() >= 1);
                prop_assert_eq!(parsed.to_string(), path);
            }

            #[test]
            fn never_panics(path in "\\PC{0,32}") {
                let _ = ContextPath::parse(&path);
            }
        }
    }
}
