//! # Config Paths
//!
//! Canonical addresses for nodes in a configuration document. Mapping keys
//! are joined with `.` and sequence items are written `[n]`, so the
//! filename template of a task reads `tasks.store_json.params.filename` and
//! the third pipeline step reads `pipeline[2]`.

use serde::{Deserialize, Serialize};

/// Dotted/bracketed address of a node. The empty path is the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigPath(String);

impl ConfigPath {
    /// The document root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Wrap an already-formatted path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Address of mapping key `key` under this node.
    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    /// Address of sequence item `index` under this node.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// The enclosing node, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        if self.0.ends_with(']') {
            if let Some(open) = self.0.rfind('[') {
                return Some(Self(self.0[..open].to_string()));
            }
        }
        match self.0.rfind('.') {
            Some(dot) => Some(Self(self.0[..dot].to_string())),
            None => Some(Self::root()),
        }
    }

    /// True for the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw path text; empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            f.write_str("(root)")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ConfigPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
