//! # Position Index
//!
//! Maps canonical [`ConfigPath`]s to source positions. `serde_yaml` parses
//! the tree but drops node marks, so the index is built by a separate line
//! scanner over the same text.
//!
//! ## Coverage
//!
//! The scanner understands block-style mappings and sequences, including
//! the compact `key:\n- item` form and mappings opened inline on a
//! sequence item (`- column: x`). Block scalars (`|`, `>`) are skipped.
//! Flow collections (`{a: 1}`, `[a, b]`) are not descended into; lookups
//! inside them resolve to the nearest recorded ancestor, which is as
//! precise as diagnostics need to be.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::path::ConfigPath;

/// 1-based line and column of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line.
    pub line: usize,
    /// 1-based column of the key or sequence dash.
    pub column: usize,
}

/// Path-to-position lookup table for one document.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    entries: HashMap<String, Position>,
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    path: ConfigPath,
    item: bool,
}

#[derive(Debug, Default)]
struct Scanner {
    index: PositionIndex,
    stack: Vec<Frame>,
    item_counts: HashMap<String, usize>,
    block_scalar_owner: Option<usize>,
}

impl PositionIndex {
    /// Scan YAML source text and record every key and sequence item found.
    pub fn scan(text: &str) -> Self {
        let mut scanner = Scanner::default();
        for (offset, raw) in text.lines().enumerate() {
            let indent = raw.len() - raw.trim_start_matches(' ').len();
            let content = raw[indent..].trim_end();
            if content.is_empty() {
                continue;
            }
            if let Some(owner) = scanner.block_scalar_owner {
                if indent > owner {
                    continue;
                }
                scanner.block_scalar_owner = None;
            }
            if content.starts_with('#')
                || content.starts_with('%')
                || content == "---"
                || content.starts_with("--- ")
                || content == "..."
            {
                continue;
            }
            scanner.node(offset + 1, indent, content);
        }
        scanner.index
    }

    /// Exact position of `path`, if the scanner recorded it.
    pub fn get(&self, path: &ConfigPath) -> Option<Position> {
        self.entries.get(path.as_str()).copied()
    }

    /// Position of `path` or of its nearest recorded ancestor.
    pub fn locate(&self, path: &ConfigPath) -> Option<Position> {
        let mut current = Some(path.clone());
        while let Some(candidate) = current {
            if let Some(position) = self.get(&candidate) {
                return Some(position);
            }
            current = candidate.parent();
        }
        None
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, path: &ConfigPath, line: usize, column: usize) {
        self.entries
            .entry(path.as_str().to_string())
            .or_insert(Position { line, column });
    }
}

impl Scanner {
    fn parent_path(&self) -> ConfigPath {
        self.stack
            .last()
            .map(|frame| frame.path.clone())
            .unwrap_or_default()
    }

    fn node(&mut self, line: usize, indent: usize, content: &str) {
        if content == "-" || content.starts_with("- ") {
            self.sequence_item(line, indent, content);
            return;
        }
        let Some((key, value)) = split_key(content) else {
            return;
        };
        while self.stack.last().is_some_and(|f| f.indent >= indent) {
            self.stack.pop();
        }
        let path = self.parent_path().key(&key);
        self.index.record(&path, line, indent + 1);
        if opens_block_scalar(value) {
            self.block_scalar_owner = Some(indent);
        }
        self.stack.push(Frame {
            indent,
            path,
            item: false,
        });
    }

    fn sequence_item(&mut self, line: usize, indent: usize, content: &str) {
        while self
            .stack
            .last()
            .is_some_and(|f| f.indent > indent || (f.indent == indent && f.item))
        {
            self.stack.pop();
        }
        let parent = self.parent_path();
        let slot = self
            .item_counts
            .entry(parent.as_str().to_string())
            .or_insert(0);
        let path = parent.index(*slot);
        *slot += 1;
        self.index.record(&path, line, indent + 1);
        self.stack.push(Frame {
            indent,
            path,
            item: true,
        });

        let rest = &content[1..];
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.is_empty() {
            return;
        }
        if opens_block_scalar(trimmed) {
            self.block_scalar_owner = Some(indent);
            return;
        }
        let pad = rest.len() - trimmed.len();
        self.node(line, indent + 1 + pad, trimmed);
    }
}

fn opens_block_scalar(value: &str) -> bool {
    value.starts_with('|') || value.starts_with('>')
}

/// Split `key: value` into the unquoted key and the raw value text.
fn split_key(content: &str) -> Option<(String, &str)> {
    let first = content.chars().next()?;
    if first == '"' || first == '\'' {
        let body = &content[1..];
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            if first == '"' && c == '\\' && !escaped {
                escaped = true;
                continue;
            }
            if c == first && !escaped {
                let key = body[..i].to_string();
                let after = body[i + 1..].trim_start();
                let value = after.strip_prefix(':')?;
                if !(value.is_empty() || value.starts_with(' ')) {
                    return None;
                }
                return Some((key, value.trim()));
            }
            escaped = false;
        }
        return None;
    }
    if matches!(first, '{' | '[' | '&' | '*' | '!' | '?' | '|' | '>' | '#') {
        return None;
    }
    let bytes = content.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = content[..i].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_string(), content[i + 1..].trim()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
web:
  upload_dir: ./uploads
# comment
watch_folder:
  dir: ./watch
tasks:
  store:
    module: standard_step.storage.store_metadata_as_json
    params:
      filename: \"{supplier_name}.json\"
      notes: |
        free: text
        - not an item
  rules:
    params:
      csv_match:
        clauses:
          - column: a
            from_context: x
          - column: b
            from_context: y
pipeline:
- extract
- store
";

    fn at(index: &PositionIndex, path: &str) -> (usize, usize) {
        let p = index.get(&ConfigPath::new(path)).unwrap();
        (p.line, p.column)
    }

    #[test]
    fn records_nested_keys() {
        let index = PositionIndex::scan(SAMPLE);
        assert_eq!(at(&index, "web"), (1, 1));
        assert_eq!(at(&index, "web.upload_dir"), (2, 3));
        assert_eq!(at(&index, "watch_folder.dir"), (5, 3));
        assert_eq!(at(&index, "tasks.store.params.filename"), (10, 7));
    }

    #[test]
    fn skips_block_scalar_content() {
        let index = PositionIndex::scan(SAMPLE);
        assert!(index.get(&ConfigPath::new("tasks.store.params.notes.free")).is_none());
        assert!(index.get(&ConfigPath::new("tasks.store.params.notes[0]")).is_none());
        assert_eq!(at(&index, "tasks.rules"), (14, 3));
    }

    #[test]
    fn records_sequence_items_and_inline_mappings() {
        let index = PositionIndex::scan(SAMPLE);
        assert_eq!(at(&index, "tasks.rules.params.csv_match.clauses[0]"), (18, 11));
        assert_eq!(at(&index, "tasks.rules.params.csv_match.clauses[1].column"), (20, 13));
        assert_eq!(
            at(&index, "tasks.rules.params.csv_match.clauses[1].from_context"),
            (21, 13)
        );
    }

    #[test]
    fn records_compact_sequences() {
        let index = PositionIndex::scan(SAMPLE);
        assert_eq!(at(&index, "pipeline"), (22, 1));
        assert_eq!(at(&index, "pipeline[0]"), (23, 1));
        assert_eq!(at(&index, "pipeline[1]"), (24, 1));
    }

    #[test]
    fn locate_falls_back_to_ancestor() {
        let index = PositionIndex::scan("tasks:\n  a: {module: x, params: {k: v}}\n");
        let p = index.locate(&ConfigPath::new("tasks.a.params.k")).unwrap();
        assert_eq!((p.line, p.column), (2, 3));
        assert!(index.locate(&ConfigPath::new("other")).is_none());
    }

    #[test]
    fn quoted_keys_are_unquoted() {
        let index = PositionIndex::scan("\"odd key\": 1\n'other': 2\n");
        assert_eq!(at(&index, "odd key"), (1, 1));
        assert_eq!(at(&index, "other"), (2, 1));
    }

    #[test]
    fn urls_in_values_do_not_split_keys() {
        let index = PositionIndex::scan("endpoint: http://host:8080/x\n");
        assert_eq!(at(&index, "endpoint"), (1, 1));
        assert_eq!(index.len(), 1);
    }
}
