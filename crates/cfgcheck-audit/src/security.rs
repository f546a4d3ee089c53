//! Security analysis of path-like parameters.
//!
//! A parameter is path-like when its key is `dir`, `filename`, or ends in
//! `_dir` or `_file`. Every such string in the document is checked for:
//!
//! - traversal and shell metacharacters (`..` is an error, the rest warn),
//! - references to system locations,
//! - absolute paths into system trees,
//! - relative paths that climb above the base directory,
//! - existing directories that live under a temporary location.

use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

use cfgcheck_core::{ConfigDocument, ConfigPath, Finding, FindingCode};
use cfgcheck_probe::resolve_path;

const METACHARACTERS: &[&str] = &["~", "$", "%", "|", ";", "&", "`"];

const SYSTEM_LOCATIONS: &[&str] = &[
    "/etc/",
    "/var/",
    "/tmp/",
    "c:\\windows\\",
    "c:\\program files\\",
];

const SYSTEM_TREES: &[&str] = &[
    "/etc/",
    "/var/",
    "/usr/",
    "/bin/",
    "/sbin/",
    "c:\\windows\\",
    "c:\\program files\\",
];

const TEMP_LOCATIONS: &[&str] = &["/tmp", "/var/tmp", "c:\\windows\\temp", "c:\\temp"];

fn is_path_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == "dir" || key == "filename" || key.ends_with("_dir") || key.ends_with("_file")
}

fn is_unc(raw: &str) -> bool {
    raw.starts_with("\\\\") || raw.starts_with("//")
}

fn is_absolute(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    drive || is_unc(raw) || Path::new(raw).is_absolute()
}

/// Whether a relative path climbs above its starting directory.
fn escapes_base(raw: &str) -> bool {
    let normalised = raw.replace('\\', "/");
    let mut depth: i64 = 0;
    for component in Path::new(&normalised).components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

/// The `--security-analysis` pass.
#[derive(Debug, Clone)]
pub struct SecurityAnalyzer {
    base_dir: PathBuf,
}

impl SecurityAnalyzer {
    /// Analyzer resolving relative directories against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Analyze `document`.
    pub fn analyze(&self, document: &ConfigDocument) -> Vec<Finding> {
        let mut findings = Vec::new();
        if let Some(root) = document.root_mapping() {
            for (key, value) in root {
                if let Some(key) = key.as_str() {
                    self.walk(&ConfigPath::root().key(key), key, value, &mut findings);
                }
            }
        }
        tracing::debug!(pass = "security", findings = findings.len(), "pass complete");
        findings
    }

    fn walk(&self, path: &ConfigPath, key: &str, value: &Value, findings: &mut Vec<Finding>) {
        match value {
            Value::String(raw) if is_path_key(key) => self.check(path, key, raw.trim(), findings),
            Value::Mapping(map) => {
                for (child_key, child) in map {
                    if let Some(child_key) = child_key.as_str() {
                        self.walk(&path.key(child_key), child_key, child, findings);
                    }
                }
            }
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(&path.index(i), key, item, findings);
                }
            }
            Value::Tagged(tagged) => self.walk(path, key, &tagged.value, findings),
            _ => {}
        }
    }

    fn check(&self, path: &ConfigPath, key: &str, raw: &str, findings: &mut Vec<Finding>) {
        if raw.is_empty() {
            return;
        }
        let lowered = raw.to_ascii_lowercase();
        let detail = |finding: Finding| finding.with_detail("config_key", key).with_detail("path", raw);

        let traversal = raw.contains("..");
        let mut patterns: Vec<&str> = Vec::new();
        if traversal {
            patterns.push("..");
        }
        patterns.extend(METACHARACTERS.iter().copied().filter(|p| raw.contains(p)));
        if !patterns.is_empty() {
            let message = format!(
                "Path '{raw}' contains potentially dangerous patterns: {}",
                patterns.join(" ")
            );
            let finding = if traversal {
                Finding::error(FindingCode::SecurityPathTraversalRisk, path.clone(), message)
            } else {
                Finding::warning(FindingCode::SecurityPathTraversalRisk, path.clone(), message)
            };
            findings.push(
                detail(finding)
                    .with_suggestion("Use a plain path without parent references, variables, or shell characters.")
                    .with_detail("patterns", patterns),
            );
        }

        let mut locations: Vec<&str> = SYSTEM_LOCATIONS
            .iter()
            .copied()
            .filter(|p| lowered.contains(p))
            .collect();
        if is_unc(raw) {
            locations.push("UNC share");
        }
        if !locations.is_empty() {
            findings.push(
                detail(Finding::warning(
                    FindingCode::SecuritySuspiciousSystemPath,
                    path.clone(),
                    format!("Path '{raw}' references system locations: {}", locations.join(", ")),
                ))
                .with_suggestion("Ensure this is intentional and the location is properly secured."),
            );
        }

        if is_absolute(raw) {
            if SYSTEM_TREES.iter().any(|p| lowered.starts_with(p)) {
                findings.push(
                    detail(Finding::info(
                        FindingCode::SecurityUnsafeAbsolutePath,
                        path.clone(),
                        format!("Absolute path '{raw}' points into a system directory tree"),
                    ))
                    .with_suggestion("Keep pipeline data under a dedicated application directory."),
                );
            }
        } else if escapes_base(raw) {
            findings.push(
                detail(Finding::warning(
                    FindingCode::SecurityUnsafeRelativePath,
                    path.clone(),
                    format!("Relative path '{raw}' climbs above the base directory"),
                ))
                .with_suggestion("Use a path inside the base directory or an explicit absolute path."),
            );
        }

        if key.to_ascii_lowercase().ends_with("dir") && !raw.contains('{') {
            if let Some(location) = self.temp_location(raw) {
                findings.push(
                    detail(Finding::warning(
                        FindingCode::SecurityUnsafeDirectoryLocation,
                        path.clone(),
                        format!("Directory '{raw}' is located under temporary location '{location}'"),
                    ))
                    .with_suggestion("Use a directory that is not shared with other users or cleaned automatically."),
                );
            }
        }
    }

    /// The temporary location an existing directory lives under, if any.
    fn temp_location(&self, raw: &str) -> Option<String> {
        let resolved = resolve_path(raw, &self.base_dir);
        if !resolved.is_dir() {
            return None;
        }
        let canonical = resolved.canonicalize().ok()?;
        if let Ok(temp) = std::env::temp_dir().canonicalize() {
            if canonical.starts_with(&temp) {
                return Some(temp.display().to_string());
            }
        }
        let shown = canonical.display().to_string().to_ascii_lowercase();
        TEMP_LOCATIONS
            .iter()
            .find(|loc| shown == **loc || shown.starts_with(&format!("{loc}/")) || shown.starts_with(&format!("{loc}\\")))
            .map(|loc| loc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(yaml: &str, base: &Path) -> Vec<Finding> {
        SecurityAnalyzer::new(base).analyze(&ConfigDocument::parse(yaml).unwrap())
    }

    fn codes(findings: &[Finding]) -> Vec<(String, FindingCode)> {
        findings
            .iter()
            .map(|f| (f.path.as_str().to_string(), f.code))
            .collect()
    }

    #[test]
    fn classifies_path_keys() {
        assert!(is_path_key("dir"));
        assert!(is_path_key("Upload_Dir"));
        assert!(is_path_key("reference_file"));
        assert!(is_path_key("filename"));
        assert!(!is_path_key("directory"));
        assert!(!is_path_key("profile"));
    }

    #[test]
    fn relative_escape_is_lexical() {
        assert!(escapes_base("../data"));
        assert!(escapes_base("a/../../b"));
        assert!(escapes_base("..\\windows"));
        assert!(!escapes_base("a/../b"));
        assert!(!escapes_base("./out"));
    }

    #[test]
    fn traversal_and_metacharacters() {
        let base = Path::new("/nonexistent-base");
        let findings = analyze(
            "web:\n  upload_dir: ../uploads\ntasks:\n  s:\n    params:\n      data_dir: \"$HOME/out\"\n      note: ../not-a-path\n",
            base,
        );
        assert_eq!(
            codes(&findings),
            vec![
                ("web.upload_dir".to_string(), FindingCode::SecurityPathTraversalRisk),
                ("web.upload_dir".to_string(), FindingCode::SecurityUnsafeRelativePath),
                ("tasks.s.params.data_dir".to_string(), FindingCode::SecurityPathTraversalRisk),
            ]
        );
        assert!(findings[0].is_error());
        assert!(!findings[2].is_error());
    }

    #[test]
    fn system_locations_and_trees() {
        let base = Path::new("/nonexistent-base");
        let findings = analyze("watch_folder:\n  dir: /etc/inbox\nlogging:\n  log_file: \"\\\\\\\\server\\\\share\\\\log.txt\"\n", base);
        assert_eq!(
            codes(&findings),
            vec![
                ("watch_folder.dir".to_string(), FindingCode::SecuritySuspiciousSystemPath),
                ("watch_folder.dir".to_string(), FindingCode::SecurityUnsafeAbsolutePath),
                ("logging.log_file".to_string(), FindingCode::SecuritySuspiciousSystemPath),
            ]
        );
    }

    #[test]
    fn existing_directory_under_temp_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inbox")).unwrap();
        let findings = analyze("watch_folder:\n  dir: inbox\n", dir.path());
        assert_eq!(
            codes(&findings),
            vec![("watch_folder.dir".to_string(), FindingCode::SecurityUnsafeDirectoryLocation)]
        );
        assert!(analyze("watch_folder:\n  dir: missing\n", dir.path()).is_empty());
    }
}
