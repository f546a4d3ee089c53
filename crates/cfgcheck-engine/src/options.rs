//! Run options. Every optional pass is a capability flag on
//! [`ValidationOptions`]; nothing is read from globals or the environment.

use std::path::{Path, PathBuf};

use cfgcheck_schema::UnknownKeyScope;

/// Configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Report unknown keys as errors instead of warnings.
    pub strict: bool,
    /// How deep unknown-key detection descends.
    pub unknown_keys: UnknownKeyScope,
    /// Directory relative `_dir` / `_file` paths resolve against.
    pub base_dir: PathBuf,
    /// Resolve every task's `module` / `class`.
    pub import_checks: bool,
    /// Source roots for module resolution. Empty means `base_dir`.
    pub module_roots: Vec<PathBuf>,
    /// Probe every `_dir` / `_file` parameter and read reference CSVs.
    pub check_files: bool,
    /// Run the performance pass.
    pub performance_analysis: bool,
    /// Run the security pass.
    pub security_analysis: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict: false,
            unknown_keys: UnknownKeyScope::Shallow,
            base_dir: PathBuf::from("."),
            import_checks: false,
            module_roots: Vec::new(),
            check_files: false,
            performance_analysis: false,
            security_analysis: false,
        }
    }
}

impl ValidationOptions {
    /// Options resolving relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Effective module roots: the configured ones, or the base directory.
    pub fn module_roots(&self) -> Vec<PathBuf> {
        if self.module_roots.is_empty() {
            vec![self.base_dir.clone()]
        } else {
            self.module_roots
                .iter()
                .map(|root| absolutize(root, &self.base_dir))
                .collect()
        }
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_roots_default_to_base_dir() {
        let options = ValidationOptions::with_base_dir("/srv/app");
        assert_eq!(options.module_roots(), vec![PathBuf::from("/srv/app")]);
    }

    #[test]
    fn relative_module_roots_join_base_dir() {
        let options = ValidationOptions {
            module_roots: vec![PathBuf::from("src"), PathBuf::from("/opt/steps")],
            ..ValidationOptions::with_base_dir("/srv/app")
        };
        assert_eq!(
            options.module_roots(),
            vec![PathBuf::from("/srv/app/src"), PathBuf::from("/opt/steps")]
        );
    }
}
