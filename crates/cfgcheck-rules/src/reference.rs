//! # Reference CSV Probe
//!
//! One streaming read per reference file: the header row is taken, then
//! the remaining records are counted so a malformed row anywhere in the
//! file is caught.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Header row and data row count of a reference CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvShape {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Records after the header row.
    pub rows: usize,
}

impl CsvShape {
    /// Whether `column` is a header (exact, case-sensitive).
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

/// Why a reference CSV could not be probed.
#[derive(Error, Debug)]
pub enum CsvProbeError {
    /// The file does not exist.
    #[error("reference file {} does not exist", .0.display())]
    NotFound(PathBuf),
    /// The file has no bytes at all.
    #[error("reference file {} is empty", .0.display())]
    Empty(PathBuf),
    /// The first row is blank.
    #[error("reference file {} has no header row", .0.display())]
    MissingHeaders(PathBuf),
    /// The file cannot be opened or read.
    #[error("cannot read reference file {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The content is not well-formed CSV.
    #[error("cannot parse reference file {}: {source}", .path.display())]
    Malformed {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
}

/// Read the header row of `path` and count its records.
pub fn probe_csv(path: &Path) -> Result<CsvShape, CsvProbeError> {
    let metadata = std::fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => CsvProbeError::NotFound(path.to_path_buf()),
        _ => CsvProbeError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if metadata.len() == 0 {
        return Err(CsvProbeError::Empty(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| malformed(path, source))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| malformed(path, source))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(CsvProbeError::MissingHeaders(path.to_path_buf()));
    }

    let mut rows = 0;
    for record in reader.records() {
        record.map_err(|source| malformed(path, source))?;
        rows += 1;
    }
    tracing::debug!(path = %path.display(), columns = headers.len(), rows, "reference csv probed");
    Ok(CsvShape { headers, rows })
}

fn malformed(path: &Path, source: csv::Error) -> CsvProbeError {
    if source.is_io_error() {
        return CsvProbeError::Io {
            path: path.to_path_buf(),
            source: source.into(),
        };
    }
    CsvProbeError::Malformed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_headers_and_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ref.csv", b"supplier_name,status\nAcme,open\nGlobex,closed\n");
        let shape = probe_csv(&path).unwrap();
        assert_eq!(shape.headers, vec!["supplier_name", "status"]);
        assert_eq!(shape.rows, 2);
        assert!(shape.has_column("status"));
        assert!(!shape.has_column("Status"));
    }

    #[test]
    fn header_only_file_has_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ref.csv", b"a,b\n");
        assert_eq!(probe_csv(&path).unwrap().rows, 0);
    }

    #[test]
    fn classifies_failures() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write(&dir, "empty.csv", b"");
        let blank = write(&dir, "blank.csv", b",,\n1,2,3\n");
        let ragged = write(&dir, "ragged.csv", b"a,b\n1,2\n1,2,3\n");
        let binary = write(&dir, "binary.csv", b"a,\xff\xfe\n1,2\n");

        assert!(matches!(probe_csv(&empty), Err(CsvProbeError::Empty(_))));
        assert!(matches!(probe_csv(&blank), Err(CsvProbeError::MissingHeaders(_))));
        assert!(matches!(probe_csv(&ragged), Err(CsvProbeError::Malformed { .. })));
        assert!(matches!(probe_csv(&binary), Err(CsvProbeError::Malformed { .. })));
        assert!(matches!(
            probe_csv(&dir.path().join("absent.csv")),
            Err(CsvProbeError::NotFound(_))
        ));
    }
}
