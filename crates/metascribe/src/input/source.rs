//! Loaded tables and their provenance.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};
use crate::schema::ColumnValues;

/// Provenance of a loaded data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub file: String,
    pub path: PathBuf,
    /// `sha256:` followed by the hex digest of the raw bytes.
    pub hash: String,
    pub size_bytes: u64,
    /// Format name derived from the separator: csv, tsv, csv-semicolon or psv.
    pub format: String,
    /// Data rows, header excluded.
    pub row_count: usize,
    pub column_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }

    /// File name without extension, used as the default dataset name.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.clone())
    }
}

/// Cell texts read as missing, compared case-insensitively after trimming.
const NULL_MARKERS: [&str; 9] = ["", "na", "n/a", "nan", "null", "none", "nil", ".", "-"];

/// A parsed table: header names and row-major cell text.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub headers: Vec<String>,
    /// Every row is padded to `headers.len()`.
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Data rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one column; absent cells read as empty.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map_or("", String::as_str))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Typed values for a column by name.
    pub fn typed_column(&self, name: &str) -> Result<ColumnValues> {
        let index = self
            .column_index(name)
            .ok_or_else(|| MetascribeError::ColumnNotFound(name.to_string()))?;
        Ok(ColumnValues::from_raw(self.column_values(index)))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// First `n` rows, for dataset samples in prompts.
    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Whether a cell counts as missing.
    pub fn is_null_value(value: &str) -> bool {
        let cell = value.trim();
        NULL_MARKERS.iter().any(|marker| cell.eq_ignore_ascii_case(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElementaryKind;

    fn table() -> DataTable {
        DataTable::new(
            vec!["id".into(), "age".into()],
            vec![
                vec!["A1".into(), "30".into()],
                vec!["A2".into(), "".into()],
                vec!["A3".into(), "41".into()],
            ],
            b',',
        )
    }

    #[test]
    fn test_typed_column() {
        let t = table();
        assert_eq!(t.typed_column("age").unwrap().kind(), ElementaryKind::Numeric);
        assert_eq!(t.typed_column("id").unwrap().kind(), ElementaryKind::Categorical);
        assert!(matches!(
            t.typed_column("missing"),
            Err(MetascribeError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_null_markers() {
        for marker in ["", "  ", "NA", "n/a", "NaN", "null", "None", "nil", ".", "-"] {
            assert!(DataTable::is_null_value(marker), "{:?} should be missing", marker);
        }
        for value in ["0", "-1", "no", "nan2", "N.A."] {
            assert!(!DataTable::is_null_value(value), "{:?} should be a value", value);
        }
    }

    #[test]
    fn test_head_clamps() {
        let t = table();
        assert_eq!(t.head(2).len(), 2);
        assert_eq!(t.head(50).len(), 3);
    }
}
