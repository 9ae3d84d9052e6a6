//! Delimited text reader.
//!
//! The separator is sniffed from the first lines unless configured. Ragged
//! rows are padded to the header width.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{DataTable, SourceMetadata};
use crate::error::{MetascribeError, Result};

/// Recognised separators and their format names, in tie-break order.
const CANDIDATES: [(u8, &str); 4] = [(b',', "csv"), (b'\t', "tsv"), (b';', "csv-semicolon"), (b'|', "psv")];

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Field separator; sniffed when `None`.
    pub delimiter: Option<u8>,
    /// First row holds column names.
    pub has_header: bool,
    /// Stop after this many data rows.
    pub max_rows: Option<usize>,
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Reads delimited text into a [`DataTable`].
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read a file into a table plus provenance (hash, size, format).
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| MetascribeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let hash = format!("sha256:{:x}", Sha256::digest(&contents));

        let (table, delimiter) = self.parse_bytes(&contents)?;
        let format = format_name(delimiter).to_string();

        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            format = %format,
            "parsed data file"
        );

        let source = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            contents.len() as u64,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, source))
    }

    /// Parse in-memory data, detecting the delimiter unless configured.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<(DataTable, u8)> {
        let delimiter = match self.config.delimiter {
            Some(d) if d.is_ascii() && d != b'\n' && d != b'\r' && d != self.config.quote => d,
            Some(d) => {
                return Err(MetascribeError::InvalidDelimiter(format!(
                    "byte 0x{:02x} cannot separate fields",
                    d
                )));
            }
            None => sniff_delimiter(bytes)?,
        };
        let table = self.parse_with_delimiter(bytes, delimiter)?;
        Ok((table, delimiter))
    }

    fn parse_with_delimiter(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let limit = self.config.max_rows.unwrap_or(usize::MAX);
        let records = reader
            .records()
            .take(limit)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.to_string()).collect()
        } else {
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() {
            return Err(MetascribeError::EmptyData("No columns found".to_string()));
        }

        let headers = dedupe_headers(headers);
        let width = headers.len();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| {
                let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        if rows.is_empty() {
            return Err(MetascribeError::EmptyData("No data rows found".to_string()));
        }

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

/// Make column names non-empty and unique within the table.
///
/// Blank names become `unnamed_N`; repeats get a `.N` suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            let base = match raw.trim() {
                "" => format!("unnamed_{}", idx + 1),
                name => name.to_string(),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Lines inspected when sniffing the delimiter.
const SNIFF_LINES: usize = 10;

/// Short format name for a delimiter, stored in [`SourceMetadata::format`].
fn format_name(delimiter: u8) -> &'static str {
    CANDIDATES
        .iter()
        .find(|(d, _)| *d == delimiter)
        .map(|(_, name)| *name)
        .unwrap_or("delimited")
}

/// Pick the separator whose per-line field count is steadiest.
///
/// Ranked by (steadiness, fields on the first line); earlier candidates win ties.
fn sniff_delimiter(bytes: &[u8]) -> Result<u8> {
    let lines: Vec<String> = bytes
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    if lines.is_empty() {
        return Err(MetascribeError::EmptyData("nothing to read".to_string()));
    }

    let mut best: Option<((u8, usize), u8)> = None;
    for (delimiter, _) in CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| unquoted_count(line, delimiter))
            .collect();
        let first = counts[0];
        if first == 0 {
            continue;
        }

        let lo = counts.iter().copied().min().unwrap_or(first);
        let hi = counts.iter().copied().max().unwrap_or(first);
        let steadiness = match hi - lo {
            0 => 2,
            1 => 1,
            _ => 0,
        };
        let rank = (steadiness, first);
        if best.is_none_or(|(r, _)| rank > r) {
            best = Some((rank, delimiter));
        }
    }

    Ok(best.map_or(b',', |(_, d)| d))
}

/// Occurrences of `delimiter` outside double quotes.
fn unquoted_count(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    line.bytes()
        .filter(|&b| {
            if b == b'"' {
                quoted = !quoted;
            }
            b == delimiter && !quoted
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_common_separators() {
        assert_eq!(sniff_delimiter(b"id,dose,site\nP1,5,arm\nP2,10,leg").unwrap(), b',');
        assert_eq!(sniff_delimiter(b"id\tdose\nP1\t5\nP2\t10").unwrap(), b'\t');
        assert_eq!(sniff_delimiter(b"id|dose\nP1|5\nP2|10").unwrap(), b'|');
    }

    #[test]
    fn test_sniff_skips_quoted_commas() {
        let data = b"clinician;remark\n\"Okafor, N\";stable\n\"Lee, S\";review";
        assert_eq!(sniff_delimiter(data).unwrap(), b';');
    }

    #[test]
    fn test_sniff_prefers_steady_counts() {
        // commas only appear in free text
        let data = b"code\tnote\nA\tfine, thanks\nB\tok\nC\tlate, again, sorry";
        assert_eq!(sniff_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_single_column_defaults_to_comma() {
        let (table, delimiter) = Parser::new().parse_bytes(b"score\n1.5\n2.0\n").unwrap();
        assert_eq!(delimiter, b',');
        assert_eq!(table.headers, vec!["score"]);
        assert_eq!(format_name(delimiter), "csv");
    }

    #[test]
    fn test_parse_bytes() {
        let (table, delimiter) = Parser::new()
            .parse_bytes(b"site;visits;lead\nNorth;12;Ruiz\nSouth;7;Osei\n")
            .unwrap();

        assert_eq!(delimiter, b';');
        assert_eq!(format_name(delimiter), "csv-semicolon");
        assert_eq!(table.headers, vec!["site", "visits", "lead"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 2), Some("Osei"));
    }

    #[test]
    fn test_max_rows_and_no_header() {
        let parser = Parser::with_config(ParserConfig {
            has_header: false,
            max_rows: Some(2),
            ..Default::default()
        });
        let (table, _) = parser.parse_bytes(b"1,a\n2,b\n3,c\n").unwrap();
        assert_eq!(table.headers, vec!["column_1", "column_2"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let (table, _) = Parser::new().parse_bytes(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.get(0, 2), Some(""));
    }

    #[test]
    fn test_header_only_is_empty_data() {
        let err = Parser::new().parse_bytes(b"a,b,c\n").unwrap_err();
        assert!(matches!(err, MetascribeError::EmptyData(_)));
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let (table, _) = Parser::new().parse_bytes(b"x,x,,y\n1,2,3,4\n").unwrap();
        assert_eq!(table.headers, vec!["x", "x.1", "unnamed_3", "y"]);
    }

    #[test]
    fn test_invalid_configured_delimiter() {
        let parser = Parser::with_config(ParserConfig {
            delimiter: Some(b'\n'),
            ..Default::default()
        });
        let err = parser.parse_bytes(b"a\nb").unwrap_err();
        assert!(matches!(err, MetascribeError::InvalidDelimiter(_)));
    }

    #[test]
    fn test_parse_file_hashes_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doses.tsv");
        std::fs::write(&path, "id\tdose\nP1\t5\n").unwrap();

        let (_, source) = Parser::new().parse_file(&path).unwrap();
        assert_eq!(source.format, "tsv");
        assert_eq!(source.file, "doses.tsv");
        assert!(source.hash.starts_with("sha256:"));
        assert_eq!(source.hash.len(), "sha256:".len() + 64);
    }
}
