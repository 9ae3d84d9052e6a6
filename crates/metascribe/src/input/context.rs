//! Context documents supplied alongside a dataset.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MetascribeError, Result};

/// Format a context document was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    Text,
    Markdown,
    Json,
    Csv,
    Tsv,
    Pdf,
    Docx,
    Xlsx,
}

impl ContextFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(ContextFormat::Text),
            "md" | "markdown" => Some(ContextFormat::Markdown),
            "json" => Some(ContextFormat::Json),
            "csv" => Some(ContextFormat::Csv),
            "tsv" | "tab" => Some(ContextFormat::Tsv),
            "pdf" => Some(ContextFormat::Pdf),
            "docx" => Some(ContextFormat::Docx),
            "xlsx" | "xls" => Some(ContextFormat::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for ContextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextFormat::Text => "txt",
            ContextFormat::Markdown => "md",
            ContextFormat::Json => "json",
            ContextFormat::Csv => "csv",
            ContextFormat::Tsv => "tsv",
            ContextFormat::Pdf => "pdf",
            ContextFormat::Docx => "docx",
            ContextFormat::Xlsx => "xlsx",
        };
        f.write_str(s)
    }
}

/// Plain text extracted from a supplementary file.
///
/// The text is appended verbatim to prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// File name shown to the model.
    pub name: String,
    pub format: ContextFormat,
    pub text: String,
}

impl ContextDocument {
    pub fn new(name: impl Into<String>, format: ContextFormat, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format,
            text: text.into(),
        }
    }
}

/// Turns a supplementary file into a [`ContextDocument`].
pub trait ContextExtractor {
    fn extract(&self, path: &Path) -> Result<ContextDocument>;
}

/// Extractor for text-based formats.
///
/// Binary office formats and PDF need a dedicated extractor and are rejected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn render_json(raw: &str) -> Result<String> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    fn render_table(raw: &str, delimiter: u8) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut lines = vec![headers.join(" | ")];
        let mut rows = 0usize;
        for record in reader.records() {
            let record = record?;
            lines.push(record.iter().collect::<Vec<_>>().join(" | "));
            rows += 1;
        }

        Ok(format!(
            "Table with {} rows and columns: {}\n{}",
            rows,
            headers.join(", "),
            lines.join("\n")
        ))
    }
}

impl ContextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ContextDocument> {
        let format = ContextFormat::from_path(path).ok_or_else(|| {
            MetascribeError::UnsupportedFormat(format!(
                "Unrecognized context file type: {}",
                path.display()
            ))
        })?;

        if matches!(
            format,
            ContextFormat::Pdf | ContextFormat::Docx | ContextFormat::Xlsx
        ) {
            return Err(MetascribeError::UnsupportedFormat(format!(
                "{} context files need an external text extractor: {}",
                format,
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|e| MetascribeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let text = match format {
            ContextFormat::Json => Self::render_json(&raw)?,
            ContextFormat::Csv => Self::render_table(&raw, b',')?,
            ContextFormat::Tsv => Self::render_table(&raw, b'\t')?,
            _ => raw,
        };

        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ContextDocument::new(name, format, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_extract_text_verbatim() {
        let file = write_temp(".txt", "Survey of 2023 customers.\nAges in years.");
        let doc = PlainTextExtractor::new().extract(file.path()).unwrap();
        assert_eq!(doc.format, ContextFormat::Text);
        assert_eq!(doc.text, "Survey of 2023 customers.\nAges in years.");
    }

    #[test]
    fn test_extract_json_pretty_prints() {
        let file = write_temp(".json", r#"{"unit":"kg"}"#);
        let doc = PlainTextExtractor::new().extract(file.path()).unwrap();
        assert!(doc.text.contains("\"unit\": \"kg\""));
    }

    #[test]
    fn test_extract_csv_keeps_every_row() {
        let file = write_temp(".csv", "code,meaning\nA,alpha\nB,beta\n");
        let doc = PlainTextExtractor::new().extract(file.path()).unwrap();
        assert!(doc.text.starts_with("Table with 2 rows"));
        assert!(doc.text.contains("A | alpha"));
        assert!(doc.text.contains("B | beta"));
    }

    #[test]
    fn test_binary_formats_rejected() {
        let file = write_temp(".pdf", "%PDF-1.4");
        let err = PlainTextExtractor::new().extract(file.path()).unwrap_err();
        assert!(matches!(err, MetascribeError::UnsupportedFormat(_)));
    }
}
