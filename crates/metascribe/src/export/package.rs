//! Zip package: data, both metadata exports, context files and a README.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::annotation::AnnotationSession;
use crate::error::{MetascribeError, Result};
use crate::input::{ContextDocument, DataTable, Parser};

use super::assembler::{ColumnStatsRecord, MetadataRecord};
use super::json::{ensure_parent, to_json};
use super::{ExportPaths, safe_filename, to_turtle};

pub const README_NAME: &str = "README.txt";

/// Entry names inside the archive for a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntries {
    pub dataset: String,
    pub json: String,
    pub turtle: String,
}

impl PackageEntries {
    pub fn new(dataset_name: &str) -> Self {
        let stem = safe_filename(dataset_name);
        Self {
            dataset: format!("{}_dataset.csv", stem),
            json: format!("{}_metadata.json", stem),
            turtle: format!("{}_metadata.ttl", stem),
        }
    }
}

/// Write `<name>_package.zip` into `out_dir` and return its path.
///
/// The table is re-encoded as comma-separated CSV whatever its source
/// delimiter. Context files keep their base name; one that would shadow a
/// generated entry is skipped.
pub fn write_package(
    record: &MetadataRecord,
    table: &DataTable,
    context: &[ContextDocument],
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let path = ExportPaths::new(out_dir, &record.dataset_name).package;
    ensure_parent(&path)?;

    let entries = PackageEntries::new(&record.dataset_name);
    let file = File::create(&path).map_err(|e| package_error(&path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut taken: HashSet<String> = [&entries.dataset, &entries.json, &entries.turtle]
        .into_iter()
        .cloned()
        .chain([README_NAME.to_string()])
        .collect();

    let mut add = |name: &str, bytes: &[u8]| -> Result<()> {
        zip.start_file(name, options).map_err(|e| package_error(&path, e))?;
        zip.write_all(bytes).map_err(|e| package_error(&path, e))
    };

    add(&entries.dataset, &table_csv(table)?)?;
    add(&entries.json, to_json(record)?.as_bytes())?;
    add(&entries.turtle, to_turtle(record).as_bytes())?;

    let mut included = Vec::new();
    for doc in context {
        let name = entry_name(&doc.name);
        if !taken.insert(name.clone()) {
            warn!(document = %doc.name, "context file name clashes with a package entry; skipped");
            continue;
        }
        add(&name, doc.text.as_bytes())?;
        included.push(name);
    }

    add(README_NAME, readme(record, &included).as_bytes())?;
    zip.finish().map_err(|e| package_error(&path, e))?;

    info!(path = %path.display(), context_files = included.len(), "wrote metadata package");
    Ok(path)
}

/// Re-read the session's source file and package it with the record.
pub fn package_from_session(
    record: &MetadataRecord,
    session: &AnnotationSession,
    out_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let (table, source) = Parser::new().parse_file(&session.source.path)?;
    if source.hash != session.source.hash {
        warn!(
            path = %session.source.path.display(),
            "source file changed since it was analyzed"
        );
    }
    write_package(record, &table, &session.context, out_dir)
}

/// Plain-text summary of the package and its columns.
pub fn readme(record: &MetadataRecord, context_files: &[String]) -> String {
    let entries = PackageEntries::new(&record.dataset_name);
    let mut out = String::new();

    let _ = writeln!(out, "# {} - Complete Data Package\n", record.dataset_name);
    let _ = writeln!(out, "## Description");
    let _ = writeln!(
        out,
        "{}\n",
        record.dataset_description.as_deref().unwrap_or("No description")
    );

    let _ = writeln!(out, "## Package Contents");
    let _ = writeln!(out, "- **Dataset**: {} (Original data)", entries.dataset);
    let _ = writeln!(out, "- **JSON Metadata**: {} (Structured metadata)", entries.json);
    let _ = writeln!(out, "- **DQV Metadata**: {} (W3C DQV format)", entries.turtle);
    for name in context_files {
        let _ = writeln!(out, "- **Additional Context**: {} (Additional documentation)", name);
    }

    let _ = writeln!(out, "\n## Column Information ({} columns)", record.columns.len());
    for (i, col) in record.columns.iter().enumerate() {
        let _ = writeln!(out, "\n### {}. {}", i + 1, col.name);
        let _ = writeln!(
            out,
            "- **Type**: {}",
            col.semantic_type.map_or("Unknown", |t| t.as_str())
        );
        let _ = writeln!(
            out,
            "- **Description**: {}",
            col.description.as_deref().unwrap_or("No description")
        );
        let _ = writeln!(out, "- **Missing Values**: {}", col.missing_values);
        let _ = writeln!(out, "- **Unique Values**: {}", col.unique_values);
        if let ColumnStatsRecord::Numeric { mean, std, min, max } = &col.stats {
            let _ = writeln!(out, "- **Mean**: {}", plain(mean));
            let _ = writeln!(out, "- **Std Dev**: {}", plain(std));
            let _ = writeln!(out, "- **Range**: {} - {}", plain(min), plain(max));
        }
        if col.incomplete {
            let _ = writeln!(out, "- **Status**: not reviewed");
        }
    }

    let _ = writeln!(out, "\n## Metadata Generated");
    let _ = writeln!(out, "- **Generated**: {}", record.generated_timestamp);
    let _ = writeln!(out, "- **Tool**: metascribe v{}", record.tool_version);
    let _ = writeln!(out, "\n## Usage");
    let _ = writeln!(out, "- CSV file: open in any spreadsheet or analysis tool");
    let _ = writeln!(out, "- JSON metadata: programmatic access and integration");
    let _ = writeln!(out, "- DQV metadata: semantic web and linked data applications");
    out
}

fn table_csv(table: &DataTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| MetascribeError::Persistence(format!("Failed to encode dataset: {}", e)))
}

fn entry_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "context.txt".to_string())
}

fn plain(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn package_error(path: &Path, err: impl std::fmt::Display) -> MetascribeError {
    MetascribeError::Persistence(format!("Failed to write package '{}': {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use zip::ZipArchive;

    use crate::export::{DatasetFields, FinalizedColumn, MetadataAssembler};
    use crate::inference::StatisticsEngine;
    use crate::input::ContextFormat;
    use crate::schema::{ColumnValues, SemanticType};

    fn record() -> MetadataRecord {
        let column = |name: &str, raw: &[&str], t: SemanticType, d: &str| FinalizedColumn {
            name: name.into(),
            semantic_type: Some(t),
            description: Some(d.into()),
            statistics: StatisticsEngine::new().compute(&ColumnValues::from_raw(raw.iter().copied())),
            confidence: Some(0.9),
            confirmed: true,
        };
        let dataset = DatasetFields {
            name: "Clinic Visits".into(),
            description: None,
            row_count: 3,
            column_count: 2,
        };
        let columns = vec![
            column("age", &["18", "25", "30"], SemanticType::Continuous, "Age in years."),
            column("site", &["North", "South", "North"], SemanticType::Categorical, "Clinic site."),
        ];
        MetadataAssembler::new()
            .assemble(&dataset, &columns, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
            .unwrap()
    }

    fn table() -> DataTable {
        DataTable::new(
            vec!["age".into(), "site".into()],
            vec![
                vec!["18".into(), "North".into()],
                vec!["25".into(), "South, annex".into()],
                vec!["30".into(), "North".into()],
            ],
            b'\t',
        )
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> String {
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_package_entries() {
        let dir = TempDir::new().unwrap();
        let context = vec![
            ContextDocument::new("docs/codebook.md", ContextFormat::Markdown, "age: years"),
            ContextDocument::new("README.txt", ContextFormat::Text, "shadowed"),
        ];

        let path = write_package(&record(), &table(), &context, dir.path().join("out")).unwrap();
        assert!(path.ends_with("clinic_visits_package.zip"));

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "README.txt",
                "clinic_visits_dataset.csv",
                "clinic_visits_metadata.json",
                "clinic_visits_metadata.ttl",
                "codebook.md",
            ]
        );

        let csv = read_entry(&mut archive, "clinic_visits_dataset.csv");
        assert_eq!(csv, "age,site\n18,North\n25,\"South, annex\"\n30,North\n");
        assert_eq!(read_entry(&mut archive, "codebook.md"), "age: years");

        let json: Value = serde_json::from_str(&read_entry(&mut archive, "clinic_visits_metadata.json")).unwrap();
        assert_eq!(json["dataset_name"], "Clinic Visits");
        let readme = read_entry(&mut archive, "README.txt");
        assert!(readme.contains("codebook.md"));
        assert!(!readme.contains("shadowed"));
    }

    #[test]
    fn test_readme_lists_columns() {
        let text = readme(&record(), &[]);

        assert!(text.starts_with("# Clinic Visits - Complete Data Package\n"));
        assert!(text.contains("No description"));
        assert!(text.contains("## Column Information (2 columns)"));
        assert!(text.contains("### 1. age\n- **Type**: continuous\n- **Description**: Age in years."));
        assert!(text.contains("- **Range**: 18 - 30"));
        assert!(!text.contains("Additional Context"));
        assert!(text.contains("- **Generated**: 2024-05-01T09:30:00Z"));
        // categorical columns carry no numeric summary
        assert_eq!(text.matches("**Mean**").count(), 1);
    }

    #[test]
    fn test_entry_name_strips_directories() {
        assert_eq!(entry_name("notes/protocol.txt"), "protocol.txt");
        assert_eq!(entry_name(""), "context.txt");
    }
}
