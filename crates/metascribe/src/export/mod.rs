//! Metadata export.
//!
//! A finished session is assembled into a [`MetadataRecord`] with a fixed
//! field order, then written as pretty JSON and as DQV Turtle, or bundled
//! with the data into a zip package.
//!
//! ```no_run
//! use chrono::Utc;
//! use metascribe::annotation::AnnotationSession;
//! use metascribe::export::{self, MetadataAssembler};
//!
//! let session = AnnotationSession::load("survey.annotation.json").unwrap();
//! let record = MetadataAssembler::new().from_session(&session, Utc::now()).unwrap();
//! let paths = export::write_all(&record, "out").unwrap();
//! println!("{}", paths.json.display());
//! ```

mod assembler;
mod coerce;
mod dqv;
mod json;
mod package;

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use assembler::{
    ColumnRecord, ColumnStatsRecord, DatasetFields, FinalizedColumn, MetadataAssembler,
    MetadataRecord,
};
pub use coerce::{coerce_number, coerce_stat};
pub use dqv::{to_turtle, write_turtle};
pub use json::{to_json, write_json};
pub use package::{PackageEntries, README_NAME, package_from_session, readme, write_package};

/// Version stamped into every export.
pub const TOOL_VERSION: &str = "2.1.0";

/// What to do with columns that are not confirmed with a type and description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompletePolicy {
    /// Leave them out (logged).
    #[default]
    Exclude,
    /// Include them with `"incomplete": true` and null type/description.
    Flag,
    /// Fail the export.
    Reject,
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub tool_version: String,
    pub incomplete: IncompletePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tool_version: TOOL_VERSION.to_string(),
            incomplete: IncompletePolicy::default(),
        }
    }
}

/// Which files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Dqv,
    All,
    /// Zip of the data, both exports, context files and a README.
    Package,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dqv" | "ttl" | "turtle" => Ok(ExportFormat::Dqv),
            "all" | "both" => Ok(ExportFormat::All),
            "zip" | "package" => Ok(ExportFormat::Package),
            _ => Err(format!("Unknown format: {}. Use: json, dqv, all, or zip.", s)),
        }
    }
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());

/// File-system safe version of a dataset name.
///
/// Lowercase, spaces and hyphens become underscores, other non-word
/// characters are dropped.
pub fn safe_filename(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace([' ', '-'], "_");
    let cleaned = NON_WORD.replace_all(&lowered, "").into_owned();
    if cleaned.is_empty() {
        "dataset".to_string()
    } else {
        cleaned
    }
}

/// Output file locations for a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub turtle: PathBuf,
    pub package: PathBuf,
}

impl ExportPaths {
    pub fn new(out_dir: impl AsRef<Path>, dataset_name: &str) -> Self {
        let stem = safe_filename(dataset_name);
        let dir = out_dir.as_ref();
        Self {
            json: dir.join(format!("{}_metadata.json", stem)),
            turtle: dir.join(format!("{}_metadata.ttl", stem)),
            package: dir.join(format!("{}_package.zip", stem)),
        }
    }
}

/// Write both the JSON and Turtle exports into `out_dir`.
pub fn write_all(record: &MetadataRecord, out_dir: impl AsRef<Path>) -> Result<ExportPaths> {
    let paths = ExportPaths::new(out_dir, &record.dataset_name);
    write_json(record, &paths.json)?;
    write_turtle(record, &paths.turtle)?;
    Ok(paths)
}
