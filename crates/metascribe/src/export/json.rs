//! Pretty JSON export.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MetascribeError, Result};

use super::assembler::MetadataRecord;

/// Render the record as indented JSON.
pub fn to_json(record: &MetadataRecord) -> Result<String> {
    serde_json::to_string_pretty(record)
        .map_err(|e| MetascribeError::Persistence(format!("Failed to serialize metadata: {}", e)))
}

/// Write the record as indented JSON, creating the parent directory if needed.
pub fn write_json(record: &MetadataRecord, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let file = File::create(path).map_err(|e| {
        MetascribeError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)
        .map_err(|e| MetascribeError::Persistence(format!("Failed to serialize metadata: {}", e)))?;
    writer.write_all(b"\n").and_then(|_| writer.flush()).map_err(|e| {
        MetascribeError::Persistence(format!("Failed to write '{}': {}", path.display(), e))
    })?;

    tracing::info!(path = %path.display(), columns = record.columns.len(), "wrote JSON metadata");
    Ok(())
}

pub(super) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                MetascribeError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
