//! Session files: `<stem>.annotation.json` next to the data.
//!
//! Saves go through a sibling temp file and a rename, so an interrupted
//! review never leaves a half-written session behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MetascribeError, Result};

use super::session::{AnnotationSession, SESSION_FORMAT_VERSION};

fn persistence_error(action: &str, path: &Path, err: impl std::fmt::Display) -> MetascribeError {
    MetascribeError::Persistence(format!("{} '{}': {}", action, path.display(), err))
}

/// Major component of a `x.y.z` version string.
fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

impl AnnotationSession {
    /// Save the session to a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use metascribe::annotation::AnnotationSession;
    /// # fn example(session: &AnnotationSession) -> metascribe::Result<()> {
    /// session.save("survey.annotation.json")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| persistence_error("cannot create directory", parent, e))?;
        }

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let file = File::create(&staging).map_err(|e| persistence_error("cannot create", &staging, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| persistence_error("cannot serialize session to", &staging, e))?;
        writer
            .flush()
            .map_err(|e| persistence_error("cannot write", &staging, e))?;
        drop(writer);

        fs::rename(&staging, path).map_err(|e| persistence_error("cannot replace", path, e))?;
        debug!(path = %path.display(), columns = self.columns.len(), "saved session");
        Ok(())
    }

    /// Load a session saved by a compatible version.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| persistence_error("cannot open", path, e))?;
        let session: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| persistence_error("cannot parse session", path, e))?;

        if major(&session.format_version) != major(SESSION_FORMAT_VERSION) {
            return Err(persistence_error(
                "unsupported session format in",
                path,
                format!(
                    "version {} (expected {}.x)",
                    session.format_version,
                    major(SESSION_FORMAT_VERSION)
                ),
            ));
        }
        Ok(session)
    }
}

/// Session file path for a data file.
///
/// # Example
///
/// ```
/// use metascribe::annotation::annotation_path;
///
/// let path = annotation_path("data/survey.csv");
/// assert_eq!(path.to_string_lossy(), "data/survey.annotation.json");
/// ```
pub fn annotation_path(data_path: impl AsRef<Path>) -> PathBuf {
    let data_path = data_path.as_ref();
    let stem = data_path.file_stem().unwrap_or_default().to_string_lossy();
    let parent = data_path.parent().unwrap_or(Path::new("."));

    parent.join(format!("{}.annotation.json", stem))
}
