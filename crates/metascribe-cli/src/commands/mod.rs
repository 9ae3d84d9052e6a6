//! CLI command implementations.

pub mod analyze;
pub mod confirm;
pub mod edit;
pub mod export;
pub mod review;
pub mod status;

use std::path::{Path, PathBuf};

use metascribe::annotation::annotation_path;
use metascribe::config::ProviderKind;
use metascribe::{AnnotationSession, Annotator, MetascribeConfig};

const SESSION_SUFFIX: &str = ".annotation.json";

/// Session file for a data file, or the path itself if it already is one.
pub fn session_path(file: &Path) -> PathBuf {
    if file.to_string_lossy().ends_with(SESSION_SUFFIX) {
        file.to_path_buf()
    } else {
        annotation_path(file)
    }
}

/// Load the session belonging to `file`.
pub fn load_session(file: &Path) -> Result<(AnnotationSession, PathBuf), Box<dyn std::error::Error>> {
    let path = session_path(file);
    if !path.exists() {
        return Err(format!(
            "Annotation file not found: {}\nRun 'metascribe analyze {}' first.",
            path.display(),
            file.display()
        )
        .into());
    }
    let session = AnnotationSession::load(&path)?;
    Ok((session, path))
}

/// Annotator for `config`, with optional provider and model overrides.
pub fn build_annotator(
    mut config: MetascribeConfig,
    llm: Option<ProviderKind>,
    model: Option<String>,
) -> Result<Annotator, Box<dyn std::error::Error>> {
    if let Some(kind) = llm {
        config.llm.provider = kind;
    }
    if let Some(model) = model {
        config.llm.model = model;
    }

    let provider = config.llm.build_provider()?;
    let mut annotator = Annotator::with_config(config);
    if let Some(provider) = provider {
        annotator = annotator.with_llm(provider);
    }
    Ok(annotator)
}

/// Data file with a saved session next to it.
#[cfg(test)]
pub(crate) fn analyzed_fixture(dir: &Path, llm: Option<ProviderKind>) -> PathBuf {
    let data = dir.join("visits.csv");
    std::fs::write(&data, "sex,notes\nM,first visit\nF,follow up\nM,referred\n").unwrap();
    let annotator = build_annotator(MetascribeConfig::default(), llm.or(Some(ProviderKind::None)), None).unwrap();
    let session = annotator.annotate_file(&data, None, None).unwrap();
    session.save(annotation_path(&data)).unwrap();
    data
}
