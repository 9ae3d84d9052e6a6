//! Edit command - change one column's description or type.

use std::path::PathBuf;

use colored::Colorize;
use metascribe::config::ProviderKind;
use metascribe::{MetascribeConfig, SemanticType};

use super::{build_annotator, load_session};

pub fn run(
    file: PathBuf,
    column: String,
    description: Option<String>,
    semantic_type: Option<SemanticType>,
    reclassify: bool,
    llm: Option<ProviderKind>,
    config: MetascribeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if description.is_none() && semantic_type.is_none() && !reclassify {
        return Err("Nothing to do: pass --description, --type or --reclassify".into());
    }

    let (mut session, path) = load_session(&file)?;

    if let Some(text) = &description {
        session.edit_description(&column, text)?;
        println!("{} description of {}", "Updated".green().bold(), column.white().bold());
    }

    if let Some(t) = semantic_type {
        session.set_type(&column, t)?;
        println!(
            "{} type of {} to {}",
            "Set".green().bold(),
            column.white().bold(),
            t.as_str().cyan()
        );
    }

    if reclassify {
        let annotator = build_annotator(config, llm, None)?;
        annotator.reclassify(&mut session, &column)?;
        if let Some(col) = session.column(&column) {
            let confidence = col
                .confidence_score()
                .map(|c| format!(" ({:.0}%)", c * 100.0))
                .unwrap_or_default();
            println!(
                "{} {} as {}{}",
                "Re-classified".green().bold(),
                column.white().bold(),
                col.proposed_type().as_str().cyan(),
                confidence
            );
        }
    }

    session.save(&path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::analyzed_fixture;
    use metascribe::annotation::AnnotationStatus;

    #[test]
    fn test_edit_description_and_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = analyzed_fixture(dir.path(), None);

        run(
            data.clone(),
            "notes".into(),
            Some("Clinician remarks for the visit.".into()),
            Some(SemanticType::FreeText),
            false,
            None,
            MetascribeConfig::default(),
        )
        .unwrap();

        let (session, _) = load_session(&data).unwrap();
        let notes = session.column("notes").unwrap();
        assert_eq!(notes.status, AnnotationStatus::Edited);
        assert_eq!(notes.description.as_deref(), Some("Clinician remarks for the visit."));
        assert_eq!(notes.semantic_type, Some(SemanticType::FreeText));
    }

    #[test]
    fn test_reclassify_with_mock() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = analyzed_fixture(dir.path(), Some(ProviderKind::Mock));

        run(
            data.clone(),
            "sex".into(),
            None,
            None,
            true,
            Some(ProviderKind::Mock),
            MetascribeConfig::default(),
        )
        .unwrap();

        let (session, _) = load_session(&data).unwrap();
        assert_eq!(session.column("sex").unwrap().semantic_type, Some(SemanticType::Binary));
    }

    #[test]
    fn test_nothing_to_do() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = analyzed_fixture(dir.path(), None);
        let result = run(data, "sex".into(), None, None, false, None, MetascribeConfig::default());
        assert!(result.is_err());
    }
}
