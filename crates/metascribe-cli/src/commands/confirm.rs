//! Confirm command - finalize one column or all remaining columns.

use std::path::PathBuf;

use colored::Colorize;

use super::load_session;

pub fn run(
    file: PathBuf,
    column: Option<String>,
    all: bool,
    user: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, path) = load_session(&file)?;

    if all {
        let confirmed = session.confirm_all(Some(&user))?;
        println!(
            "{} {} column(s)",
            "Confirmed".green().bold(),
            confirmed.to_string().white().bold()
        );
    } else if let Some(column) = column {
        session.confirm(&column, Some(&user))?;
        println!("{} {}", "Confirmed".green().bold(), column.white().bold());
    } else {
        return Err("Pass --column <NAME> or --all".into());
    }

    session.save(&path)?;

    if session.is_complete() {
        println!(
            "All columns confirmed. Run {} to write the metadata.",
            format!("metascribe export {}", path.display()).cyan().bold()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::analyzed_fixture;
    use metascribe::annotation::AnnotationStatus;
    use metascribe::config::ProviderKind;

    #[test]
    fn test_confirm_one_then_all() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = analyzed_fixture(dir.path(), Some(ProviderKind::Mock));

        run(data.clone(), Some("sex".into()), false, "ana".into()).unwrap();
        let (session, _) = load_session(&data).unwrap();
        assert_eq!(session.column("sex").unwrap().status, AnnotationStatus::Confirmed);
        assert!(!session.is_complete());

        run(data.clone(), None, true, "ana".into()).unwrap();
        let (session, _) = load_session(&data).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.column("notes").unwrap().confirmed_by.as_deref(), Some("ana"));
    }

    #[test]
    fn test_confirm_needs_a_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = analyzed_fixture(dir.path(), None);
        assert!(run(data.clone(), None, false, "ana".into()).is_err());
        assert!(run(data, Some("missing".into()), false, "ana".into()).is_err());
    }
}
