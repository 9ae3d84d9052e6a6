//! Review command - step through unconfirmed columns in the terminal.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use metascribe::config::ProviderKind;
use metascribe::{AnnotationSession, Annotator, ColumnAnnotation, MetascribeConfig, SemanticType};

use super::{build_annotator, load_session};

/// How a review pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Every column was visited.
    Finished,
    /// The reviewer quit early.
    Quit,
}

pub fn run(
    file: PathBuf,
    llm: Option<ProviderKind>,
    user: String,
    config: MetascribeConfig,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, path) = load_session(&file)?;

    let annotator = match build_annotator(config.clone(), llm, None) {
        Ok(annotator) => annotator,
        Err(e) => {
            println!("{} re-classification disabled: {}", "Note:".yellow(), e);
            Annotator::with_config(config)
        }
    };

    if session.is_complete() {
        println!("{}", "All columns are already confirmed.".green());
        return Ok(());
    }

    println!(
        "{} {} ({} of {} columns left)",
        "Reviewing".cyan().bold(),
        session.dataset.name.white().bold(),
        session.unconfirmed().len(),
        session.columns.len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let outcome = review_loop(
        &mut session,
        &annotator,
        &user,
        &path,
        &mut stdin.lock(),
        &mut stdout,
        verbose,
    )?;

    session.save(&path)?;
    let counts = session.counts();
    println!();
    println!(
        "{} {} confirmed, {} remaining",
        if outcome == ReviewOutcome::Quit { "Stopped:" } else { "Done:" }.green().bold(),
        counts.confirmed,
        counts.total() - counts.confirmed
    );
    Ok(())
}

/// Walk unconfirmed columns, saving after every change.
pub fn review_loop(
    session: &mut AnnotationSession,
    annotator: &Annotator,
    user: &str,
    path: &Path,
    input: &mut impl BufRead,
    output: &mut impl Write,
    verbose: bool,
) -> Result<ReviewOutcome, Box<dyn std::error::Error>> {
    let names: Vec<String> = session.unconfirmed().iter().map(|c| c.name.clone()).collect();

    for name in names {
        loop {
            let Some(col) = session.column(&name) else { break };
            show_column(output, col, verbose)?;
            write!(
                output,
                "[a]ccept  [e]dit description  [t]ype  [s]kip  [q]uit > "
            )?;
            output.flush()?;

            let Some(choice) = read_line(input)? else {
                return Ok(ReviewOutcome::Quit);
            };
            match choice.as_str() {
                "a" | "accept" => {
                    match session.confirm(&name, Some(user)) {
                        Ok(()) => writeln!(output, "{}", "Confirmed.".green())?,
                        Err(e) => writeln!(output, "{} {}", "Cannot confirm:".red(), e)?,
                    }
                    session.save(path)?;
                    if session.column(&name).is_some_and(|c| c.status.is_decided()) {
                        break;
                    }
                }
                "e" | "edit" => {
                    write!(output, "New description > ")?;
                    output.flush()?;
                    let text = read_line(input)?.unwrap_or_default();
                    if let Err(e) = session.edit_description(&name, &text) {
                        writeln!(output, "{} {}", "Not changed:".red(), e)?;
                        continue;
                    }
                    if annotator.has_llm() {
                        annotator.reclassify(session, &name)?;
                        if let Some(col) = session.column(&name) {
                            writeln!(output, "Re-classified as {}", col.proposed_type().as_str().cyan())?;
                        }
                    }
                    session.save(path)?;
                }
                "t" | "type" => {
                    write!(output, "Type ({}) > ", type_choices())?;
                    output.flush()?;
                    let raw = read_line(input)?.unwrap_or_default();
                    match raw.parse::<SemanticType>() {
                        Ok(t) => {
                            session.set_type(&name, t)?;
                            session.save(path)?;
                        }
                        Err(e) => writeln!(output, "{} {}", "Not changed:".red(), e)?,
                    }
                }
                "s" | "skip" | "" => break,
                "q" | "quit" => return Ok(ReviewOutcome::Quit),
                other => writeln!(output, "Unknown choice: {}", other)?,
            }
        }
    }

    Ok(ReviewOutcome::Finished)
}

fn show_column(output: &mut impl Write, col: &ColumnAnnotation, verbose: bool) -> io::Result<()> {
    writeln!(output)?;
    writeln!(output, "{} {}", "Column:".yellow().bold(), col.name.white().bold())?;
    let confidence = col
        .confidence_score()
        .map(|c| format!(" ({:.0}%)", c * 100.0))
        .unwrap_or_default();
    writeln!(output, "  Type:        {}{}", col.proposed_type().as_str().cyan(), confidence)?;
    writeln!(
        output,
        "  Description: {}",
        col.description.as_deref().unwrap_or("(none)")
    )?;
    writeln!(output, "  Heuristic:   {}", col.heuristic.rule.describe().dimmed())?;
    if col.ai_unavailable() {
        writeln!(output, "  {}", "AI suggestion unavailable".yellow())?;
    }
    if verbose {
        writeln!(output, "  Statistics:  {}", col.statistics.summary().dimmed())?;
    }
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn type_choices() -> String {
    SemanticType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use metascribe::annotation::AnnotationStatus;

    fn session(dir: &Path) -> (AnnotationSession, PathBuf) {
        let data = dir.join("visits.csv");
        std::fs::write(&data, "sex,notes\nM,first visit\nF,follow up\nM,referred\n").unwrap();
        let annotator = build_annotator(MetascribeConfig::default(), Some(ProviderKind::Mock), None).unwrap();
        let session = annotator.annotate_file(&data, None, None).unwrap();
        (session, dir.join("visits.annotation.json"))
    }

    #[test]
    fn test_accept_and_type_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut session, path) = session(dir.path());
        let annotator = Annotator::new();

        let mut input = Cursor::new("a\nt\nfree text\na\n");
        let mut output = Vec::new();
        let outcome = review_loop(&mut session, &annotator, "tester", &path, &mut input, &mut output, false).unwrap();

        assert_eq!(outcome, ReviewOutcome::Finished);
        assert!(session.is_complete());
        assert_eq!(session.column("notes").unwrap().semantic_type, Some(SemanticType::FreeText));
        assert_eq!(session.column("sex").unwrap().confirmed_by.as_deref(), Some("tester"));

        let saved = AnnotationSession::load(&path).unwrap();
        assert_eq!(saved.counts(), session.counts());
        assert_eq!(saved.column("notes").unwrap().semantic_type, Some(SemanticType::FreeText));
    }

    #[test]
    fn test_edit_then_quit() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut session, path) = session(dir.path());
        let annotator = Annotator::new();

        let mut input = Cursor::new("e\nSex recorded at intake.\nq\n");
        let mut output = Vec::new();
        let outcome = review_loop(&mut session, &annotator, "tester", &path, &mut input, &mut output, true).unwrap();

        assert_eq!(outcome, ReviewOutcome::Quit);
        let sex = session.column("sex").unwrap();
        assert_eq!(sex.status, AnnotationStatus::Edited);
        assert_eq!(sex.description.as_deref(), Some("Sex recorded at intake."));
    }

    #[test]
    fn test_end_of_input_stops() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut session, path) = session(dir.path());
        let annotator = Annotator::new();

        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let outcome = review_loop(&mut session, &annotator, "tester", &path, &mut input, &mut output, false).unwrap();
        assert_eq!(outcome, ReviewOutcome::Quit);
        assert_eq!(session.counts().confirmed, 0);
    }
}
