//! Analyze command - profile a data file and create an annotation session.

use std::path::PathBuf;

use colored::Colorize;
use metascribe::config::ProviderKind;
use metascribe::{AnnotationSession, MetascribeConfig};

use super::{build_annotator, session_path};

pub struct AnalyzeArgs {
    pub file: PathBuf,
    pub name: Option<String>,
    pub description: Option<String>,
    pub context: Vec<PathBuf>,
    pub llm: Option<ProviderKind>,
    pub model: Option<String>,
    pub output: Option<PathBuf>,
}

pub fn run(
    args: AnalyzeArgs,
    config: MetascribeConfig,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !args.file.exists() {
        return Err(format!("File not found: {}", args.file.display()).into());
    }

    println!(
        "{} {}",
        "Analyzing".cyan().bold(),
        args.file.display().to_string().white()
    );

    let annotator = build_annotator(config, args.llm, args.model)?;
    if !annotator.has_llm() {
        println!(
            "{} no LLM configured, columns keep their heuristic types",
            "Note:".yellow()
        );
    }

    let (table, source) = annotator.load(&args.file)?;
    let mut session = annotator.start_session(
        &table,
        source,
        args.name.as_deref(),
        args.description.as_deref(),
    )?;
    for document in &args.context {
        annotator.add_context(&mut session, document)?;
    }
    annotator.annotate_all(&mut session)?;

    print_columns(&session, verbose);

    let output_path = args.output.unwrap_or_else(|| session_path(&args.file));
    session.save(&output_path)?;

    println!();
    println!(
        "{} {}",
        "Saved to".green().bold(),
        output_path.display().to_string().white()
    );

    let unavailable = session.columns.iter().filter(|c| c.ai_unavailable()).count();
    if unavailable > 0 {
        println!(
            "{} AI suggestion unavailable for {} column(s)",
            "Warning:".yellow().bold(),
            unavailable
        );
    }

    println!(
        "Run {} to review suggestions",
        format!("metascribe review {}", output_path.display())
            .cyan()
            .bold()
    );

    Ok(())
}

fn print_columns(session: &AnnotationSession, verbose: bool) {
    println!(
        "{} rows, {} columns",
        session.dataset.row_count.to_string().white().bold(),
        session.dataset.column_count.to_string().white().bold()
    );
    println!();

    for col in &session.columns {
        let confidence = col
            .confidence_score()
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:24} {:12} {:>5}  {}",
            col.name,
            col.proposed_type().as_str(),
            confidence,
            col.status.label().dimmed()
        );
        if verbose {
            println!("      {}", col.statistics.summary().dimmed());
            if let Some(description) = &col.description {
                println!("      {}", description);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metascribe::annotation::AnnotationStatus;

    fn args(file: PathBuf) -> AnalyzeArgs {
        AnalyzeArgs {
            file,
            name: Some("Visits".into()),
            description: None,
            context: Vec::new(),
            llm: Some(ProviderKind::Mock),
            model: None,
            output: None,
        }
    }

    #[test]
    fn test_analyze_writes_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = dir.path().join("visits.csv");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&data, "sex,age\nM,30\nF,41\nM,52\n").unwrap();
        std::fs::write(&notes, "Visits recorded at the outpatient clinic.").unwrap();

        let mut args = args(data.clone());
        args.context.push(notes);
        run(args, MetascribeConfig::default(), true).unwrap();

        let session = AnnotationSession::load(session_path(&data)).unwrap();
        assert_eq!(session.dataset.name, "Visits");
        assert_eq!(session.context.len(), 1);
        assert!(session.columns.iter().all(|c| c.status == AnnotationStatus::Suggested));
    }

    #[test]
    fn test_analyze_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = run(args(dir.path().join("nope.csv")), MetascribeConfig::default(), false);
        assert!(result.is_err());
    }
}
