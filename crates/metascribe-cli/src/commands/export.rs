//! Export command - write the final metadata as JSON, DQV Turtle, or a zip package.

use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;
use metascribe::MetascribeConfig;
use metascribe::export::{self, ExportFormat, ExportPaths, IncompletePolicy, MetadataAssembler};

use super::load_session;

pub fn run(
    file: PathBuf,
    format: ExportFormat,
    out_dir: Option<PathBuf>,
    include_incomplete: bool,
    config: MetascribeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (session, path) = load_session(&file)?;

    let mut assembler = MetadataAssembler::with_config(config.export);
    if include_incomplete {
        assembler = assembler.with_policy(IncompletePolicy::Flag);
    }
    let record = assembler.from_session(&session, Utc::now())?;

    let out_dir = out_dir.unwrap_or_else(|| {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let paths = ExportPaths::new(&out_dir, &record.dataset_name);

    let mut written = Vec::new();
    if matches!(format, ExportFormat::Json | ExportFormat::All) {
        export::write_json(&record, &paths.json)?;
        written.push(paths.json.clone());
    }
    if matches!(format, ExportFormat::Dqv | ExportFormat::All) {
        export::write_turtle(&record, &paths.turtle)?;
        written.push(paths.turtle.clone());
    }
    if format == ExportFormat::Package {
        written.push(export::package_from_session(&record, &session, &out_dir)?);
    }

    let skipped = session.columns.len() - record.columns.len();
    println!(
        "{} {} of {} columns",
        "Exported".green().bold(),
        record.columns.len().to_string().white().bold(),
        session.columns.len()
    );
    if skipped > 0 {
        println!(
            "{} {} unconfirmed or incomplete column(s) left out; use {} to keep them",
            "Note:".yellow(),
            skipped,
            "--include-incomplete".cyan()
        );
    }
    for path in written {
        println!("  {}", path.display().to_string().white());
    }

    Ok(())
}
