//! Status command - show annotation progress and summary.

use std::path::PathBuf;

use colored::Colorize;

use super::load_session;

pub fn run(file: PathBuf, json_output: bool, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (session, path) = load_session(&file)?;
    let counts = session.counts();

    if json_output {
        let columns: Vec<_> = session
            .columns
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "type": c.semantic_type,
                    "heuristic_type": c.heuristic.semantic_type,
                    "status": c.status,
                    "confidence_score": c.confidence_score(),
                    "has_description": c.description.is_some(),
                    "ai_unavailable": c.ai_unavailable(),
                })
            })
            .collect();
        let status = serde_json::json!({
            "dataset": session.dataset.name,
            "source": session.source.file,
            "progress": session.progress(),
            "counts": counts,
            "is_complete": session.is_complete(),
            "updated_at": session.updated_at,
            "columns": columns,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Annotation status for".cyan().bold(),
        session.dataset.name.white()
    );
    println!();

    let progress = session.progress();
    let bar_width = 30;
    let filled = (progress * bar_width as f64).round() as usize;
    let bar: String = "█".repeat(filled) + &"░".repeat(bar_width - filled);
    println!(
        "Progress: {} {}/{} ({:.0}%)",
        bar.cyan(),
        counts.confirmed.to_string().white().bold(),
        counts.total(),
        progress * 100.0
    );
    println!();

    println!("{}", "Columns:".yellow().bold());
    println!("  Pending:   {}", counts.pending.to_string().white());
    println!("  Suggested: {}", counts.suggested.to_string().blue());
    println!("  Edited:    {}", counts.edited.to_string().magenta());
    println!("  Confirmed: {}", counts.confirmed.to_string().green());
    println!();

    if verbose {
        for col in &session.columns {
            println!(
                "  {:24} {:12} {}",
                col.name,
                col.proposed_type().as_str(),
                col.status.label().dimmed()
            );
        }
        println!();
    }

    if session.is_complete() {
        println!(
            "All columns confirmed. Run {} to write the metadata.",
            format!("metascribe export {}", path.display()).cyan().bold()
        );
    } else {
        println!(
            "Run {} to continue reviewing.",
            format!("metascribe review {}", path.display()).cyan().bold()
        );
    }

    Ok(())
}
