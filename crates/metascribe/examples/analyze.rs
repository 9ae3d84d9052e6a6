//! Example: Annotate a tabular data file and export its metadata.
//!
//! Usage:
//!   cargo run --example analyze -- <file_path> [out_dir]
//!
//! Uses the mock LLM so no API key is needed. Every suggestion is accepted
//! as-is before export.

use std::env;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use metascribe::llm::MockProvider;
use metascribe::{Annotator, MetadataAssembler, export};

fn main() -> metascribe::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --example analyze -- <file_path> [out_dir]");
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    if !path.exists() {
        eprintln!("Error: File not found: {}", path.display());
        std::process::exit(1);
    }
    let out_dir = args.get(2).map(Path::new).unwrap_or_else(|| Path::new("."));

    let separator = "=".repeat(80);
    println!("{}", separator);
    println!("Metascribe Annotation: {}", path.display());
    println!("{}", separator);
    println!();

    let annotator = Annotator::new().with_llm(Arc::new(MockProvider::new()));
    let mut session = annotator.annotate_file(path, None, None)?;

    println!("## Source");
    println!("  File: {}", session.source.file);
    println!("  Format: {}", session.source.format);
    println!("  Rows: {}", session.source.row_count);
    println!("  Columns: {}", session.source.column_count);
    println!();

    println!("## Columns");
    println!();
    for col in &session.columns {
        println!(
            "  {:20} {:12} heuristic={:<12} {}",
            col.name,
            col.proposed_type().as_str(),
            col.heuristic.semantic_type.as_str(),
            col.statistics.summary()
        );
        if let Some(description) = &col.description {
            println!("  {:20} {}", "", description);
        }
    }
    println!();

    let accepted = session.confirm_all(Some("example"))?;
    let record = MetadataAssembler::new().from_session(&session, Utc::now())?;
    let paths = export::write_all(&record, out_dir)?;

    println!("## Export");
    println!("  Confirmed: {} columns", accepted);
    println!("  JSON: {}", paths.json.display());
    println!("  DQV: {}", paths.turtle.display());
    println!();
    println!("{}", separator);

    Ok(())
}
