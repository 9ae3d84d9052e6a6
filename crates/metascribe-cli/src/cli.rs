//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use metascribe::SemanticType;
use metascribe::config::ProviderKind;
use metascribe::export::ExportFormat;

/// Metascribe: LLM-assisted metadata annotation for tabular datasets
#[derive(Parser)]
#[command(name = "metascribe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "metascribe=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (default: ./metascribe.toml if present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Profile and annotate a data file, writing an annotation session
    Analyze {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dataset name (default: file stem)
        #[arg(long)]
        name: Option<String>,

        /// Short description of the dataset
        #[arg(long)]
        description: Option<String>,

        /// Supplementary document to include in prompts (repeatable)
        #[arg(long, value_name = "FILE")]
        context: Vec<PathBuf>,

        /// LLM provider: none, openai, local, or mock (default: from config)
        #[arg(long)]
        llm: Option<ProviderKind>,

        /// Model to use (provider-specific, e.g., "gpt-4o-mini")
        #[arg(long)]
        model: Option<String>,

        /// Output path for the session (default: <file>.annotation.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Review unconfirmed columns interactively
    Review {
        /// Path to data file or annotation file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// LLM provider used for re-classification after edits
        #[arg(long)]
        llm: Option<ProviderKind>,

        /// Reviewer recorded on confirmed columns
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// Change one column's description or type
    Edit {
        /// Path to data file or annotation file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Column to edit
        #[arg(long, short = 'c')]
        column: String,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// New semantic type
        #[arg(long = "type", short = 't')]
        semantic_type: Option<SemanticType>,

        /// Ask the LLM to re-classify using the current description
        #[arg(long, conflicts_with = "semantic_type")]
        reclassify: bool,

        /// LLM provider used with --reclassify
        #[arg(long)]
        llm: Option<ProviderKind>,
    },

    /// Confirm columns so they are final
    Confirm {
        /// Path to data file or annotation file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Column to confirm
        #[arg(long, short = 'c', required_unless_present = "all", conflicts_with = "all")]
        column: Option<String>,

        /// Confirm every remaining column
        #[arg(long)]
        all: bool,

        /// Reviewer recorded on confirmed columns
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// Show annotation progress and summary
    Status {
        /// Path to data file or annotation file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the final metadata files
    Export {
        /// Path to data file or annotation file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format: json, dqv, all, or zip (data plus metadata package)
        #[arg(short, long, default_value = "all")]
        format: ExportFormat,

        /// Output directory (default: next to the annotation file)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Keep unconfirmed or incomplete columns, flagged, instead of dropping them
        #[arg(long)]
        include_incomplete: bool,
    },
}
