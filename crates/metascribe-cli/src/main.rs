//! Metascribe CLI - LLM-assisted dataset metadata annotation.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use metascribe::MetascribeConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> =
        match MetascribeConfig::discover(cli.config.as_deref()) {
            Ok(config) => {
                init_logging(&cli, &config);
                tracing::debug!(provider = %config.llm.provider, model = %config.llm.model, "configuration loaded");
                run(cli, config)
            }
            Err(e) => Err(e.into()),
        };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: MetascribeConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Analyze {
            file,
            name,
            description,
            context,
            llm,
            model,
            output,
        } => commands::analyze::run(
            commands::analyze::AnalyzeArgs {
                file,
                name,
                description,
                context,
                llm,
                model,
                output,
            },
            config,
            cli.verbose,
        ),

        Commands::Review { file, llm, user } => {
            commands::review::run(file, llm, user, config, cli.verbose)
        }

        Commands::Edit {
            file,
            column,
            description,
            semantic_type,
            reclassify,
            llm,
        } => commands::edit::run(
            file,
            column,
            description,
            semantic_type,
            reclassify,
            llm,
            config,
        ),

        Commands::Confirm {
            file,
            column,
            all,
            user,
        } => commands::confirm::run(file, column, all, user),

        Commands::Status { file, json } => commands::status::run(file, json, cli.verbose),

        Commands::Export {
            file,
            format,
            out_dir,
            include_incomplete,
        } => commands::export::run(file, format, out_dir, include_incomplete, config),
    }
}

/// Logs go to stderr so command output stays clean.
fn init_logging(cli: &Cli, config: &MetascribeConfig) {
    let level = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => level.as_str(),
        (None, true) => "debug",
        (None, false) => config.logging.level.as_str(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
