// docshield/src/main.rs
//! Docshield entry point.
//!
//! Loads `.env`, sets up logging and the theme, then dispatches the subcommand.
//! Any terminal failure is printed as a human-readable message and the process
//! exits with status 1.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use docshield_core::RedactionService;

use docshield::cli::{Cli, Commands};
use docshield::commands::{self, enrich, error_msg, redact, report, review, scan};
use docshield::logger;
use docshield::server;
use docshield::ui::theme::{ThemeMap, ThemeStyle, build_theme_map};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    logger::init_logger(logger::level_from_flags(cli.quiet, cli.debug));

    let theme = match build_theme_map(cli.theme.as_deref()) {
        Ok(theme) => theme,
        Err(e) => {
            let fallback = ThemeStyle::default_theme_map();
            error_msg(format!("{e:#}"), &fallback);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &theme).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error_msg(format!("{e:#}"), &theme);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, theme: &ThemeMap) -> Result<()> {
    let config = commands::load_engine_config(cli.config.as_deref())?;
    let service = || -> Result<RedactionService> {
        let store_path = commands::resolve_store_path(cli.store.clone())?;
        commands::open_service(&store_path, config.clone())
            .with_context(|| format!("Failed to open store {}", store_path.display()))
    };

    match &cli.command {
        Commands::Scan(cmd) => scan::run_scan(cmd, &config, theme, cli.quiet),
        Commands::Enrich(cmd) => enrich::run_enrich(&service()?, cmd, theme).await,
        Commands::Redact(cmd) => redact::run_redact(&service()?, cmd, theme, cli.quiet).await,
        Commands::Report(cmd) => report::run_report(&service()?, cmd, theme).await,
        Commands::Review(cmd) => review::run_review(&service()?, cmd, theme, cli.quiet).await,
        Commands::Serve(cmd) => server::serve(service()?, cmd.bind).await,
    }
}
