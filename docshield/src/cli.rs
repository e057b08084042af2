// docshield/src/cli.rs
//! This file defines the command-line interface (CLI) for the docshield application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "docshield",
    author = "Docshield Team",
    version = env!("CARGO_PKG_VERSION"),
    about = "Redact sensitive information from documents",
    long_about = "Docshield redacts sensitive information from documents using user-owned rule templates. Every rule carries a version and checksum that are verified before matching, overlapping matches are resolved deterministically, and each run produces a report that reviewers can confirm or flag.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// Engine configuration (YAML).
    #[arg(long = "config", value_name = "FILE", env = "DOCSHIELD_CONFIG", global = true, help = "Path to an engine configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// JSON store holding rules, templates, documents and reports.
    #[arg(long = "store", value_name = "FILE", env = "DOCSHIELD_STORE", global = true, help = "Path to the JSON store file.")]
    pub store: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `docshield` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Redacts stdin or a file with a local rule file. No store is involved.
    #[command(about = "Redact stdin or a file with the rules in a YAML rule file.")]
    Scan(ScanCommand),

    /// Repairs missing or stale rule metadata.
    #[command(about = "Repair missing or stale version/checksum metadata on rules.")]
    Enrich(EnrichCommand),

    /// Redacts a stored document with one of the user's templates.
    #[command(about = "Redact a stored document with a template.")]
    Redact(RedactCommand),

    /// Shows the redaction report of a document.
    #[command(about = "Show the redaction report of a document.")]
    Report(ReportCommand),

    /// Confirms or flags one redacted entity, optionally with feedback.
    #[command(about = "Confirm or flag a redacted entity and attach feedback.")]
    Review(ReviewCommand),

    /// Serves the HTTP API over the store.
    #[command(about = "Serve the HTTP API.")]
    Serve(ServeCommand),
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Rule file to apply.
    #[arg(long, short = 'r', value_name = "FILE", help = "YAML rule file to apply.")]
    pub rules: PathBuf,

    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input: Option<PathBuf>,

    /// Write redacted output to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Suppress the match summary.
    #[arg(long = "no-summary", help = "Suppress the match summary printed to stderr.")]
    pub no_summary: bool,
}

/// Arguments for the `enrich` command.
#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["template", "all"])))]
pub struct EnrichCommand {
    #[arg(long, short = 'u', value_name = "USER", help = "User on whose behalf the command runs.")]
    pub user: String,

    #[arg(long, short = 't', value_name = "ID", help = "Enrich a single template.")]
    pub template: Option<String>,

    #[arg(long, help = "Enrich every template owned by the user.")]
    pub all: bool,

    #[arg(long, help = "Print the result as JSON.")]
    pub json: bool,
}

/// Arguments for the `redact` command.
#[derive(Args, Debug)]
pub struct RedactCommand {
    #[arg(long, short = 'u', value_name = "USER", help = "User on whose behalf the command runs.")]
    pub user: String,

    #[arg(long = "document", value_name = "ID", help = "Document to redact.")]
    pub document: String,

    #[arg(long, short = 't', value_name = "ID", help = "Template whose rules are applied.")]
    pub template: String,
}

/// Arguments for the `report` command.
#[derive(Args, Debug)]
pub struct ReportCommand {
    #[arg(long, short = 'u', value_name = "USER", help = "User on whose behalf the command runs.")]
    pub user: String,

    #[arg(long = "document", value_name = "ID", help = "Document whose report is shown.")]
    pub document: String,

    #[arg(long, help = "Print the report as JSON.")]
    pub json: bool,
}

/// Arguments for the `review` command.
#[derive(Args, Debug)]
pub struct ReviewCommand {
    #[arg(long, short = 'u', value_name = "USER", help = "User on whose behalf the command runs.")]
    pub user: String,

    #[arg(long = "document", value_name = "ID", help = "Document the entity belongs to.")]
    pub document: String,

    #[arg(long, short = 'e', value_name = "ID", help = "Entity to review.")]
    pub entity: String,

    #[arg(long, conflicts_with = "flag", help = "Confirm the redaction.")]
    pub confirm: bool,

    #[arg(long, help = "Flag the redaction as wrong.")]
    pub flag: bool,

    #[arg(long, value_name = "TEXT", help = "Reviewer feedback. An empty string clears it.")]
    pub feedback: Option<String>,
}

impl ReviewCommand {
    /// The requested confirmed state, if any.
    pub fn confirmed(&self) -> Option<bool> {
        match (self.confirm, self.flag) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeCommand {
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080", help = "Address to listen on.")]
    pub bind: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn enrich_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["docshield", "enrich", "--user", "u1"]).is_err());
        assert!(Cli::try_parse_from(["docshield", "enrich", "--user", "u1", "--all", "--template", "t1"]).is_err());
        assert!(Cli::try_parse_from(["docshield", "enrich", "--user", "u1", "--all"]).is_ok());
    }

    #[test]
    fn review_maps_flags_to_confirmed_state() {
        let cli = Cli::try_parse_from([
            "docshield", "review", "--user", "u1", "--document", "d1", "--entity", "e1", "--flag",
        ])
        .unwrap();
        let Commands::Review(review) = cli.command else { panic!("expected review") };
        assert_eq!(review.confirmed(), Some(false));
        assert!(Cli::try_parse_from([
            "docshield", "review", "--user", "u1", "--document", "d1", "--entity", "e1", "--confirm", "--flag",
        ])
        .is_err());
    }
}
