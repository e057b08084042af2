// docshield/src/commands/scan.rs
//! `docshield scan`: one-shot redaction of stdin or a file with a local rule file.

use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::info;

use docshield_core::{EngineConfig, RuleFile, headless_redact};

use crate::cli::ScanCommand;
use crate::commands::info_msg;
use crate::ui::report_table::scan_summary_table;
use crate::ui::theme::ThemeMap;

pub fn run_scan(cmd: &ScanCommand, config: &EngineConfig, theme: &ThemeMap, quiet: bool) -> Result<()> {
    let rules = RuleFile::load_from_file(&cmd.rules)?;

    let input = match &cmd.input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read input {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("Failed to read stdin")?;
            buf
        }
    };

    let outcome = headless_redact(rules.rules, &input, config)?;
    info!("Scan found {} match(es).", outcome.matches.len());

    match &cmd.output {
        Some(path) => {
            fs::write(path, &outcome.redacted).with_context(|| format!("Failed to write output {}", path.display()))?;
            if !quiet {
                info_msg(format!("Redacted output written to {}", path.display()), theme);
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(outcome.redacted.as_bytes())?;
            stdout.flush()?;
        }
    }

    if !quiet && !cmd.no_summary {
        if outcome.matches.is_empty() {
            info_msg("No sensitive data found.", theme);
        } else {
            let table = scan_summary_table(&outcome.matches, theme, io::stderr().is_terminal());
            eprintln!("{table}");
        }
    }
    Ok(())
}
