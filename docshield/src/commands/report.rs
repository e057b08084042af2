// docshield/src/commands/report.rs
//! `docshield report`: print a document's redaction report.

use std::io::{self, Write};

use anyhow::Result;
use is_terminal::IsTerminal;

use docshield_core::RedactionService;

use crate::cli::ReportCommand;
use crate::commands::info_msg;
use crate::ui::report_table::report_table;
use crate::ui::theme::ThemeMap;

pub async fn run_report(service: &RedactionService, cmd: &ReportCommand, theme: &ThemeMap) -> Result<()> {
    let report = service.get_redaction_report(&cmd.user, &cmd.document).await?;

    if cmd.json {
        // `null` when the document has not been redacted yet.
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(report) = report else {
        info_msg(format!("Document '{}' has no redaction report yet.", cmd.document), theme);
        return Ok(());
    };

    let mut stdout = io::stdout().lock();
    writeln!(
        stdout,
        "Report for document '{}' (template '{}', run {}, {})",
        report.document_id,
        report.template_id,
        report.run_id,
        report.timestamp.to_rfc3339()
    )?;
    writeln!(
        stdout,
        "{} entity(ies), {} confirmed",
        report.redacted_entities.len(),
        report.confirmed_count()
    )?;
    writeln!(stdout, "{}", report_table(&report, theme, io::stdout().is_terminal()))?;
    Ok(())
}
