// docshield/src/commands/redact.rs
//! `docshield redact`: run a template against a stored document.

use anyhow::Result;

use docshield_core::RedactionService;

use crate::cli::RedactCommand;
use crate::commands::{info_msg, success_msg};
use crate::ui::theme::ThemeMap;

pub async fn run_redact(service: &RedactionService, cmd: &RedactCommand, theme: &ThemeMap, quiet: bool) -> Result<()> {
    let outcome = service.redact_document(&cmd.user, &cmd.document, &cmd.template).await?;
    // The artifact location is the command's output.
    println!("{}", outcome.redacted_url);
    if !quiet {
        success_msg(
            format!("Document '{}' redacted: {} entity(ies) masked.", cmd.document, outcome.entity_count),
            theme,
        );
        info_msg(
            format!("Review with: docshield report --user {} --document {}", cmd.user, cmd.document),
            theme,
        );
    }
    Ok(())
}
