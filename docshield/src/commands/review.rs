// docshield/src/commands/review.rs
//! `docshield review`: confirm or flag one entity and attach feedback.

use anyhow::Result;

use docshield_core::{EntityUpdate, RedactionService};

use crate::cli::ReviewCommand;
use crate::commands::success_msg;
use crate::ui::theme::ThemeMap;

pub async fn run_review(service: &RedactionService, cmd: &ReviewCommand, theme: &ThemeMap, quiet: bool) -> Result<()> {
    let update = EntityUpdate {
        confirmed: cmd.confirmed(),
        feedback: cmd.feedback.clone(),
    };
    let entity = service
        .update_redaction_entity(&cmd.user, &cmd.document, &cmd.entity, update)
        .await?;

    println!("{}", serde_json::to_string_pretty(&entity)?);
    if !quiet {
        let state = if entity.confirmed { "confirmed" } else { "flagged" };
        success_msg(format!("Entity '{}' is {}.", entity.id, state), theme);
    }
    Ok(())
}
