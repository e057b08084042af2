// docshield/src/commands/enrich.rs
//! `docshield enrich`: repair rule metadata for one template or all of a user's templates.

use std::io;

use anyhow::Result;
use is_terminal::IsTerminal;

use docshield_core::{EnrichmentFailure, RedactionService};

use crate::cli::EnrichCommand;
use crate::commands::{success_msg, warn_msg};
use crate::ui::report_table::failures_table;
use crate::ui::theme::ThemeMap;

pub async fn run_enrich(service: &RedactionService, cmd: &EnrichCommand, theme: &ThemeMap) -> Result<()> {
    let (json, headline, errors) = match &cmd.template {
        Some(template_id) => {
            let outcome = service.enrich_template(&cmd.user, template_id).await?;
            let headline = format!("Template '{}': {} rule(s) updated.", template_id, outcome.updated_count);
            (serde_json::to_string_pretty(&outcome)?, headline, outcome.errors)
        }
        None => {
            let summary = service.enrich_all_templates(&cmd.user).await?;
            let headline = format!(
                "{} of {} template(s) updated, {} rule(s) updated.",
                summary.updated_templates, summary.total_templates, summary.updated_rules
            );
            (serde_json::to_string_pretty(&summary)?, headline, summary.errors)
        }
    };

    if cmd.json {
        println!("{json}");
    } else {
        success_msg(headline, theme);
    }
    report_failures(&errors, theme);
    Ok(())
}

fn report_failures(errors: &[EnrichmentFailure], theme: &ThemeMap) {
    if errors.is_empty() {
        return;
    }
    warn_msg(format!("{} rule(s) could not be enriched:", errors.len()), theme);
    eprintln!("{}", failures_table(errors, theme, io::stderr().is_terminal()));
}
