// docshield/src/ui/report_table.rs
//! Tables for reports, enrichment results and scan summaries.
//!
//! Tables never show the raw matched text; entities are identified by id,
//! type and location.

use std::collections::BTreeMap;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

use docshield_core::{EnrichmentFailure, Match, RedactionReport};

use crate::ui::output_format::paint;
use crate::ui::theme::{ThemeEntry, ThemeMap};

fn base_table(headers: &[&str], theme: &ThemeMap, color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(paint(h, ThemeEntry::Header, theme, color))));
    table
}

pub fn report_table(report: &RedactionReport, theme: &ThemeMap, color: bool) -> Table {
    let mut table = base_table(
        &["Entity", "Type", "Category", "Location", "Method", "Confidence", "Status", "Feedback"],
        theme,
        color,
    );
    for entity in &report.redacted_entities {
        let status = if entity.confirmed {
            paint("confirmed", ThemeEntry::Success, theme, color)
        } else {
            paint("flagged", ThemeEntry::Flagged, theme, color)
        };
        table.add_row(vec![
            Cell::new(&entity.id),
            Cell::new(paint(&entity.entity_type, ThemeEntry::SummaryRuleName, theme, color)),
            Cell::new(entity.category),
            Cell::new(&entity.location),
            Cell::new(format!("{:?}", entity.redaction_method).to_lowercase()),
            Cell::new(format!("{:.2}", entity.confidence)),
            Cell::new(status),
            Cell::new(entity.feedback.as_deref().unwrap_or("")),
        ]);
    }
    table
}

pub fn failures_table(failures: &[EnrichmentFailure], theme: &ThemeMap, color: bool) -> Table {
    let mut table = base_table(&["Template", "Rule", "Error"], theme, color);
    for failure in failures {
        table.add_row(vec![
            Cell::new(&failure.template_id),
            Cell::new(failure.rule_id.as_deref().unwrap_or("-")),
            Cell::new(paint(&failure.message, ThemeEntry::Error, theme, color)),
        ]);
    }
    table
}

/// One row per entity type with its occurrence count, sorted by type.
pub fn scan_summary_table(matches: &[Match], theme: &ThemeMap, color: bool) -> Table {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for m in matches {
        *counts.entry(m.entity_type.as_str()).or_default() += 1;
    }
    let mut table = base_table(&["Entity type", "Occurrences"], theme, color);
    for (entity_type, count) in counts {
        table.add_row(vec![
            Cell::new(paint(entity_type, ThemeEntry::SummaryRuleName, theme, color)),
            Cell::new(paint(&count.to_string(), ThemeEntry::SummaryOccurrences, theme, color)),
        ]);
    }
    table
}
