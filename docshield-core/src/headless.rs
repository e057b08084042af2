// docshield-core/src/headless.rs

//! `headless.rs`
//! Convenience wrappers for one-shot redaction of a string without any store.
//!
//! Rules are taken as given (for example from a YAML rule file). Missing
//! integrity metadata is filled in memory before the gate runs, because a
//! local rule file has no separate enrichment step.

use std::collections::HashSet;

use log::debug;

use crate::config::{EngineConfig, Rule};
use crate::engine::MatchEngine;
use crate::engines::regex_engine::RegexEngine;
use crate::errors::Result;
use crate::executor::RedactionExecutor;
use crate::integrity::{self, repair_rule};
use crate::redaction_match::Match;
use crate::template::ResolvedRuleSet;

pub const HEADLESS_TEMPLATE_ID: &str = "headless";

/// Redacted text plus the matches that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessOutcome {
    pub redacted: String,
    pub matches: Vec<Match>,
}

/// Scans and masks `content` with `rules` in a single call.
pub fn headless_redact(rules: Vec<Rule>, content: &str, config: &EngineConfig) -> Result<HeadlessOutcome> {
    let mut seen = HashSet::new();
    let rules: Vec<Rule> = rules
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .map(|r| repair_rule(&r).unwrap_or(r))
        .collect();
    let rule_set = ResolvedRuleSet { template_id: HEADLESS_TEMPLATE_ID.to_string(), rules };
    integrity::validate(&rule_set)?;

    let engine = RegexEngine::new(rule_set, &config.scan)?;
    let matches = engine.scan(content, Vec::new())?;
    let artifact = RedactionExecutor::new(config.masking.mask_char()).apply(HEADLESS_TEMPLATE_ID, content, &matches)?;
    debug!("Headless run masked {} span(s).", artifact.masked_spans);

    Ok(HeadlessOutcome { redacted: artifact.content, matches })
}

/// Like [`headless_redact`], returning only the redacted text.
pub fn headless_redact_string(rules: Vec<Rule>, content: &str, config: &EngineConfig) -> Result<String> {
    headless_redact(rules, content, config).map(|outcome| outcome.redacted)
}
