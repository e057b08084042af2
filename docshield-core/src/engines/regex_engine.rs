// docshield-core/src/engines/regex_engine.rs
//! A `MatchEngine` implementation that evaluates each active rule's regular
//! expression against the full document text.
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use log::debug;

use crate::config::ScanConfig;
use crate::engine::MatchEngine;
use crate::errors::Result;
use crate::redaction_match::{log_match_debug, Match, MatchMethod};
use crate::sanitizers::compiler::{get_or_compile_rules, CompiledRule, CompiledRules};
use crate::template::ResolvedRuleSet;

#[derive(Debug)]
pub struct RegexEngine {
    compiled_rules: Arc<CompiledRules>,
    rule_set: ResolvedRuleSet,
}

impl RegexEngine {
    /// Compiles the active rules of `rule_set`. Callers gate the set through
    /// `integrity::validate` first.
    pub fn new(rule_set: ResolvedRuleSet, scan: &ScanConfig) -> Result<Self> {
        let compiled_rules = get_or_compile_rules(&rule_set, scan)?;
        Ok(Self { compiled_rules, rule_set })
    }

    pub fn compiled_rules(&self) -> &CompiledRules {
        &self.compiled_rules
    }

    fn matches_for_rule(&self, compiled: &CompiledRule, content: &str, out: &mut Vec<Match>) {
        let rule = &compiled.rule;
        let before = out.len();
        for hit in compiled.regex.find_iter(content) {
            if hit.is_empty() {
                continue;
            }
            if let Some(validator) = rule.validator {
                if !validator.accepts(hit.as_str()) {
                    debug!("Rule '{}': hit at {}..{} failed {:?} validation.", rule.id, hit.start(), hit.end(), validator);
                    continue;
                }
            }
            let m = Match {
                rule_id: Some(rule.id.clone()),
                entity_type: rule.entity_type().to_string(),
                category: Some(rule.category),
                severity: rule.severity,
                start: hit.start(),
                end: hit.end(),
                matched_text: hit.as_str().to_string(),
                confidence: 1.0,
                method: MatchMethod::Rule,
                order: compiled.order,
            };
            log_match_debug(module_path!(), &m);
            out.push(m);
        }
        debug!("Rule '{}' produced {} candidate(s).", rule.id, out.len() - before);
    }
}

impl MatchEngine for RegexEngine {
    fn find_candidates(&self, content: &str) -> Result<Vec<Match>> {
        let mut candidates = Vec::new();
        for compiled in &self.compiled_rules.rules {
            self.matches_for_rule(compiled, content, &mut candidates);
        }
        Ok(candidates)
    }

    fn rule_set(&self) -> &ResolvedRuleSet {
        &self.rule_set
    }
}
