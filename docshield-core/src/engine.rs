// docshield-core/src/engine.rs
//! Defines the core `MatchEngine` trait.
//!
//! An engine only discovers candidate matches. Cross-rule overlap resolution
//! is shared by every engine and by externally supplied (AI) matches, so it
//! lives in the provided [`MatchEngine::scan`] method.
//!
//! License: MIT OR APACHE 2.0

use crate::engines::overlap::resolve_overlaps;
use crate::errors::Result;
use crate::redaction_match::Match;
use crate::template::ResolvedRuleSet;

pub trait MatchEngine: Send + Sync {
    /// Every within-rule non-overlapping match of every active rule, in no particular order.
    fn find_candidates(&self, content: &str) -> Result<Vec<Match>>;

    /// The rule set this engine was built from.
    fn rule_set(&self) -> &ResolvedRuleSet;

    /// Scans `content` and merges `external` matches, returning the
    /// precedence-resolved, non-overlapping set ordered by start offset.
    ///
    /// External matches that name a rule of this template inherit that rule's
    /// position for tie-breaking; the rest rank after every template rule.
    fn scan(&self, content: &str, external: Vec<Match>) -> Result<Vec<Match>> {
        let mut candidates = self.find_candidates(content)?;
        let rule_count = self.rule_set().rules.len();
        candidates.extend(external.into_iter().map(|mut m| {
            m.order = m
                .rule_id
                .as_deref()
                .and_then(|id| self.rule_set().position(id))
                .unwrap_or(rule_count);
            m
        }));
        Ok(resolve_overlaps(candidates))
    }
}
