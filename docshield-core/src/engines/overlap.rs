//! Deterministic cross-rule overlap resolution.
//!
//! Candidates are ranked by severity (desc), span length (desc), rule order
//! (asc), confidence (desc) and finally start offset (asc). Walking that ranking,
//! a candidate is kept only if it intersects nothing already kept. Losers are
//! dropped, never merged.
//!
//! Kept spans are disjoint, so they are indexed by start offset and a
//! candidate only needs checking against its nearest neighbours.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::redaction_match::Match;

fn precedence(a: &Match, b: &Match) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.order.cmp(&b.order))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| a.start.cmp(&b.start))
        .then_with(|| a.method.cmp(&b.method))
}

/// Resolves overlaps and returns the survivors sorted by start offset.
pub fn resolve_overlaps(mut candidates: Vec<Match>) -> Vec<Match> {
    candidates.retain(|m| !m.is_empty());
    candidates.sort_by(precedence);

    let mut kept: BTreeMap<usize, Match> = BTreeMap::new();
    for candidate in candidates {
        if !collides(&kept, &candidate) {
            kept.insert(candidate.start, candidate);
        }
    }
    kept.into_values().collect()
}

/// Whether `candidate` intersects a kept span. Among disjoint spans starting
/// before `candidate.end`, the last one also ends last, so it is the only one
/// that can reach into the candidate.
fn collides(kept: &BTreeMap<usize, Match>, candidate: &Match) -> bool {
    kept.range(..candidate.end)
        .next_back()
        .is_some_and(|(_, k)| k.overlaps(candidate))
}
