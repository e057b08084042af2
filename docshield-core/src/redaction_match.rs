// docshield-core/src/redaction_match.rs
//! Match records produced by the scan, plus PII-safe logging helpers.

use log::debug;
use serde::{Deserialize, Serialize};

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

use crate::config::{RuleCategory, Severity};

lazy_static! {
    /// Whether raw matched text may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("DOCSHIELD_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// How a match was produced. Rule matches sort before AI matches on a full tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    #[default]
    Rule,
    Ai,
}

/// A candidate span of sensitive text. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Originating rule. AI matches may omit it.
    pub rule_id: Option<String>,
    pub entity_type: String,
    pub category: Option<RuleCategory>,
    pub severity: Severity,
    /// Byte offsets into the document text, half-open.
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
    pub confidence: f64,
    pub method: MatchMethod,
    /// Position of the originating rule in the resolved template.
    #[serde(default)]
    pub order: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Match) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// An externally detected (AI) match over `content[start..end]`.
    pub fn ai(content: &str, start: usize, end: usize, entity_type: &str, confidence: f64) -> Self {
        Match {
            rule_id: None,
            entity_type: entity_type.to_string(),
            category: None,
            severity: Severity::Medium,
            start,
            end,
            matched_text: content.get(start..end).unwrap_or_default().to_string(),
            confidence,
            method: MatchMethod::Ai,
            order: usize::MAX,
        }
    }
}

/// True when `[start, end)` is a non-empty span of `content` on char boundaries.
pub fn is_valid_span(content: &str, start: usize, end: usize) -> bool {
    start < end
        && end <= content.len()
        && content.is_char_boundary(start)
        && content.is_char_boundary(end)
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.chars().count())
    }
}

fn get_loggable_content(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_match_debug(module_path: &str, m: &Match) {
    debug!(
        "{} Match: rule={:?} type='{}' span={}..{} severity={} text='{}'",
        module_path,
        m.rule_id,
        m.entity_type,
        m.start,
        m.end,
        m.severity,
        get_loggable_content(&m.matched_text)
    );
}

/// Stable digest of a match, safe to write to the audit trail.
pub fn match_hash(rule_id: &str, snippet: &str) -> String {
    let normalized = snippet.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update(b":");
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}
