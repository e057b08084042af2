//! executor.rs - Applies confirmed matches to document text.
//!
//! Masking preserves layout: every non-whitespace character inside a
//! confirmed span is replaced by the mask character, whitespace is kept, and
//! the character count never changes. The source text is borrowed, never
//! mutated.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{DocshieldError, Result};
use crate::redaction_match::{is_valid_span, Match};

/// The redacted output of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedArtifact {
    pub document_id: String,
    pub content: String,
    /// Hex SHA-256 of `content`.
    pub sha256: String,
    /// Number of disjoint spans masked after unioning overlaps.
    pub masked_spans: usize,
    pub masked_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactionExecutor {
    mask_char: char,
}

impl Default for RedactionExecutor {
    fn default() -> Self {
        Self { mask_char: '█' }
    }
}

impl RedactionExecutor {
    pub fn new(mask_char: char) -> Self {
        Self { mask_char }
    }

    pub fn mask_char(&self) -> char {
        self.mask_char
    }

    /// Masks every confirmed span of `content`.
    ///
    /// Output depends only on `content` and the set of spans, not on the
    /// order of `confirmed`.
    pub fn apply(&self, document_id: &str, content: &str, confirmed: &[Match]) -> Result<RedactedArtifact> {
        let mut spans = Vec::with_capacity(confirmed.len());
        for m in confirmed {
            if !is_valid_span(content, m.start, m.end) {
                return Err(DocshieldError::processing(
                    document_id,
                    format!(
                        "match span {}..{} is outside the document or splits a character (document is {} bytes)",
                        m.start,
                        m.end,
                        content.len()
                    ),
                ));
            }
            spans.push((m.start, m.end));
        }
        let spans = merge_spans(spans);

        let mut out = String::with_capacity(content.len());
        let mut masked_chars = 0;
        let mut cursor = 0;
        for &(start, end) in &spans {
            out.push_str(&content[cursor..start]);
            for c in content[start..end].chars() {
                if c.is_whitespace() {
                    out.push(c);
                } else {
                    out.push(self.mask_char);
                    masked_chars += 1;
                }
            }
            cursor = end;
        }
        out.push_str(&content[cursor..]);

        debug!(
            "Document '{}': masked {} chars across {} span(s).",
            document_id,
            masked_chars,
            spans.len()
        );
        Ok(RedactedArtifact {
            document_id: document_id.to_string(),
            sha256: sha256_hex(out.as_bytes()),
            content: out,
            masked_spans: spans.len(),
            masked_chars,
        })
    }
}

/// Sorts spans and unions any that overlap or touch.
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
