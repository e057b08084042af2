//! report.rs - Turns resolved matches into reviewable entities.
//!
//! Each match becomes one [`RedactedEntity`]. Its display category comes from
//! a static taxonomy keyed on the tokens of the entity type, with the rule's
//! own category as the fallback.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Utc};
use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{RuleCategory, Severity};
use crate::redaction_match::{Match, MatchMethod};

/// Fixed categories shown to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayCategory {
    Personal,
    Financial,
    Medical,
    Contact,
    Legal,
    Other,
}

impl std::fmt::Display for DisplayCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisplayCategory::Personal => "Personal",
            DisplayCategory::Financial => "Financial",
            DisplayCategory::Medical => "Medical",
            DisplayCategory::Contact => "Contact",
            DisplayCategory::Legal => "Legal",
            DisplayCategory::Other => "Other",
        };
        f.write_str(s)
    }
}

impl From<RuleCategory> for DisplayCategory {
    fn from(category: RuleCategory) -> Self {
        match category {
            RuleCategory::Pii => DisplayCategory::Personal,
            RuleCategory::Financial => DisplayCategory::Financial,
            RuleCategory::Medical => DisplayCategory::Medical,
            RuleCategory::Legal => DisplayCategory::Legal,
            RuleCategory::Custom => DisplayCategory::Other,
        }
    }
}

/// Rows are checked in order; the first row sharing a token with the entity type wins.
static TAXONOMY: Lazy<Vec<(DisplayCategory, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (
            DisplayCategory::Personal,
            &[
                "name", "person", "surname", "date", "dob", "birth", "birthday", "age", "gender", "ssn",
                "sin", "nino", "passport", "identifier", "id", "nationality",
            ][..],
        ),
        (
            DisplayCategory::Financial,
            &[
                "account", "payment", "card", "credit", "debit", "iban", "swift", "bic", "bank", "routing",
                "sort", "tax", "salary", "invoice", "cvv",
            ][..],
        ),
        (
            DisplayCategory::Medical,
            &[
                "condition", "diagnosis", "medication", "drug", "prescription", "mrn", "medical", "patient",
                "treatment", "allergy", "procedure", "health", "icd",
            ][..],
        ),
        (
            DisplayCategory::Contact,
            &[
                "address", "street", "city", "zip", "postcode", "postal", "email", "phone", "mobile", "fax",
                "contact", "url", "ip",
            ][..],
        ),
        (
            DisplayCategory::Legal,
            &["license", "licence", "case", "docket", "court", "contract", "legal", "statute", "bar"][..],
        ),
    ]
});

/// Splits an entity type into lowercase alphanumeric tokens, breaking on
/// punctuation and on lower-to-upper camel-case boundaries.
fn tokens(entity_type: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in entity_type.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Maps an entity type (and its rule category, when known) to a display category.
pub fn categorize(entity_type: &str, rule_category: Option<RuleCategory>) -> DisplayCategory {
    let toks = tokens(entity_type);
    TAXONOMY
        .iter()
        .find(|(_, words)| toks.iter().any(|t| words.contains(&t.as_str())))
        .map(|(category, _)| *category)
        .or_else(|| rule_category.map(DisplayCategory::from))
        .unwrap_or(DisplayCategory::Other)
}

/// Describes where `offset` falls as `"page P, paragraph Q"`.
///
/// Pages are separated by form feeds, paragraphs by blank lines.
pub fn location_of(content: &str, offset: usize) -> String {
    let offset = offset.min(content.len());
    let prefix = content.get(..offset).unwrap_or(content);
    let page = prefix.matches('\x0C').count() + 1;
    let page_start = prefix.rfind('\x0C').map(|i| i + 1).unwrap_or(0);
    let page_prefix = &prefix[page_start..];

    let mut paragraph = 1;
    let mut seen_content = false;
    let mut seen_blank = false;
    let mut lines: Vec<&str> = page_prefix.split('\n').collect();
    // The last segment is the (partial) line holding the offset itself.
    lines.pop();
    for line in lines {
        if line.trim().is_empty() {
            seen_blank = seen_content;
        } else {
            if seen_blank {
                paragraph += 1;
                seen_blank = false;
            }
            seen_content = true;
        }
    }
    if seen_blank {
        paragraph += 1;
    }
    format!("page {}, paragraph {}", page, paragraph)
}

/// A single redacted span presented to reviewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactedEntity {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub category: DisplayCategory,
    pub location: String,
    pub confidence: f64,
    pub redaction_method: MatchMethod,
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub severity: Severity,
    pub start: usize,
    pub end: usize,
}

/// The reviewable outcome of one successful redaction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionReport {
    pub document_id: String,
    pub template_id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub redacted_entities: Vec<RedactedEntity>,
}

impl RedactionReport {
    pub fn entity(&self, entity_id: &str) -> Option<&RedactedEntity> {
        self.redacted_entities.iter().find(|e| e.id == entity_id)
    }

    pub fn entity_mut(&mut self, entity_id: &str) -> Option<&mut RedactedEntity> {
        self.redacted_entities.iter_mut().find(|e| e.id == entity_id)
    }

    pub fn confirmed_count(&self) -> usize {
        self.redacted_entities.iter().filter(|e| e.confirmed).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    /// Builds a report for `matches` found in `content`. Every entity starts confirmed.
    pub fn build(&self, document_id: &str, template_id: &str, content: &str, matches: &[Match]) -> RedactionReport {
        let redacted_entities: Vec<RedactedEntity> = matches
            .iter()
            .map(|m| RedactedEntity {
                id: Uuid::new_v4().to_string(),
                text: m.matched_text.clone(),
                entity_type: m.entity_type.clone(),
                category: categorize(&m.entity_type, m.category),
                location: location_of(content, m.start),
                confidence: m.confidence.clamp(0.0, 1.0),
                redaction_method: m.method,
                confirmed: true,
                feedback: None,
                rule_id: m.rule_id.clone(),
                severity: m.severity,
                start: m.start,
                end: m.end,
            })
            .collect();

        debug!("Built report for document '{}' with {} entities.", document_id, redacted_entities.len());
        RedactionReport {
            document_id: document_id.to_string(),
            template_id: template_id.to_string(),
            run_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            redacted_entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_uses_type_tokens_first() {
        assert_eq!(categorize("patient_name", Some(RuleCategory::Medical)), DisplayCategory::Personal);
        assert_eq!(categorize("email-address", None), DisplayCategory::Contact);
        assert_eq!(categorize("creditCardNumber", None), DisplayCategory::Financial);
        assert_eq!(categorize("diagnosis", None), DisplayCategory::Medical);
        assert_eq!(categorize("Case Number", None), DisplayCategory::Legal);
    }

    #[test]
    fn taxonomy_falls_back_to_rule_category_then_other() {
        assert_eq!(categorize("mystery", Some(RuleCategory::Financial)), DisplayCategory::Financial);
        assert_eq!(categorize("mystery", Some(RuleCategory::Custom)), DisplayCategory::Other);
        assert_eq!(categorize("mystery", None), DisplayCategory::Other);
    }

    #[test]
    fn tokens_split_camel_case_and_punctuation() {
        assert_eq!(tokens("dateOfBirth"), vec!["date", "of", "birth"]);
        assert_eq!(tokens("US SSN"), vec!["us", "ssn"]);
        assert_eq!(tokens("icd10_code"), vec!["icd10", "code"]);
    }

    #[test]
    fn location_counts_pages_and_paragraphs() {
        let text = "intro line\nstill intro\n\nsecond para\n\n\nthird\x0Cnew page\n\nnext";
        assert_eq!(location_of(text, 0), "page 1, paragraph 1");
        assert_eq!(location_of(text, text.find("still").unwrap()), "page 1, paragraph 1");
        assert_eq!(location_of(text, text.find("second").unwrap()), "page 1, paragraph 2");
        assert_eq!(location_of(text, text.find("third").unwrap()), "page 1, paragraph 3");
        assert_eq!(location_of(text, text.find("new page").unwrap()), "page 2, paragraph 1");
        assert_eq!(location_of(text, text.find("next").unwrap()), "page 2, paragraph 2");
    }

    #[test]
    fn builder_confirms_every_entity_and_copies_method() {
        let text = "Call 555-0100 now";
        let mut m = Match::ai(text, 5, 13, "phone_number", 0.7);
        m.rule_id = Some("r-phone".to_string());
        let report = ReportBuilder.build("d1", "t1", text, &[m]);
        assert_eq!(report.redacted_entities.len(), 1);
        let e = &report.redacted_entities[0];
        assert!(e.confirmed);
        assert_eq!(e.redaction_method, MatchMethod::Ai);
        assert_eq!(e.category, DisplayCategory::Contact);
        assert_eq!(e.text, "555-0100");
        assert_eq!(report.entity(&e.id).map(|x| x.start), Some(5));
    }

    #[test]
    fn entity_serializes_with_type_key() {
        let report = ReportBuilder.build("d1", "t1", "abc", &[Match::ai("abc", 0, 3, "name", 0.5)]);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["documentId"], "d1");
        assert_eq!(v["redactedEntities"][0]["type"], "name");
        assert_eq!(v["redactedEntities"][0]["redactionMethod"], "ai");
        assert_eq!(v["redactedEntities"][0]["category"], "Personal");
        assert!(v["redactedEntities"][0].get("feedback").is_none());
    }
}
