//! Templates and the `TemplateResolver`.
//!
//! A template stores its rules either inline (embedded snapshots) or as an
//! ordered list of rule ids. Stored records use whichever raw shape they were
//! written with; [`Template`] normalizes that once, at deserialization, into
//! the tagged [`RuleSource`]. The resolver then turns either variant into one
//! canonical, deduplicated [`ResolvedRuleSet`].
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ResolverConfig, Rule};
use crate::errors::{DocshieldError, RecordKind, Result};
use crate::store::RuleStore;

/// Where a template's rules live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// Ordered embedded rule snapshots.
    Inline(Vec<Rule>),
    /// Ordered rule ids resolved against the rule store at read time.
    Referenced(Vec<String>),
}

impl RuleSource {
    /// Picks the authoritative shape from a raw record that may carry both.
    ///
    /// Non-empty inline rules win; otherwise the id list is used.
    pub fn from_raw(inline: Option<Vec<Rule>>, rule_ids: Option<Vec<String>>) -> Self {
        match (inline, rule_ids) {
            (Some(rules), _) if !rules.is_empty() => RuleSource::Inline(rules),
            (_, Some(ids)) => RuleSource::Referenced(ids),
            _ => RuleSource::Inline(Vec::new()),
        }
    }
}

/// A named, user-owned grouping of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TemplateRecord", into = "TemplateRecord")]
pub struct Template {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub rule_source: RuleSource,
}

/// The raw persisted shape of a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TemplateRecord {
    id: String,
    user_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<Rule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_ids: Option<Vec<String>>,
}

impl From<TemplateRecord> for Template {
    fn from(raw: TemplateRecord) -> Self {
        Template {
            id: raw.id,
            user_id: raw.user_id,
            name: raw.name,
            description: raw.description,
            rule_source: RuleSource::from_raw(raw.rules, raw.rule_ids),
        }
    }
}

impl From<Template> for TemplateRecord {
    fn from(t: Template) -> Self {
        let (rules, rule_ids) = match t.rule_source {
            RuleSource::Inline(rules) => (Some(rules), None),
            RuleSource::Referenced(ids) => (None, Some(ids)),
        };
        TemplateRecord {
            id: t.id,
            user_id: t.user_id,
            name: t.name,
            description: t.description,
            rules,
            rule_ids,
        }
    }
}

impl Template {
    pub fn inline(id: &str, user_id: &str, name: &str, rules: Vec<Rule>) -> Self {
        Template {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: None,
            rule_source: RuleSource::Inline(rules),
        }
    }

    pub fn referenced(id: &str, user_id: &str, name: &str, rule_ids: &[&str]) -> Self {
        Template {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: None,
            rule_source: RuleSource::Referenced(rule_ids.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.rule_source, RuleSource::Inline(_))
    }
}

/// A template's effective rule set: ordered, deduplicated by id (first occurrence wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuleSet {
    pub template_id: String,
    pub rules: Vec<Rule>,
}

impl ResolvedRuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Position of a rule in resolution order.
    pub fn position(&self, rule_id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.id == rule_id)
    }

    pub fn active_rules(&self) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules.iter().enumerate().filter(|(_, r)| r.is_active)
    }
}

/// Normalizes templates into ordered rule lists, with bounded retries on store reads.
pub struct TemplateResolver {
    store: Arc<dyn RuleStore>,
    policy: ResolverConfig,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn RuleStore>, policy: ResolverConfig) -> Self {
        Self { store, policy }
    }

    /// Fetches a template by id.
    pub async fn fetch_template(&self, template_id: &str) -> Result<Template> {
        let store = Arc::clone(&self.store);
        let id = template_id.to_string();
        self.with_retry("get_template", || {
            let store = Arc::clone(&store);
            let id = id.clone();
            async move { store.get_template(&id).await }
        })
        .await?
        .ok_or_else(|| DocshieldError::not_found(RecordKind::Template, template_id))
    }

    /// Fetches and resolves a template by id.
    pub async fn resolve_id(&self, template_id: &str) -> Result<(Template, ResolvedRuleSet)> {
        let template = self.fetch_template(template_id).await?;
        let resolved = self.resolve(&template).await?;
        Ok((template, resolved))
    }

    /// Produces the canonical rule list for a template, whatever its storage shape.
    ///
    /// Referenced ids that no longer exist are dropped with a warning. An empty
    /// result means "template has no rules", not an error.
    pub async fn resolve(&self, template: &Template) -> Result<ResolvedRuleSet> {
        let candidates = match &template.rule_source {
            RuleSource::Inline(rules) => rules.clone(),
            RuleSource::Referenced(ids) => {
                let mut fetched = Vec::with_capacity(ids.len());
                for rule_id in ids {
                    let store = Arc::clone(&self.store);
                    let id = rule_id.clone();
                    let rule = self
                        .with_retry("get_rule", || {
                            let store = Arc::clone(&store);
                            let id = id.clone();
                            async move { store.get_rule(&id).await }
                        })
                        .await?;
                    match rule {
                        Some(rule) => fetched.push(rule),
                        None => warn!(
                            "Template '{}': referenced rule '{}' no longer exists; skipping it.",
                            template.id, rule_id
                        ),
                    }
                }
                fetched
            }
        };

        let mut seen = HashSet::new();
        let rules: Vec<Rule> = candidates
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();

        debug!(
            "Template '{}' resolved to {} rule(s) ({}).",
            template.id,
            rules.len(),
            if template.is_inline() { "inline" } else { "referenced" }
        );
        Ok(ResolvedRuleSet { template_id: template.id.clone(), rules })
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Rule store {} failed (attempt {}/{}): {:#}",
                        operation, attempt, attempts, e
                    );
                    let delay = self.policy.backoff_ms.saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(DocshieldError::Store(e.context(format!(
                        "rule store {} failed after {} attempt(s)",
                        operation, attempts
                    ))))
                }
            }
        }
    }
}
