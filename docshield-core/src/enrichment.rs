//! enrichment.rs - Repairs missing or stale rule integrity metadata.
//!
//! Enrichment is idempotent: a rule whose metadata already checks out is
//! never written. It is also rule-scoped. Each write is a pure function of
//! the rule's own (pattern, version), so concurrent runs over overlapping
//! templates converge without locking. A failed write is recorded and the
//! loop moves on.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::errors::{DocshieldError, Result};
use crate::integrity::repair_rule;
use crate::store::RuleStore;
use crate::template::{Template, TemplateResolver};

/// One rule (or whole template, when `rule_id` is absent) that could not be repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentFailure {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
}

/// Outcome of enriching a single template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEnrichment {
    pub success: bool,
    pub updated_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnrichmentFailure>,
}

/// Outcome of enriching every template of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    pub success: bool,
    pub total_templates: usize,
    pub updated_templates: usize,
    pub updated_rules: usize,
    pub errors: Vec<EnrichmentFailure>,
}

impl TemplateEnrichment {
    pub fn partial_failure(&self) -> Option<DocshieldError> {
        (!self.errors.is_empty()).then(|| DocshieldError::PartialEnrichment(self.errors.clone()))
    }
}

impl EnrichmentSummary {
    pub fn partial_failure(&self) -> Option<DocshieldError> {
        (!self.errors.is_empty()).then(|| DocshieldError::PartialEnrichment(self.errors.clone()))
    }
}

pub struct Enricher {
    store: Arc<dyn RuleStore>,
    resolver: TemplateResolver,
}

impl Enricher {
    pub fn new(store: Arc<dyn RuleStore>, policy: ResolverConfig) -> Self {
        let resolver = TemplateResolver::new(Arc::clone(&store), policy);
        Self { store, resolver }
    }

    /// Repairs every rule of `template` that lacks valid metadata.
    ///
    /// The template is resolved fresh, so rules repaired by an earlier call
    /// (or a concurrent one) are seen as valid and skipped.
    pub async fn enrich_template(&self, template: &Template) -> Result<TemplateEnrichment> {
        let rule_set = self.resolver.resolve(template).await?;
        let mut updated_count = 0;
        let mut errors = Vec::new();

        for rule in &rule_set.rules {
            let Some(repaired) = repair_rule(rule) else {
                continue;
            };
            let write = if template.is_inline() {
                self.store.update_inline_rule(&template.id, &repaired).await
            } else {
                self.store.update_rule(&repaired).await
            };
            match write {
                Ok(()) => {
                    updated_count += 1;
                    info!(
                        "Enriched rule '{}' in template '{}' (version {}).",
                        rule.id,
                        template.id,
                        repaired.version.unwrap_or_default()
                    );
                }
                Err(e) => {
                    warn!("Could not enrich rule '{}' in template '{}': {:#}", rule.id, template.id, e);
                    errors.push(EnrichmentFailure {
                        template_id: template.id.clone(),
                        rule_id: Some(rule.id.clone()),
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(TemplateEnrichment { success: true, updated_count, errors })
    }

    /// Enriches every template owned by `user_id`. A template that cannot be
    /// resolved is reported and skipped.
    pub async fn enrich_all(&self, user_id: &str) -> Result<EnrichmentSummary> {
        let templates = self.store.list_templates(user_id).await?;
        let mut summary = EnrichmentSummary {
            success: true,
            total_templates: templates.len(),
            updated_templates: 0,
            updated_rules: 0,
            errors: Vec::new(),
        };

        for template in &templates {
            match self.enrich_template(template).await {
                Ok(outcome) => {
                    if outcome.updated_count > 0 {
                        summary.updated_templates += 1;
                    }
                    summary.updated_rules += outcome.updated_count;
                    summary.errors.extend(outcome.errors);
                }
                Err(e) => {
                    warn!("Could not enrich template '{}': {}", template.id, e);
                    summary.errors.push(EnrichmentFailure {
                        template_id: template.id.clone(),
                        rule_id: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Enrichment for user '{}': {} of {} templates updated, {} rules, {} errors.",
            user_id,
            summary.updated_templates,
            summary.total_templates,
            summary.updated_rules,
            summary.errors.len()
        );
        Ok(summary)
    }
}
