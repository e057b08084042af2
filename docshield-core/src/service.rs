//! service.rs - The redaction service: every externally visible operation.
//!
//! `RedactionService` wires the resolver, the integrity gate, enrichment, the
//! match engine, the executor and the report path together over the store
//! traits. It enforces ownership, runs at most one redaction per document at
//! a time and records each outcome in the audit log when one is configured.
//!
//! A redaction run is spawned onto the runtime. The caller only awaits its
//! result, so a caller that stops waiting does not stop the run.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::audit_log::{AuditEvent, AuditLog};
use crate::config::EngineConfig;
use crate::document::{decode_source, Document, StatusUpdate};
use crate::engine::MatchEngine;
use crate::engines::regex_engine::RegexEngine;
use crate::enrichment::{Enricher, EnrichmentSummary, TemplateEnrichment};
use crate::errors::{DocshieldError, RecordKind, Result};
use crate::executor::{sha256_hex, RedactionExecutor};
use crate::integrity;
use crate::redaction_match::{is_valid_span, match_hash, Match};
use crate::report::{RedactedEntity, RedactionReport, ReportBuilder};
use crate::review::{EntityUpdate, ReviewFeedbackEngine};
use crate::store::{DocumentStore, ReportStore, RuleStore, RunLease};
use crate::template::{ResolvedRuleSet, Template, TemplateResolver};

/// Result of a successful redaction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionOutcome {
    pub success: bool,
    pub redacted_url: String,
    pub entity_count: usize,
    pub run_id: String,
}

/// Marks a document as having a run in flight until dropped.
struct InFlight {
    shared: Arc<Shared>,
    document_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.document_id);
    }
}

/// Everything a spawned run needs to outlive the request that started it.
struct Shared {
    documents: Arc<dyn DocumentStore>,
    reports: Arc<dyn ReportStore>,
    resolver: TemplateResolver,
    enricher: Enricher,
    executor: RedactionExecutor,
    review: ReviewFeedbackEngine,
    config: EngineConfig,
    audit: Option<AuditLog>,
    running: Mutex<HashSet<String>>,
}

#[derive(Clone)]
pub struct RedactionService {
    shared: Arc<Shared>,
}

impl RedactionService {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        documents: Arc<dyn DocumentStore>,
        reports: Arc<dyn ReportStore>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let audit = config.audit.path.clone().map(AuditLog::open).transpose()?;
        let shared = Shared {
            resolver: TemplateResolver::new(Arc::clone(&rules), config.resolver.clone()),
            enricher: Enricher::new(Arc::clone(&rules), config.resolver.clone()),
            executor: RedactionExecutor::new(config.masking.mask_char()),
            review: ReviewFeedbackEngine,
            documents,
            reports,
            config,
            audit,
            running: Mutex::new(HashSet::new()),
        };
        Ok(Self { shared: Arc::new(shared) })
    }

    /// Builds a service over one backend that implements every store trait.
    pub fn from_store<S>(store: Arc<S>, config: EngineConfig) -> Result<Self>
    where
        S: RuleStore + DocumentStore + ReportStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Resolves a caller-owned template into its canonical rule list.
    pub async fn resolve_template(&self, caller: &str, template_id: &str) -> Result<ResolvedRuleSet> {
        let template = self.shared.owned_template(caller, template_id).await?;
        self.shared.resolver.resolve(&template).await
    }

    /// The integrity gate. Fails on the first rule lacking valid metadata.
    pub fn validate_rule_set(&self, rule_set: &ResolvedRuleSet) -> Result<()> {
        integrity::validate(rule_set)
    }

    pub async fn enrich_template(&self, caller: &str, template_id: &str) -> Result<TemplateEnrichment> {
        let template = self.shared.owned_template(caller, template_id).await?;
        let outcome = self.shared.enricher.enrich_template(&template).await?;
        self.shared.audit(AuditEvent::RulesEnriched {
            user_id: caller.to_string(),
            template_id: Some(template.id.clone()),
            updated_rules: outcome.updated_count,
            errors: outcome.errors.len(),
        });
        Ok(outcome)
    }

    pub async fn enrich_all_templates(&self, user_id: &str) -> Result<EnrichmentSummary> {
        let summary = self.shared.enricher.enrich_all(user_id).await?;
        self.shared.audit(AuditEvent::RulesEnriched {
            user_id: user_id.to_string(),
            template_id: None,
            updated_rules: summary.updated_rules,
            errors: summary.errors.len(),
        });
        Ok(summary)
    }

    pub async fn redact_document(&self, caller: &str, document_id: &str, template_id: &str) -> Result<RedactionOutcome> {
        self.redact_document_with(caller, document_id, template_id, Vec::new()).await
    }

    /// Redacts a document, merging externally detected (AI) matches into the
    /// same overlap pass as the rule matches.
    ///
    /// The run itself executes on a spawned task. Dropping the returned future
    /// abandons the wait; the run still finishes and persists its outcome.
    pub async fn redact_document_with(
        &self,
        caller: &str,
        document_id: &str,
        template_id: &str,
        ai_matches: Vec<Match>,
    ) -> Result<RedactionOutcome> {
        let in_flight = self.begin_run(document_id)?;
        let shared = Arc::clone(&self.shared);
        let caller = caller.to_string();
        let document_id = document_id.to_string();
        let template_id = template_id.to_string();

        let handle = tokio::spawn({
            let document_id = document_id.clone();
            async move {
                let _in_flight = in_flight;
                shared.run_redaction(&caller, &document_id, &template_id, ai_matches).await
            }
        });
        handle.await.map_err(|e| {
            DocshieldError::Store(anyhow!("redaction task for document '{}' did not complete: {}", document_id, e))
        })?
    }

    /// The caller's report for a document, or `None` when it was never redacted.
    pub async fn get_redaction_report(&self, caller: &str, document_id: &str) -> Result<Option<RedactionReport>> {
        self.shared.owned_document(caller, document_id).await?;
        Ok(self.shared.reports.get_report(document_id).await?)
    }

    /// Applies a reviewer decision to one entity and persists only that entity.
    pub async fn update_redaction_entity(
        &self,
        caller: &str,
        document_id: &str,
        entity_id: &str,
        update: EntityUpdate,
    ) -> Result<RedactedEntity> {
        if update.is_empty() {
            return Err(DocshieldError::InvalidInput(
                "an entity update needs `confirmed`, `feedback` or both".to_string(),
            ));
        }
        let shared = &self.shared;
        shared.owned_document(caller, document_id).await?;
        let mut report = shared
            .reports
            .get_report(document_id)
            .await?
            .ok_or_else(|| DocshieldError::not_found(RecordKind::Report, document_id))?;

        let event = shared.review.apply(&mut report, entity_id, &update)?;
        let entity = report
            .entity(entity_id)
            .cloned()
            .ok_or_else(|| DocshieldError::not_found(RecordKind::Entity, entity_id))?;
        shared.reports.put_entity(document_id, &entity).await?;
        shared.audit(AuditEvent::EntityReviewed(event));
        Ok(entity)
    }

    fn begin_run(&self, document_id: &str) -> Result<InFlight> {
        let mut running = self.shared.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(document_id.to_string()) {
            return Err(DocshieldError::RedactionInProgress(document_id.to_string()));
        }
        Ok(InFlight { shared: Arc::clone(&self.shared), document_id: document_id.to_string() })
    }
}

impl Shared {
    async fn run_redaction(
        &self,
        caller: &str,
        document_id: &str,
        template_id: &str,
        ai_matches: Vec<Match>,
    ) -> Result<RedactionOutcome> {
        let result = match self.claim_run(document_id).await {
            Ok(_lease) => self.redact_guarded(caller, document_id, template_id, ai_matches).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!("Redaction of document '{}' failed: {}", document_id, err);
            self.audit(AuditEvent::RedactionFailed {
                document_id: document_id.to_string(),
                template_id: template_id.to_string(),
                kind: err.kind().to_string(),
                message: err.to_string(),
            });
        }
        result
    }

    /// Claims the run at the store, which may be shared with other processes.
    async fn claim_run(&self, document_id: &str) -> Result<RunLease> {
        self.documents
            .claim_run(document_id)
            .await?
            .ok_or_else(|| DocshieldError::RedactionInProgress(document_id.to_string()))
    }

    async fn redact_guarded(
        &self,
        caller: &str,
        document_id: &str,
        template_id: &str,
        ai_matches: Vec<Match>,
    ) -> Result<RedactionOutcome> {
        // Nothing below touches the document status until the rules are known good.
        let document = self.owned_document(caller, document_id).await?;
        let template = self.owned_template(caller, template_id).await?;
        let rule_set = self.resolver.resolve(&template).await?;
        integrity::validate(&rule_set)?;
        let engine = RegexEngine::new(rule_set, &self.config.scan)?;

        info!(
            "Redacting document '{}' with template '{}' ({} rules).",
            document.id,
            template.id,
            engine.rule_set().rules.len()
        );
        self.documents.set_status(&document.id, StatusUpdate::processing()).await?;

        match self.execute(&document, &template, &engine, ai_matches).await {
            Ok(outcome) => Ok(outcome),
            Err(DocshieldError::DocumentGone(id)) => Err(DocshieldError::DocumentGone(id)),
            Err(err) => {
                if let Err(e) = self.documents.set_status(&document.id, StatusUpdate::failed(err.to_string())).await {
                    warn!("Could not mark document '{}' as failed: {:#}", document.id, e);
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        document: &Document,
        template: &Template,
        engine: &RegexEngine,
        ai_matches: Vec<Match>,
    ) -> Result<RedactionOutcome> {
        let bytes = self
            .documents
            .read_source(document)
            .await
            .map_err(|e| DocshieldError::processing(&document.id, format!("source could not be read: {:#}", e)))?;
        let input_sha256 = sha256_hex(&bytes);
        let content = decode_source(&document.id, bytes)?;
        let external = prepare_external(&document.id, &content, engine.rule_set(), ai_matches)?;

        let matches = engine.scan(&content, external)?;

        // Checkpoint: the document may have been deleted while we were scanning.
        self.ensure_present(&document.id).await?;

        let artifact = self.executor.apply(&document.id, &content, &matches)?;
        let location = self.documents.write_artifact(document, &artifact).await?;
        let report = ReportBuilder.build(&document.id, &template.id, &content, &matches);
        self.ensure_present(&document.id).await?;
        self.reports.put_report(&report).await?;
        if let Err(e) = self
            .documents
            .set_status(&document.id, StatusUpdate::redacted(location.clone()))
            .await
        {
            return Err(self.withdraw_report(&document.id, e).await);
        }

        info!(
            "Document '{}' redacted: {} entities, artifact at {}.",
            document.id,
            report.redacted_entities.len(),
            location
        );
        self.audit(AuditEvent::RedactionCompleted {
            run_id: report.run_id.clone(),
            document_id: document.id.clone(),
            template_id: template.id.clone(),
            input_sha256,
            artifact_sha256: artifact.sha256.clone(),
            match_hashes: matches
                .iter()
                .map(|m| match_hash(m.rule_id.as_deref().unwrap_or(&m.entity_type), &m.matched_text))
                .collect(),
        });

        Ok(RedactionOutcome {
            success: true,
            redacted_url: location,
            entity_count: report.redacted_entities.len(),
            run_id: report.run_id,
        })
    }

    async fn ensure_present(&self, document_id: &str) -> Result<()> {
        if self.documents.get_document(document_id).await?.is_none() {
            return Err(DocshieldError::DocumentGone(document_id.to_string()));
        }
        Ok(())
    }

    /// The final status write failed. A report must not outlive its document,
    /// so when the document is gone the report just written is removed.
    async fn withdraw_report(&self, document_id: &str, cause: anyhow::Error) -> DocshieldError {
        match self.documents.get_document(document_id).await {
            Ok(None) => {
                if let Err(e) = self.reports.delete_report(document_id).await {
                    warn!("Could not remove report of deleted document '{}': {:#}", document_id, e);
                }
                DocshieldError::DocumentGone(document_id.to_string())
            }
            _ => DocshieldError::Store(cause),
        }
    }

    async fn owned_document(&self, caller: &str, document_id: &str) -> Result<Document> {
        let document = self
            .documents
            .get_document(document_id)
            .await?
            .ok_or_else(|| DocshieldError::not_found(RecordKind::Document, document_id))?;
        if document.user_id != caller {
            return Err(DocshieldError::Permission {
                caller: caller.to_string(),
                kind: RecordKind::Document,
                id: document_id.to_string(),
            });
        }
        Ok(document)
    }

    async fn owned_template(&self, caller: &str, template_id: &str) -> Result<Template> {
        let template = self.resolver.fetch_template(template_id).await?;
        if template.user_id != caller {
            return Err(DocshieldError::Permission {
                caller: caller.to_string(),
                kind: RecordKind::Template,
                id: template_id.to_string(),
            });
        }
        Ok(template)
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.append(event) {
                warn!("Failed to append audit event to {}: {:#}", log.path().display(), e);
            }
        }
    }
}

/// Checks external match spans against the text and fills in what the
/// template knows about their rule.
fn prepare_external(
    document_id: &str,
    content: &str,
    rule_set: &ResolvedRuleSet,
    matches: Vec<Match>,
) -> Result<Vec<Match>> {
    matches
        .into_iter()
        .map(|mut m| {
            if !is_valid_span(content, m.start, m.end) {
                return Err(DocshieldError::processing(
                    document_id,
                    format!(
                        "external '{}' match span {}..{} does not fit the document ({} bytes)",
                        m.entity_type,
                        m.start,
                        m.end,
                        content.len()
                    ),
                ));
            }
            if !(0.0..=1.0).contains(&m.confidence) {
                return Err(DocshieldError::processing(
                    document_id,
                    format!(
                        "external '{}' match at {}..{} has confidence {}, expected a value in [0, 1]",
                        m.entity_type, m.start, m.end, m.confidence
                    ),
                ));
            }
            m.matched_text = content[m.start..m.end].to_string();
            if m.category.is_none() {
                m.category = m
                    .rule_id
                    .as_deref()
                    .and_then(|id| rule_set.rules.iter().find(|r| r.id == id))
                    .map(|r| r.category);
            }
            Ok(m)
        })
        .collect()
}
