// docshield-core/src/store/memory.rs
//! In-memory store used by tests and embedders.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Rule;
use crate::document::{Document, StatusUpdate};
use crate::executor::RedactedArtifact;
use crate::report::{RedactedEntity, RedactionReport};
use crate::store::{DocumentStore, ReportStore, RuleStore};
use crate::template::{RuleSource, Template};

/// Every record the engine reads or writes, keyed by id.
///
/// Shared by [`MemoryStore`] and the JSON file store, which persists it as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub rules: BTreeMap<String, Rule>,
    pub templates: BTreeMap<String, Template>,
    pub documents: BTreeMap<String, Document>,
    pub reports: BTreeMap<String, RedactionReport>,
}

impl StoreSnapshot {
    pub fn templates_of(&self, user_id: &str) -> Vec<Template> {
        self.templates.values().filter(|t| t.user_id == user_id).cloned().collect()
    }

    pub fn replace_rule(&mut self, rule: &Rule) -> Result<()> {
        let slot = self
            .rules
            .get_mut(&rule.id)
            .ok_or_else(|| anyhow!("rule '{}' does not exist", rule.id))?;
        *slot = rule.clone();
        Ok(())
    }

    pub fn replace_inline_rule(&mut self, template_id: &str, rule: &Rule) -> Result<()> {
        let template = self
            .templates
            .get_mut(template_id)
            .ok_or_else(|| anyhow!("template '{}' does not exist", template_id))?;
        let RuleSource::Inline(rules) = &mut template.rule_source else {
            return Err(anyhow!("template '{}' does not embed its rules", template_id));
        };
        // Every embedded copy with this id is replaced; resolution keeps the first.
        let mut replaced = false;
        for slot in rules.iter_mut().filter(|r| r.id == rule.id) {
            *slot = rule.clone();
            replaced = true;
        }
        if replaced {
            Ok(())
        } else {
            Err(anyhow!("template '{}' has no embedded rule '{}'", template_id, rule.id))
        }
    }

    pub fn apply_status(&mut self, document_id: &str, update: &StatusUpdate) -> Result<()> {
        let doc = self
            .documents
            .get_mut(document_id)
            .ok_or_else(|| anyhow!("document '{}' does not exist", document_id))?;
        update.apply_to(doc);
        Ok(())
    }

    pub fn replace_entity(&mut self, document_id: &str, entity: &RedactedEntity) -> Result<()> {
        let report = self
            .reports
            .get_mut(document_id)
            .ok_or_else(|| anyhow!("no report stored for document '{}'", document_id))?;
        let slot = report
            .entity_mut(&entity.id)
            .ok_or_else(|| anyhow!("report for '{}' has no entity '{}'", document_id, entity.id))?;
        *slot = entity.clone();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: StoreSnapshot,
    /// Source and artifact bytes keyed by location.
    blobs: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_rule(&self, rule: Rule) {
        self.state.write().await.snapshot.rules.insert(rule.id.clone(), rule);
    }

    pub async fn insert_template(&self, template: Template) {
        self.state.write().await.snapshot.templates.insert(template.id.clone(), template);
    }

    /// Adds a document whose source bytes live at `document.source_location`.
    pub async fn insert_document(&self, document: Document, source: impl Into<Vec<u8>>) {
        let mut state = self.state.write().await;
        state.blobs.insert(document.source_location.clone(), source.into());
        state.snapshot.documents.insert(document.id.clone(), document);
    }

    /// Removes a document record. Its report and blobs are left behind.
    pub async fn delete_document(&self, document_id: &str) -> Option<Document> {
        self.state.write().await.snapshot.documents.remove(document_id)
    }

    pub async fn blob(&self, location: &str) -> Option<Vec<u8>> {
        self.state.read().await.blobs.get(location).cloned()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot.clone()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn get_template(&self, template_id: &str) -> Result<Option<Template>> {
        Ok(self.state.read().await.snapshot.templates.get(template_id).cloned())
    }

    async fn list_templates(&self, user_id: &str) -> Result<Vec<Template>> {
        Ok(self.state.read().await.snapshot.templates_of(user_id))
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>> {
        Ok(self.state.read().await.snapshot.rules.get(rule_id).cloned())
    }

    async fn update_rule(&self, rule: &Rule) -> Result<()> {
        self.state.write().await.snapshot.replace_rule(rule)
    }

    async fn update_inline_rule(&self, template_id: &str, rule: &Rule) -> Result<()> {
        self.state.write().await.snapshot.replace_inline_rule(template_id, rule)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.state.read().await.snapshot.documents.get(document_id).cloned())
    }

    async fn read_source(&self, document: &Document) -> Result<Vec<u8>> {
        self.state
            .read()
            .await
            .blobs
            .get(&document.source_location)
            .cloned()
            .ok_or_else(|| anyhow!("no source bytes at '{}'", document.source_location))
    }

    async fn write_artifact(&self, document: &Document, artifact: &RedactedArtifact) -> Result<String> {
        let location = format!("memory://artifacts/{}", document.id);
        debug!("Storing artifact for '{}' at {}.", document.id, location);
        self.state
            .write()
            .await
            .blobs
            .insert(location.clone(), artifact.content.as_bytes().to_vec());
        Ok(location)
    }

    async fn set_status(&self, document_id: &str, update: StatusUpdate) -> Result<()> {
        self.state.write().await.snapshot.apply_status(document_id, &update)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn put_report(&self, report: &RedactionReport) -> Result<()> {
        self.state
            .write()
            .await
            .snapshot
            .reports
            .insert(report.document_id.clone(), report.clone());
        Ok(())
    }

    async fn get_report(&self, document_id: &str) -> Result<Option<RedactionReport>> {
        Ok(self.state.read().await.snapshot.reports.get(document_id).cloned())
    }

    async fn put_entity(&self, document_id: &str, entity: &RedactedEntity) -> Result<()> {
        self.state.write().await.snapshot.replace_entity(document_id, entity)
    }

    async fn delete_report(&self, document_id: &str) -> Result<()> {
        self.state.write().await.snapshot.reports.remove(document_id);
        Ok(())
    }
}
