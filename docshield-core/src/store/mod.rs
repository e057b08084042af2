// docshield-core/src/store/mod.rs
//! Persistence seams for rules, templates, documents and reports.
//!
//! Storage is an external collaborator, so these traits report failures as
//! plain `anyhow` errors. The service wraps them into `DocshieldError::Store`.
//! `Ok(None)` always means "no such record".
//!
//! License: MIT OR APACHE 2.0

use std::fs::File;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Rule;
use crate::document::{Document, StatusUpdate};
use crate::executor::RedactedArtifact;
use crate::report::{RedactedEntity, RedactionReport};
use crate::template::Template;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::{MemoryStore, StoreSnapshot};

/// Proof that the holder owns the redaction run of one document. Released on drop.
#[derive(Debug, Default)]
pub struct RunLease {
    _lock: Option<File>,
}

impl RunLease {
    /// A lease backed by an exclusive advisory lock on `file`.
    pub fn locked(file: File) -> Self {
        RunLease { _lock: Some(file) }
    }
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_template(&self, template_id: &str) -> Result<Option<Template>>;

    /// All templates owned by `user_id`, in id order.
    async fn list_templates(&self, user_id: &str) -> Result<Vec<Template>>;

    async fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>>;

    /// Replaces a standalone rule record.
    async fn update_rule(&self, rule: &Rule) -> Result<()>;

    /// Replaces the embedded snapshot with `rule.id` inside an inline template.
    async fn update_inline_rule(&self, template_id: &str, rule: &Rule) -> Result<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// Raw bytes behind `document.source_location`.
    async fn read_source(&self, document: &Document) -> Result<Vec<u8>>;

    /// Persists the artifact and returns its location.
    async fn write_artifact(&self, document: &Document, artifact: &RedactedArtifact) -> Result<String>;

    async fn set_status(&self, document_id: &str, update: StatusUpdate) -> Result<()>;

    /// Claims the redaction run of a document. `Ok(None)` means another
    /// holder, possibly in another process, already runs it. Backends that
    /// are private to one process rely on the service's own bookkeeping.
    async fn claim_run(&self, _document_id: &str) -> Result<Option<RunLease>> {
        Ok(Some(RunLease::default()))
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Stores the report for `report.document_id`, replacing any earlier one.
    async fn put_report(&self, report: &RedactionReport) -> Result<()>;

    async fn get_report(&self, document_id: &str) -> Result<Option<RedactionReport>>;

    /// Replaces one entity of a stored report, leaving the others untouched.
    async fn put_entity(&self, document_id: &str, entity: &RedactedEntity) -> Result<()>;

    /// Removes the report of a document. Removing a missing report is not an error.
    async fn delete_report(&self, document_id: &str) -> Result<()>;
}
