//! errors.rs - Custom error types for the docshield-core library.
//!
//! Every failure the engine can surface is a variant of [`DocshieldError`].
//! Callers branch on [`DocshieldError::kind`], a stable discriminant, never on
//! the rendered message.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrichment::EnrichmentFailure;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Template,
    Rule,
    Document,
    Report,
    Entity,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Template => "template",
            RecordKind::Rule => "rule",
            RecordKind::Document => "document",
            RecordKind::Report => "report",
            RecordKind::Entity => "entity",
        };
        f.write_str(s)
    }
}

/// This enum represents all possible error types in the `docshield-core` library.
///
/// `#[non_exhaustive]` keeps room for new variants without breaking consumers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocshieldError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },

    #[error(
        "Rule '{rule_name}' ({rule_id}) in template '{template_id}' is missing required version or checksum metadata. Enrich the template and retry."
    )]
    MissingMetadata {
        template_id: String,
        rule_id: String,
        rule_name: String,
    },

    #[error(
        "Rule '{rule_name}' ({rule_id}) in template '{template_id}' has a checksum that does not match its pattern and version. Enrich the template and retry."
    )]
    ChecksumMismatch {
        template_id: String,
        rule_id: String,
        rule_name: String,
    },

    #[error("Enrichment could not update {} rule(s): {}", .0.len(), summarize_failures(.0))]
    PartialEnrichment(Vec<EnrichmentFailure>),

    #[error("Document '{document_id}' could not be processed: {reason}")]
    Processing { document_id: String, reason: String },

    #[error("Document '{0}' was deleted while its redaction was running; no report was written")]
    DocumentGone(String),

    #[error("User '{caller}' is not allowed to access {kind} '{id}'")]
    Permission {
        caller: String,
        kind: RecordKind,
        id: String,
    },

    #[error("A redaction is already running for document '{0}'")]
    RedactionInProgress(String),

    #[error("Failed to compile redaction rule '{0}': {1}")]
    RuleCompilation(String, regex::Error),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

fn summarize_failures(failures: &[EnrichmentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}/{}: {}", f.template_id, f.rule_id.as_deref().unwrap_or("*"), f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DocshieldError {
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        DocshieldError::NotFound { kind, id: id.into() }
    }

    pub fn processing(document_id: impl Into<String>, reason: impl Into<String>) -> Self {
        DocshieldError::Processing {
            document_id: document_id.into(),
            reason: reason.into(),
        }
    }

    /// Stable, machine-readable discriminant for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            DocshieldError::NotFound { .. } => "not_found",
            DocshieldError::MissingMetadata { .. } => "missing_metadata",
            DocshieldError::ChecksumMismatch { .. } => "checksum_mismatch",
            DocshieldError::PartialEnrichment(_) => "partial_enrichment",
            DocshieldError::Processing { .. } => "processing",
            DocshieldError::DocumentGone(_) => "document_gone",
            DocshieldError::Permission { .. } => "permission",
            DocshieldError::RedactionInProgress(_) => "redaction_in_progress",
            DocshieldError::RuleCompilation(..) => "rule_compilation",
            DocshieldError::PatternLengthExceeded(..) => "pattern_length_exceeded",
            DocshieldError::Config(_) => "config",
            DocshieldError::InvalidInput(_) => "invalid_input",
            DocshieldError::Io(_) => "io",
            DocshieldError::Store(_) => "store",
        }
    }

    /// True when running enrichment on the template and retrying can clear the error.
    pub fn is_recoverable_by_enrichment(&self) -> bool {
        matches!(
            self,
            DocshieldError::MissingMetadata { .. } | DocshieldError::ChecksumMismatch { .. }
        )
    }

    /// The offending (template id, rule id) pair for integrity failures.
    pub fn offending_rule(&self) -> Option<(&str, &str)> {
        match self {
            DocshieldError::MissingMetadata { template_id, rule_id, .. }
            | DocshieldError::ChecksumMismatch { template_id, rule_id, .. } => {
                Some((template_id.as_str(), rule_id.as_str()))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocshieldError>;
