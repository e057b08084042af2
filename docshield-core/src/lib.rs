// docshield-core/src/lib.rs
//! # DocShield Core Library
//!
//! `docshield-core` provides the rule resolution and redaction execution engine
//! behind DocShield. It turns a template reference into a concrete,
//! integrity-checked rule set, scans document text for matches, resolves
//! overlapping matches deterministically, produces a masked artifact and emits
//! a reviewable report.
//!
//! ## Modules
//!
//! * `config`: `Rule`s, rule files and the YAML `EngineConfig`.
//! * `template`: templates (inline or referenced rules) and the `TemplateResolver`.
//! * `integrity`: rule checksums and the pre-match integrity gate.
//! * `enrichment`: idempotent repair of missing or stale rule metadata.
//! * `engine`: the `MatchEngine` trait, with the shared overlap pass.
//! * `engines`: the regex implementation and overlap resolution.
//! * `sanitizers`: rule compilation and the compiled-rule cache.
//! * `validators`: programmatic checks applied to regex hits.
//! * `executor`: layout-preserving masking of confirmed matches.
//! * `report`: entity categorization and the `ReportBuilder`.
//! * `review`: reviewer confirm/flag decisions and feedback.
//! * `store`: storage traits plus in-memory and JSON file backends.
//! * `service`: `RedactionService`, the operations exposed to callers.
//! * `audit_log`: the JSONL audit trail.
//! * `headless`: one-shot redaction of a string.
//!
//! ## Usage Example
//!
//! ```rust
//! use docshield_core::{headless_redact_string, EngineConfig, RuleFile};
//!
//! fn main() -> anyhow::Result<()> {
//!     let rules = RuleFile::from_yaml(
//!         "rules:\n  - id: ssn\n    name: ssn\n    pattern: '\\d{3}-\\d{2}-\\d{4}'\n    severity: high\n",
//!     )?;
//!     let out = headless_redact_string(rules.rules, "SSN 123-45-6789", &EngineConfig::default())?;
//!     assert_eq!(out, "SSN ███████████");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Engine operations return [`DocshieldError`]. Branch on
//! [`DocshieldError::kind`], never on the message text.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod audit_log;
pub mod config;
pub mod document;
pub mod engine;
pub mod engines;
pub mod enrichment;
pub mod errors;
pub mod executor;
pub mod headless;
pub mod integrity;
pub mod redaction_match;
pub mod report;
pub mod review;
pub mod sanitizers;
pub mod service;
pub mod store;
pub mod template;
pub mod validators;

/// Re-exports the rule and configuration types.
pub use config::{
    EngineConfig, Rule, RuleCategory, RuleFile, Severity, ValidatorKind, MAX_PATTERN_LENGTH,
};

pub use errors::{DocshieldError, RecordKind};

pub use document::{Document, DocumentStatus, StatusUpdate};
pub use template::{ResolvedRuleSet, RuleSource, Template, TemplateResolver};
pub use integrity::{rule_checksum, validate as validate_rule_set};
pub use enrichment::{Enricher, EnrichmentFailure, EnrichmentSummary, TemplateEnrichment};

/// Re-exports the match engine trait and its regex implementation.
pub use engine::MatchEngine;
pub use engines::regex_engine::RegexEngine;
pub use redaction_match::{redact_sensitive, Match, MatchMethod};

pub use executor::{RedactedArtifact, RedactionExecutor};
pub use report::{DisplayCategory, RedactedEntity, RedactionReport, ReportBuilder};
pub use review::{EntityUpdate, ReviewEvent, ReviewFeedbackEngine, ReviewState};

pub use store::{DocumentStore, JsonFileStore, MemoryStore, ReportStore, RuleStore, RunLease, StoreSnapshot};
pub use service::{RedactionOutcome, RedactionService};

/// Re-exports the AuditLog type for recording redaction events.
pub use audit_log::{AuditEvent, AuditLog};

/// Re-exports types and functions for one-shot, non-interactive use.
pub use headless::{headless_redact, headless_redact_string, HeadlessOutcome};

pub use sanitizers::compiler::{compile_rules, CompiledRule, CompiledRules};
