//! audit_log.rs - Append-only JSONL trail of redaction, enrichment and review events.
//!
//! Entries never carry raw matched text; matches are represented by their
//! `match_hash` digests.
//!
//! License: MIT OR APACHE 2.0

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::review::ReviewEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RedactionCompleted {
        run_id: String,
        document_id: String,
        template_id: String,
        input_sha256: String,
        artifact_sha256: String,
        match_hashes: Vec<String>,
    },
    RedactionFailed {
        document_id: String,
        template_id: String,
        kind: String,
        message: String,
    },
    RulesEnriched {
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        template_id: Option<String>,
        updated_rules: usize,
        errors: usize,
    },
    EntityReviewed(ReviewEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    /// Opens (creating parent directories as needed) an audit trail at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create audit log dir: {}", parent.display()))?;
        }
        Ok(Self { path, write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: AuditEvent) -> Result<()> {
        let record = AuditRecord { timestamp: Utc::now(), event };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open audit log: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write audit event: {}", self.path.display()))?;
        debug!("Audit event appended to {}.", self.path.display());
        Ok(())
    }

    /// Reads every record back, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn events_are_appended_as_tagged_lines() {
        let dir = tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("audit").join("trail.jsonl")).unwrap();
        log.append(AuditEvent::RedactionFailed {
            document_id: "d1".to_string(),
            template_id: "t1".to_string(),
            kind: "processing".to_string(),
            message: "bad bytes".to_string(),
        })
        .unwrap();
        log.append(AuditEvent::RulesEnriched {
            user_id: "u1".to_string(),
            template_id: None,
            updated_rules: 2,
            errors: 0,
        })
        .unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "redaction_failed");
        assert_eq!(first["document_id"], "d1");

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[1].event, AuditEvent::RulesEnriched { updated_rules: 2, .. }));
    }
}
