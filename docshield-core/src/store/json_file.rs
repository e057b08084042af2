// docshield-core/src/store/json_file.rs
//! A single-file JSON store for the CLI and the HTTP server.
//!
//! Several processes may share one store file. Every access takes an advisory
//! lock on a stable sibling `<store>.lock` file: shared for reads, exclusive
//! for mutations. A mutation reloads the snapshot from disk while holding the
//! lock, applies its change, writes a temporary sibling file and renames it
//! over the original.
//!
//! Document sources are plain files resolved relative to the store directory.
//! Artifacts go to `<store dir>/artifacts/<document id>.redacted.txt` and run
//! locks to `<store dir>/locks/<document id>.lock`.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};

use crate::config::Rule;
use crate::document::{Document, StatusUpdate};
use crate::executor::RedactedArtifact;
use crate::report::{RedactedEntity, RedactionReport};
use crate::store::memory::StoreSnapshot;
use crate::store::{DocumentStore, ReportStore, RuleStore, RunLease};
use crate::template::Template;

const STORE_FILE_TMP_SUFFIX: &str = ".tmp";
const STORE_LOCK_SUFFIX: &str = ".lock";
pub const ARTIFACTS_DIR: &str = "artifacts";
pub const RUN_LOCKS_DIR: &str = "locks";

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::at(path.into());
        let snapshot = store.snapshot()?;
        info!(
            "Opened store {} ({} templates, {} rules, {} documents).",
            store.path.display(),
            snapshot.templates.len(),
            snapshot.rules.len(),
            snapshot.documents.len()
        );
        Ok(store)
    }

    /// Creates (or overwrites) a store file holding `snapshot`.
    pub fn create(path: impl Into<PathBuf>, snapshot: StoreSnapshot) -> Result<Self> {
        let store = Self::at(path.into());
        let lock = store.lock(true)?;
        save_snapshot(&store.path, &snapshot)?;
        fs2::FileExt::unlock(&lock)?;
        Ok(store)
    }

    fn at(path: PathBuf) -> Self {
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(STORE_LOCK_SUFFIX);
        Self { lock_path: PathBuf::from(lock_name), path, root }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current on-disk state.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        if !self.path.exists() {
            return Ok(StoreSnapshot::default());
        }
        let lock = self.lock(false)?;
        let snapshot = load_snapshot(&self.path);
        fs2::FileExt::unlock(&lock)?;
        snapshot
    }

    /// Applies `change` to the freshest on-disk state and persists the result.
    /// Nothing is written when `change` fails.
    fn mutate<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<()>,
    {
        let lock = self.lock(true)?;
        let mut next = load_snapshot(&self.path)?;
        change(&mut next)?;
        save_snapshot(&self.path, &next)?;
        fs2::FileExt::unlock(&lock)?;
        Ok(())
    }

    fn lock(&self, exclusive: bool) -> Result<File> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open lock file {}", self.lock_path.display()))?;
        if exclusive {
            fs2::FileExt::lock_exclusive(&file)?;
        } else {
            fs2::FileExt::lock_shared(&file)?;
        }
        Ok(file)
    }

    fn resolve(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

fn ensure_file_name(document_id: &str) -> Result<()> {
    if document_id.is_empty() || document_id.contains(['/', '\\']) || document_id.starts_with('.') {
        return Err(anyhow!("document id '{}' is not usable as a file name", document_id));
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    if !path.exists() {
        return Ok(StoreSnapshot::default());
    }
    let mut raw = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut raw))
        .with_context(|| format!("Failed to read store {}", path.display()))?;

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(StoreSnapshot::default());
    }
    serde_json::from_slice(&raw).with_context(|| format!("Store {} is not valid JSON", path.display()))
}

fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(STORE_FILE_TMP_SUFFIX);
    let tmp_path = PathBuf::from(tmp_name);
    {
        let mut tmp = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
    }
    fs::rename(&tmp_path, path).with_context(|| format!("Failed to replace store {}", path.display()))?;
    debug!("Persisted store {} ({} bytes).", path.display(), json.len());
    Ok(())
}

#[async_trait]
impl RuleStore for JsonFileStore {
    async fn get_template(&self, template_id: &str) -> Result<Option<Template>> {
        Ok(self.snapshot()?.templates.remove(template_id))
    }

    async fn list_templates(&self, user_id: &str) -> Result<Vec<Template>> {
        Ok(self.snapshot()?.templates_of(user_id))
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<Rule>> {
        Ok(self.snapshot()?.rules.remove(rule_id))
    }

    async fn update_rule(&self, rule: &Rule) -> Result<()> {
        self.mutate(|s| s.replace_rule(rule))
    }

    async fn update_inline_rule(&self, template_id: &str, rule: &Rule) -> Result<()> {
        self.mutate(|s| s.replace_inline_rule(template_id, rule))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.snapshot()?.documents.remove(document_id))
    }

    async fn read_source(&self, document: &Document) -> Result<Vec<u8>> {
        let path = self.resolve(&document.source_location);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read source of '{}' at {}", document.id, path.display()))
    }

    async fn write_artifact(&self, document: &Document, artifact: &RedactedArtifact) -> Result<String> {
        ensure_file_name(&document.id)?;
        let location = format!("{}/{}.redacted.txt", ARTIFACTS_DIR, document.id);
        let path = self.resolve(&location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, artifact.content.as_bytes())
            .await
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        Ok(location)
    }

    async fn set_status(&self, document_id: &str, update: StatusUpdate) -> Result<()> {
        self.mutate(|s| s.apply_status(document_id, &update))
    }

    async fn claim_run(&self, document_id: &str) -> Result<Option<RunLease>> {
        ensure_file_name(document_id)?;
        let path = self.resolve(&format!("{}/{}.lock", RUN_LOCKS_DIR, document_id));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open run lock {}", path.display()))?;
        match fs2::FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(RunLease::locked(file))),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                debug!("Run lock {} is held elsewhere.", path.display());
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to lock {}", path.display())),
        }
    }
}

#[async_trait]
impl ReportStore for JsonFileStore {
    async fn put_report(&self, report: &RedactionReport) -> Result<()> {
        self.mutate(|s| {
            s.reports.insert(report.document_id.clone(), report.clone());
            Ok(())
        })
    }

    async fn get_report(&self, document_id: &str) -> Result<Option<RedactionReport>> {
        Ok(self.snapshot()?.reports.remove(document_id))
    }

    async fn put_entity(&self, document_id: &str, entity: &RedactedEntity) -> Result<()> {
        self.mutate(|s| s.replace_entity(document_id, entity))
    }

    async fn delete_report(&self, document_id: &str) -> Result<()> {
        self.mutate(|s| {
            s.reports.remove(document_id);
            Ok(())
        })
    }
}
