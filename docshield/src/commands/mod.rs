// docshield/src/commands/mod.rs
//! Subcommand implementations and the helpers they share.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use is_terminal::IsTerminal;
use log::debug;

use docshield_core::{EngineConfig, JsonFileStore, RedactionService};

use crate::ui::output_format;
use crate::ui::theme::ThemeMap;

pub mod enrich;
pub mod redact;
pub mod report;
pub mod review;
pub mod scan;

/// Store file name under the platform data directory.
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing success messages to stderr.
pub fn success_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Loads the engine configuration, or the defaults when no file is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path),
        None => Ok(EngineConfig::default()),
    }
}

/// The store path given on the command line, or `<data dir>/docshield/store.json`.
pub fn resolve_store_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine a data directory; pass --store or set DOCSHIELD_STORE"))?
        .join("docshield");
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir.join(DEFAULT_STORE_FILE))
}

/// Opens the JSON store and builds a service over it.
pub fn open_service(store_path: &Path, config: EngineConfig) -> Result<RedactionService> {
    debug!("Using store {}", store_path.display());
    let store = Arc::new(JsonFileStore::open(store_path)?);
    Ok(RedactionService::from_store(store, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_store_path_wins() {
        let path = resolve_store_path(Some(PathBuf::from("/tmp/custom.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_engine_config(Some(Path::new("/nonexistent/docshield.yaml"))).is_err());
        assert_eq!(load_engine_config(None).unwrap(), EngineConfig::default());
    }
}
