//! Configuration loading for Briefsmith.
//!
//! Two concerns: the persisted registry file (a small pretty-printed
//! JSON document mapping motion-category slugs to knowledge-store ids)
//! and process secrets read from the environment.
//!
//! The registry file tolerates absence (treated as an empty registry)
//! and missing optional keys (defaulted on load). An unparseable file
//! is the one fatal configuration condition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default registry file name, relative to the working directory.
pub const DEFAULT_REGISTRY_FILE: &str = "briefsmith.json";

/// Errors from configuration loading and saving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read/write config file: {0}")]
    Io(#[from] std::io::Error),

    /// Total configuration corruption — the file exists but cannot be
    /// parsed. Fatal per the error-handling design; never silently
    /// reset to empty.
    #[error("Config file is corrupt: {0}")]
    Corrupt(String),
}

/// The persisted registry document.
///
/// `vector_stores` maps category slugs to opaque knowledge-store
/// identifiers. `assistant_id` is carried by some deployments for a
/// durable assistant handle; it is preserved across saves but unused
/// by the orchestrator.
///
/// Saves are whole-file overwrites. Concurrent writers are not
/// supported; the deployment model assumes a single operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryFile {
    /// category slug → knowledge-store id
    #[serde(default)]
    pub vector_stores: BTreeMap<String, String>,

    /// Optional durable assistant identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

impl RegistryFile {
    /// Load from `path`. A missing file yields an empty registry; an
    /// unparseable file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No registry file, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        serde_json::from_str(&content).map_err(|e| ConfigError::Corrupt(e.to_string()))
    }

    /// Save to `path` as pretty-printed JSON (whole-file overwrite).
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Corrupt(e.to_string()))?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), stores = self.vector_stores.len(), "Registry saved");
        Ok(())
    }

    /// Default path: `briefsmith.json` in the working directory, or
    /// `$BRIEFSMITH_CONFIG` when set.
    pub fn default_path() -> PathBuf {
        std::env::var("BRIEFSMITH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REGISTRY_FILE))
    }
}

/// Process secrets, read once from the environment.
///
/// Never logged; the `Debug` impl redacts every value.
#[derive(Clone)]
pub struct Secrets {
    /// API key for the drafting/retrieval backend.
    pub drafting_api_key: Option<String>,
    /// API key for the extraction backend.
    pub extraction_api_key: Option<String>,
    /// Shared application password.
    pub app_password: Option<String>,
}

impl Secrets {
    /// Read secrets from the environment. Prefixed variables win over
    /// the generic ones.
    pub fn from_env() -> Self {
        Self {
            drafting_api_key: first_env(&["BRIEFSMITH_OPENAI_API_KEY", "OPENAI_API_KEY"]),
            extraction_api_key: first_env(&["BRIEFSMITH_GEMINI_API_KEY", "GEMINI_API_KEY"]),
            app_password: first_env(&["BRIEFSMITH_APP_PASSWORD"]),
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| std::env::var(n).ok().filter(|v| !v.is_empty()))
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("drafting_api_key", &redact(&self.drafting_api_key))
            .field("extraction_api_key", &redact(&self.extraction_api_key))
            .field("app_password", &redact(&self.app_password))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let registry = RegistryFile::load(&path).unwrap();
        assert!(registry.vector_stores.is_empty());
        assert!(registry.assistant_id.is_none());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RegistryFile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Corrupt(_)));
    }

    #[test]
    fn missing_keys_are_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, "{}").unwrap();
        let registry = RegistryFile::load(&path).unwrap();
        assert!(registry.vector_stores.is_empty());
    }

    #[test]
    fn roundtrip_preserves_unrelated_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefsmith.json");

        let mut registry = RegistryFile::default();
        registry
            .vector_stores
            .insert("value_claim".into(), "vs_abc".into());
        registry
            .vector_stores
            .insert("avoid_lien".into(), "vs_def".into());
        registry.assistant_id = Some("asst_1".into());
        registry.save(&path).unwrap();

        // Mutate one entry and save again; the other must survive.
        let mut reloaded = RegistryFile::load(&path).unwrap();
        assert_eq!(reloaded, registry);
        reloaded
            .vector_stores
            .insert("value_claim".into(), "vs_new".into());
        reloaded.save(&path).unwrap();

        let last = RegistryFile::load(&path).unwrap();
        assert_eq!(last.vector_stores["avoid_lien"], "vs_def");
        assert_eq!(last.vector_stores["value_claim"], "vs_new");
        assert_eq!(last.assistant_id.as_deref(), Some("asst_1"));
    }

    #[test]
    fn saved_file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefsmith.json");
        let mut registry = RegistryFile::default();
        registry
            .vector_stores
            .insert("value_claim".into(), "vs_abc".into());
        registry.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains('\n'), "expected multi-line JSON");
        assert!(content.contains("  \"vector_stores\""));
    }

    #[test]
    fn secrets_debug_is_redacted() {
        let secrets = Secrets {
            drafting_api_key: Some("sk-very-secret".into()),
            extraction_api_key: None,
            app_password: Some("hunter2".into()),
        };
        let dbg = format!("{secrets:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
