//! Ledger configuration.
//!
//! A `LedgerConfig` is deserialized from TOML:
//!
//! ```toml
//! tenant_id = "acme"        # optional
//! append_retries = 2
//! log_filter = "info"
//!
//! [storage]
//! kind = "file"             # or "memory"
//! path = "/var/lib/attestor/ledger.jsonl"
//! ```
//!
//! Every key is optional; the defaults give an untenanted in-memory ledger.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use attestor_contracts::{AttestorError, AttestorResult};
use attestor_core::LedgerStore;

use crate::{file::FileJournal, ledger::Ledger};

/// Where committed records are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Scope the ledger to one tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Extra journal write attempts after a failure.
    #[serde(default = "default_append_retries")]
    pub append_retries: u32,

    /// Default `tracing` filter directive for binaries.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_append_retries() -> u32 {
    2
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            append_retries: default_append_retries(),
            log_filter: default_log_filter(),
            storage: StorageConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `AttestorError::ConfigError` if the TOML is malformed or does
    /// not match the expected schema.
    pub fn from_toml_str(s: &str) -> AttestorResult<Self> {
        toml::from_str(s).map_err(|e| AttestorError::ConfigError {
            reason: format!("failed to parse ledger config: {}", e),
        })
    }

    /// Read and parse the TOML file at `path`.
    pub fn from_file(path: &Path) -> AttestorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AttestorError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build the configured ledger, hydrating it from storage if file-backed.
    pub fn open_ledger(&self) -> AttestorResult<Arc<dyn LedgerStore>> {
        if let Some(tenant) = &self.tenant_id {
            if tenant.trim().is_empty() {
                return Err(AttestorError::ConfigError {
                    reason: "tenant_id must not be blank".to_string(),
                });
            }
        }

        match &self.storage {
            StorageConfig::Memory => {
                info!("opening in-memory ledger");
                Ok(Arc::new(self.apply(Ledger::in_memory())))
            }
            StorageConfig::File { path } => {
                info!(path = %path.display(), "opening file-backed ledger");
                let ledger = Ledger::open(FileJournal::new(path))?;
                Ok(Arc::new(self.apply(ledger)))
            }
        }
    }

    fn apply<J: attestor_core::Journal>(&self, ledger: Ledger<J>) -> Ledger<J> {
        let ledger = ledger.with_append_retries(self.append_retries);
        match &self.tenant_id {
            Some(tenant) => ledger.with_tenant(tenant.clone()),
            None => ledger,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use attestor_contracts::{AttestorError, NewEntry};

    use super::{LedgerConfig, StorageConfig};

    #[test]
    fn empty_document_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.append_retries, 2);
    }

    #[test]
    fn full_document_parses() {
        let config = LedgerConfig::from_toml_str(
            r#"
            tenant_id = "acme"
            append_retries = 5
            log_filter = "attestor=debug"

            [storage]
            kind = "file"
            path = "/tmp/ledger.jsonl"
        "#,
        )
        .unwrap();

        assert_eq!(config.tenant_id.as_deref(), Some("acme"));
        assert_eq!(config.append_retries, 5);
        assert_eq!(config.log_filter, "attestor=debug");
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: PathBuf::from("/tmp/ledger.jsonl")
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = LedgerConfig::from_toml_str("retries = 3").unwrap_err();
        assert!(matches!(err, AttestorError::ConfigError { .. }));
    }

    #[test]
    fn unknown_storage_kind_is_rejected() {
        let err = LedgerConfig::from_toml_str("[storage]\nkind = \"postgres\"").unwrap_err();
        assert!(err.to_string().contains("failed to parse ledger config"));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = LedgerConfig::from_file(std::path::Path::new("/nonexistent/attestor.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn opened_ledger_applies_tenant() {
        let config = LedgerConfig {
            tenant_id: Some("acme".to_string()),
            ..LedgerConfig::default()
        };
        let store = config.open_ledger().unwrap();
        assert_eq!(store.tenant_id(), Some("acme"));

        let record = store
            .append(NewEntry::system("cron", "purge", "session", "s-1").into_entry().unwrap())
            .unwrap();
        assert_eq!(record.entry().tenant_id.as_deref(), Some("acme"));
    }

    #[test]
    fn file_storage_opens_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let config = LedgerConfig::from_toml_str(&format!(
            "[storage]\nkind = \"file\"\npath = {:?}\n",
            path.display().to_string()
        ))
        .unwrap();

        let store = config.open_ledger().unwrap();
        store
            .append(NewEntry::human("ops", "deploy", "service", "api").into_entry().unwrap())
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn blank_tenant_is_rejected() {
        let config = LedgerConfig {
            tenant_id: Some(" ".to_string()),
            ..LedgerConfig::default()
        };
        assert!(config.open_ledger().is_err());
    }
}
