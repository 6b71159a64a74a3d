//! Storage configuration
//!
//! The backend is an environment decision made once at startup:
//!
//! ```toml
//! [storage]
//! backend = "browser"
//! namespace = "fin_tracker_db"
//! dir = "/data/local-storage"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::database::backend::StorageBackend;
use crate::database::browser::BrowserBackend;
use crate::database::kv_store::{FileStore, MemoryStore};
use crate::database::native::SqliteBackend;
use crate::database::BackendOpener;
use crate::error::{FinanceError, Result};
use crate::STORAGE_NAMESPACE;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Which engine backs the database
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// SQLite file on the device; no path means a private in-memory database
    Native {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Embedded engine persisted to a key-value store namespace
    Browser {
        #[serde(default = "default_namespace")]
        namespace: String,
        /// Key-value store directory; none means a process-local store
        #[serde(default)]
        dir: Option<PathBuf>,
    },
}

fn default_namespace() -> String {
    STORAGE_NAMESPACE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Native { path: None }
    }
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {:?}", path);
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map_err(|e| {
                FinanceError::Config(format!("Failed to parse config file {path:?}: {e}"))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(FinanceError::Config(format!(
                "Failed to read config file {path:?}: {err}"
            ))),
        }
    }
}

impl StorageConfig {
    /// Build the opener a service calls on every `initialize()`
    ///
    /// A browser backend without a directory gets one process-local store
    /// shared by every open, so close and reopen keep its data. A native
    /// backend without a path stays scratch storage.
    pub fn into_opener(self) -> BackendOpener {
        match self {
            StorageConfig::Browser { namespace, dir: None } => {
                let store = MemoryStore::new();
                Box::new(move || {
                    let backend = BrowserBackend::open(Box::new(store.clone()), &namespace)?;
                    Ok(Box::new(backend) as Box<dyn StorageBackend>)
                })
            }
            config => Box::new(move || config.open_backend()),
        }
    }

    /// Open the configured engine once
    pub fn open_backend(&self) -> Result<Box<dyn StorageBackend>> {
        match self {
            StorageConfig::Native { path: Some(path) } => Ok(Box::new(SqliteBackend::open(path)?)),
            StorageConfig::Native { path: None } => Ok(Box::new(SqliteBackend::open_in_memory()?)),
            StorageConfig::Browser { namespace, dir: Some(dir) } => Ok(Box::new(
                BrowserBackend::open(Box::new(FileStore::open(dir)?), namespace)?,
            )),
            StorageConfig::Browser { namespace, dir: None } => Ok(Box::new(
                BrowserBackend::open(Box::new(MemoryStore::new()), namespace)?,
            )),
        }
    }
}
