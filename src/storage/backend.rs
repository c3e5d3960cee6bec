use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackendKind, StorageConfig};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Listing entry for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// Object storage backend trait
///
/// Keys are `/`-separated names. A key ending in `/` is a zero-length folder
/// placeholder; writing one that already exists is a no-op.
///
/// Implementations:
/// - `InMemoryObjectStore`: process-local map (tests, `memory` backend)
/// - `LocalFsObjectStore`: files under a root directory
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write the full payload under `key` in one shot
    async fn put(&self, key: &str, payload: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// List objects whose key starts with `prefix`, sorted by key
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Object store factory
pub struct ObjectStoreFactory;

impl ObjectStoreFactory {
    /// Create the backend selected by configuration
    pub fn create(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
        match config.backend {
            StorageBackendKind::Memory => Ok(Arc::new(super::memory::InMemoryObjectStore::new())),
            StorageBackendKind::Local => Ok(Arc::new(super::local::LocalFsObjectStore::new(
                &config.root,
            )?)),
        }
    }
}

/// Reject keys that could escape a namespace or address nothing
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .trim_end_matches('/')
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");

    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
