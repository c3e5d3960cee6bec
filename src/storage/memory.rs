use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::backend::{validate_key, ObjectInfo, ObjectStore, StorageError};

/// A stored object with the content type it was written with
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub payload: Bytes,
    pub content_type: String,
}

/// Process-local object store
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, payload: Bytes, content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("in-memory store poisoned".to_string()))?;

        if key.ends_with('/') && objects.contains_key(key) {
            return Ok(());
        }

        objects.insert(
            key.to_string(),
            StoredObject {
                payload,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("in-memory store poisoned".to_string()))?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.payload.len() as u64,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
