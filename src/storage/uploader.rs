use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::backend::{ObjectStore, StorageError};

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Timeout and retry settings for blob uploads
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Upper bound for one upload, every retry included
    pub timeout: Duration,
    /// Extra attempts after the first failure (0 = fail immediately)
    pub max_retries: u32,
    /// Delay before retry `n` is `n * retry_backoff`
    pub retry_backoff: Duration,
    pub content_type: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            content_type: VIDEO_CONTENT_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload of {key} failed: {source}")]
    Store {
        key: String,
        sequence: u64,
        #[source]
        source: StorageError,
    },

    #[error("upload of {key} timed out after {timeout:?}")]
    Timeout {
        key: String,
        sequence: u64,
        timeout: Duration,
    },
}

impl UploadError {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Store { sequence, .. } | Self::Timeout { sequence, .. } => *sequence,
        }
    }
}

/// Object key for a session's folder placeholder
pub fn folder_key(session_id: &str) -> String {
    format!("{}/", session_id)
}

/// Object key for flush `sequence` of a session
pub fn blob_key(session_id: &str, sequence: u64) -> String {
    format!("{}/{}.mp4", session_id, sequence)
}

/// Writes flushed session payloads to the object store
#[derive(Clone)]
pub struct BlobUploader {
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
}

impl BlobUploader {
    pub fn new(store: Arc<dyn ObjectStore>, policy: UploadPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Upload `payload` as `{session_id}/{sequence}.mp4`
    ///
    /// The policy timeout bounds the whole call, retries and backoff
    /// included. The payload is never inspected. On failure it is still
    /// owned by the caller (`Bytes` clones share the buffer).
    pub async fn upload(
        &self,
        session_id: &str,
        sequence: u64,
        payload: &Bytes,
    ) -> Result<(), UploadError> {
        let key = blob_key(session_id, sequence);
        let attempts = self.upload_with_retries(session_id, &key, sequence, payload);

        match tokio::time::timeout(self.policy.timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(UploadError::Timeout {
                key,
                sequence,
                timeout: self.policy.timeout,
            }),
        }
    }

    async fn upload_with_retries(
        &self,
        session_id: &str,
        key: &str,
        sequence: u64,
        payload: &Bytes,
    ) -> Result<(), UploadError> {
        let mut attempt = 0u32;

        loop {
            match self.attempt(session_id, key, payload).await {
                Ok(()) => {
                    info!(
                        "Uploaded {} ({} bytes) to {} store",
                        key,
                        payload.len(),
                        self.store.name()
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.retry_backoff * attempt;
                    warn!(
                        "Upload of {} failed ({}), retry {}/{} in {:?}",
                        key, e, attempt, self.policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(UploadError::Store {
                        key: key.to_string(),
                        sequence,
                        source,
                    })
                }
            }
        }
    }

    async fn attempt(&self, session_id: &str, key: &str, payload: &Bytes) -> Result<(), StorageError> {
        self.store
            .put(&folder_key(session_id), Bytes::new(), "")
            .await?;
        self.store
            .put(key, payload.clone(), &self.policy.content_type)
            .await
    }
}
