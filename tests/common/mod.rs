// Shared fixtures for integration tests: pipeline construction and object
// stores that fail, stall or record what they were asked to do.

#![allow(dead_code)]

use bytes::Bytes;
use interview_recorder::storage::{ObjectInfo, StorageError};
use interview_recorder::{
    BlobUploader, FlushPolicy, InMemoryObjectStore, ObjectStore, PipelineConfig, SessionPipeline,
    SessionRegistry, UploadPolicy,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MIB: usize = 1024 * 1024;

pub fn pipeline_with(
    store: Arc<dyn ObjectStore>,
    policy: FlushPolicy,
    upload: UploadPolicy,
    rebuffer_on_failure: bool,
) -> SessionPipeline {
    SessionPipeline::new(
        Arc::new(SessionRegistry::new()),
        BlobUploader::new(store, upload),
        PipelineConfig {
            flush_policy: policy,
            rebuffer_on_failure,
        },
    )
}

/// Pipeline with default thresholds over `store`
pub fn default_pipeline(store: Arc<dyn ObjectStore>) -> SessionPipeline {
    pipeline_with(store, FlushPolicy::default(), UploadPolicy::default(), false)
}

/// Pipeline that flushes as soon as more than `bytes` are buffered
pub fn size_pipeline(store: Arc<dyn ObjectStore>, bytes: usize) -> SessionPipeline {
    pipeline_with(
        store,
        FlushPolicy::new(bytes, Duration::from_secs(3600)),
        UploadPolicy::default(),
        false,
    )
}

/// In-memory store that can be told to fail specific keys and logs every put
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryObjectStore,
    /// key -> number of upcoming puts to fail
    failures: Mutex<HashMap<String, u32>>,
    puts: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, key: &str, times: u32) {
        self.failures.lock().unwrap().insert(key.to_string(), times);
    }

    /// Blob keys written or attempted, in call order (placeholders excluded)
    pub fn blob_puts(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .filter(|k| !k.ends_with('/'))
            .cloned()
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).map(|o| o.payload)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[async_trait::async_trait]
impl ObjectStore for FlakyStore {
    async fn put(&self, key: &str, payload: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.puts.lock().unwrap().push(key.to_string());

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StorageError::Unavailable(format!("injected failure for {}", key)));
                }
            }
        }

        self.inner.put(key, payload, content_type).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        self.inner.list(prefix).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Store whose blob writes take `delay`; tracks how many run at once
pub struct SlowStore {
    inner: InMemoryObjectStore,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_session: Mutex<HashMap<String, usize>>,
    max_per_session: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            per_session: Mutex::new(HashMap::new()),
            max_per_session: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_per_session(&self) -> usize {
        self.max_per_session.load(Ordering::SeqCst)
    }

    /// Blob keys in the order their writes started
    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).map(|o| o.payload)
    }
}

#[async_trait::async_trait]
impl ObjectStore for SlowStore {
    async fn put(&self, key: &str, payload: Bytes, content_type: &str) -> Result<(), StorageError> {
        if key.ends_with('/') {
            return self.inner.put(key, payload, content_type).await;
        }

        let session = key.split('/').next().unwrap_or_default().to_string();
        self.order.lock().unwrap().push(key.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        {
            let mut per_session = self.per_session.lock().unwrap();
            let count = per_session.entry(session.clone()).or_insert(0);
            *count += 1;
            self.max_per_session.fetch_max(*count, Ordering::SeqCst);
        }

        tokio::time::sleep(self.delay).await;
        let result = self.inner.put(key, payload, content_type).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.per_session.lock().unwrap().get_mut(&session) {
            *count -= 1;
        }

        result
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        self.inner.list(prefix).await
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Store whose writes never complete
#[derive(Default)]
pub struct HangingStore;

#[async_trait::async_trait]
impl ObjectStore for HangingStore {
    async fn put(&self, _key: &str, _payload: Bytes, _content_type: &str) -> Result<(), StorageError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "hanging"
    }
}
