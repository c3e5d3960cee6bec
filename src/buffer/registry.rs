use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use super::chunk::ChunkBuffer;

/// Counters published by a session entry after every change
///
/// Readable without the session lock, which the pipeline holds for the
/// whole of a flush.
#[derive(Debug)]
pub struct SessionStats {
    started_at: DateTime<Utc>,
    buffered_bytes: AtomicUsize,
    buffered_chunks: AtomicUsize,
    next_sequence: AtomicU64,
    flushes_completed: AtomicU64,
    flushes_failed: AtomicU64,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            buffered_bytes: AtomicUsize::new(0),
            buffered_chunks: AtomicUsize::new(0),
            next_sequence: AtomicU64::new(0),
            flushes_completed: AtomicU64::new(0),
            flushes_failed: AtomicU64::new(0),
        }
    }

    fn publish_buffer(&self, buffer: &ChunkBuffer) {
        self.buffered_bytes.store(buffer.total_bytes(), Ordering::SeqCst);
        self.buffered_chunks.store(buffer.len(), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> SessionStatus {
        SessionStatus {
            started_at: self.started_at,
            buffered_bytes: self.buffered_bytes.load(Ordering::SeqCst),
            buffered_chunks: self.buffered_chunks.load(Ordering::SeqCst),
            next_sequence: self.next_sequence.load(Ordering::SeqCst),
            flushes_completed: self.flushes_completed.load(Ordering::SeqCst),
            flushes_failed: self.flushes_failed.load(Ordering::SeqCst),
        }
    }
}

/// Per-session state: the chunk buffer and its upload sequence counter
#[derive(Debug)]
pub struct SessionEntry {
    buffer: ChunkBuffer,
    next_sequence: u64,
    /// Set once the session has been torn down; the entry may still be
    /// referenced by a caller that fetched it before removal
    ended: bool,
    stats: Arc<SessionStats>,
}

impl SessionEntry {
    fn new(now: Instant, stats: Arc<SessionStats>) -> Self {
        Self {
            buffer: ChunkBuffer::new(now),
            next_sequence: 0,
            ended: false,
            stats,
        }
    }

    pub fn append(&mut self, chunk: Bytes, now: Instant) -> &ChunkBuffer {
        self.buffer.append(chunk, now);
        self.stats.publish_buffer(&self.buffer);
        &self.buffer
    }

    pub fn drain(&mut self, now: Instant) -> Bytes {
        let payload = self.buffer.drain(now);
        self.stats.publish_buffer(&self.buffer);
        payload
    }

    /// Put a failed flush's payload back in front of the buffer
    pub fn restore(&mut self, payload: Bytes, opened_at: Option<Instant>) {
        self.buffer.restore(payload, opened_at);
        self.stats.publish_buffer(&self.buffer);
    }

    /// Current counter value; the counter moves on by one
    pub fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.stats.next_sequence.store(self.next_sequence, Ordering::SeqCst);
        sequence
    }

    pub fn buffer(&self) -> &ChunkBuffer {
        &self.buffer
    }

    pub fn record_flush(&mut self, succeeded: bool) {
        let counter = if succeeded {
            &self.stats.flushes_completed
        } else {
            &self.stats.flushes_failed
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    pub fn status(&self) -> SessionStatus {
        self.stats.snapshot()
    }
}

/// Snapshot of a live session's buffer state
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// When the first chunk for this session arrived
    pub started_at: DateTime<Utc>,

    /// Bytes waiting for the next flush
    pub buffered_bytes: usize,

    /// Chunks waiting for the next flush
    pub buffered_chunks: usize,

    /// Sequence number the next flush will use
    pub next_sequence: u64,

    /// Flushes whose upload succeeded
    pub flushes_completed: u64,

    /// Flushes whose upload failed
    pub flushes_failed: u64,
}

#[derive(Debug, Clone)]
struct SessionSlot {
    entry: Arc<Mutex<SessionEntry>>,
    stats: Arc<SessionStats>,
}

/// Live sessions keyed by session id
///
/// The map lock is only held to look up, insert or remove an entry. Work on
/// one session goes through that session's own mutex, so sessions never
/// wait on each other and two callers for the same session are serialized.
///
/// Once closed, the registry creates no new entries.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<String, SessionSlot>>,
    closed: AtomicBool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `session_id`, created with counter 0 if absent
    ///
    /// None once the registry is closed and the session is not live.
    pub async fn entry(&self, session_id: &str) -> Option<Arc<Mutex<SessionEntry>>> {
        if let Some(entry) = self.get(session_id).await {
            return Some(entry);
        }

        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.get(session_id) {
            return Some(Arc::clone(&slot.entry));
        }
        if self.closed.load(Ordering::SeqCst) {
            debug!(session_id, "registry closed, not creating session buffer");
            return None;
        }

        debug!(session_id, "creating session buffer");
        let stats = Arc::new(SessionStats::new());
        let slot = SessionSlot {
            entry: Arc::new(Mutex::new(SessionEntry::new(Instant::now(), Arc::clone(&stats)))),
            stats,
        };
        let entry = Arc::clone(&slot.entry);
        entries.insert(session_id.to_string(), slot);
        Some(entry)
    }

    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionEntry>>> {
        let entries = self.entries.read().await;
        entries.get(session_id).map(|slot| Arc::clone(&slot.entry))
    }

    /// Append a chunk, creating the session if needed; returns buffered bytes
    pub async fn append(&self, session_id: &str, chunk: Bytes) -> Option<usize> {
        let entry = self.entry(session_id).await?;
        let mut entry = entry.lock().await;
        Some(entry.append(chunk, Instant::now()).total_bytes())
    }

    /// Drain a session's buffer; None if the session is unknown
    pub async fn drain(&self, session_id: &str) -> Option<Bytes> {
        let entry = self.get(session_id).await?;
        let mut entry = entry.lock().await;
        Some(entry.drain(Instant::now()))
    }

    /// Take the next sequence number for a session, creating it if needed
    pub async fn next_sequence(&self, session_id: &str) -> Option<u64> {
        let entry = self.entry(session_id).await?;
        let mut entry = entry.lock().await;
        Some(entry.next_sequence())
    }

    /// Forget a session. Removing an unknown session is a no-op.
    pub async fn remove(&self, session_id: &str) -> bool {
        let mut entries = self.entries.write().await;
        let removed = entries.remove(session_id).is_some();
        if removed {
            debug!(session_id, "removed session buffer");
        }
        removed
    }

    /// Stop creating sessions; live ones are unaffected
    pub async fn close(&self) {
        let _entries = self.entries.write().await;
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Session registry closed to new sessions");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.entries.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Buffer state without waiting on the session lock
    pub async fn status(&self, session_id: &str) -> Option<SessionStatus> {
        let entries = self.entries.read().await;
        entries.get(session_id).map(|slot| slot.stats.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_creates_entry_with_zero_counter() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let buffered = registry.append("abc", Bytes::from_static(b"12345")).await;
        assert_eq!(buffered, Some(5));
        assert!(registry.contains("abc").await);

        let status = registry.status("abc").await.unwrap();
        assert_eq!(status.next_sequence, 0);
        assert_eq!(status.buffered_chunks, 1);
        assert_eq!(status.buffered_bytes, 5);
    }

    #[tokio::test]
    async fn test_sequence_is_monotonic() {
        let registry = SessionRegistry::new();

        let mut sequences = Vec::new();
        for _ in 0..4 {
            sequences.push(registry.next_sequence("abc").await.unwrap());
        }

        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(registry.status("abc").await.unwrap().next_sequence, 4);
    }

    #[tokio::test]
    async fn test_drain_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.drain("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.append("abc", Bytes::from_static(b"x")).await;

        assert!(registry.remove("abc").await);
        assert!(!registry.remove("abc").await);
        assert!(!registry.contains("abc").await);
    }

    #[tokio::test]
    async fn test_remove_resets_counter() {
        let registry = SessionRegistry::new();
        registry.next_sequence("abc").await;
        registry.next_sequence("abc").await;
        registry.remove("abc").await;

        assert_eq!(registry.next_sequence("abc").await, Some(0));
    }

    #[tokio::test]
    async fn test_closed_registry_creates_no_sessions() {
        let registry = SessionRegistry::new();
        registry.append("live", Bytes::from_static(b"a")).await;
        registry.close().await;

        assert!(registry.is_closed());
        assert_eq!(registry.append("live", Bytes::from_static(b"b")).await, Some(2));
        assert!(registry.append("late", Bytes::from_static(b"c")).await.is_none());
        assert!(!registry.contains("late").await);

        registry.remove("live").await;
        assert!(registry.next_sequence("live").await.is_none());
    }

    #[tokio::test]
    async fn test_status_reads_without_session_lock() {
        let registry = SessionRegistry::new();
        registry.append("abc", Bytes::from_static(b"123")).await;

        let entry = registry.get("abc").await.unwrap();
        let _held = entry.lock().await;

        let status = registry.status("abc").await.unwrap();
        assert_eq!(status.buffered_bytes, 3);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        registry.append("a", Bytes::from_static(b"aaa")).await;
        registry.append("b", Bytes::from_static(b"b")).await;
        registry.next_sequence("a").await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.status("a").await.unwrap().next_sequence, 1);
        assert_eq!(registry.status("b").await.unwrap().next_sequence, 0);
        assert_eq!(&registry.drain("a").await.unwrap()[..], b"aaa");
        assert_eq!(&registry.drain("b").await.unwrap()[..], b"b");
        assert_eq!(registry.status("a").await.unwrap().buffered_bytes, 0);
    }
}
