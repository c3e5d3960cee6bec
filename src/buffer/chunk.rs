use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

/// In-memory accumulation of one session's video chunks between flushes
///
/// Chunks are kept as received; concatenating them in order reproduces the
/// exact byte stream since the last drain.
#[derive(Debug)]
pub struct ChunkBuffer {
    chunks: Vec<Bytes>,
    total_bytes: usize,
    /// Time of the most recent append or drain
    last_write_at: Instant,
    /// Time the current unflushed data started accumulating (None while empty)
    opened_at: Option<Instant>,
}

impl ChunkBuffer {
    pub fn new(now: Instant) -> Self {
        Self {
            chunks: Vec::new(),
            total_bytes: 0,
            last_write_at: now,
            opened_at: None,
        }
    }

    /// Append a chunk received at `now`
    pub fn append(&mut self, chunk: Bytes, now: Instant) {
        if self.opened_at.is_none() {
            self.opened_at = Some(now);
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        self.last_write_at = now;
    }

    /// Concatenate and remove everything buffered so far
    pub fn drain(&mut self, now: Instant) -> Bytes {
        let payload = match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.pop().unwrap_or_default(),
            _ => {
                let mut joined = BytesMut::with_capacity(self.total_bytes);
                for chunk in self.chunks.drain(..) {
                    joined.extend_from_slice(&chunk);
                }
                joined.freeze()
            }
        };

        self.chunks.clear();
        self.total_bytes = 0;
        self.opened_at = None;
        self.last_write_at = now;

        payload
    }

    /// Put a drained payload back in front of anything appended since
    ///
    /// `opened_at` is the value the buffer had before the drain, so the time
    /// trigger keeps counting from the oldest byte.
    pub fn restore(&mut self, payload: Bytes, opened_at: Option<Instant>) {
        if payload.is_empty() {
            return;
        }
        self.total_bytes += payload.len();
        self.chunks.insert(0, payload);
        self.opened_at = match (opened_at, self.opened_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn last_write_at(&self) -> Instant {
        self.last_write_at
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }
}
