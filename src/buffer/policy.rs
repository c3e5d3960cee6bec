use std::time::Duration;
use tokio::time::Instant;

use super::chunk::ChunkBuffer;

pub const DEFAULT_FLUSH_SIZE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Decides when a session buffer should be flushed to storage
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    /// Flush once buffered bytes exceed this
    pub max_buffered_bytes: usize,
    /// Flush once the oldest unflushed chunk is older than this
    pub max_buffer_age: Duration,
}

impl FlushPolicy {
    pub fn new(max_buffered_bytes: usize, max_buffer_age: Duration) -> Self {
        Self {
            max_buffered_bytes,
            max_buffer_age,
        }
    }

    pub fn should_flush(&self, buffer: &ChunkBuffer, now: Instant) -> bool {
        if buffer.is_empty() {
            return false;
        }
        self.size_exceeded(buffer) || self.age_exceeded(buffer, now)
    }

    fn size_exceeded(&self, buffer: &ChunkBuffer) -> bool {
        buffer.total_bytes() > self.max_buffered_bytes
    }

    // Measured from the first chunk since the last drain, not the last write:
    // a steady stream of chunks must not hold the age trigger off forever.
    fn age_exceeded(&self, buffer: &ChunkBuffer, now: Instant) -> bool {
        buffer
            .opened_at()
            .map(|opened| now.saturating_duration_since(opened) > self.max_buffer_age)
            .unwrap_or(false)
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_SIZE_BYTES, DEFAULT_FLUSH_INTERVAL)
    }
}
