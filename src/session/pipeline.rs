use bytes::Bytes;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::ack::{AckKind, FlushReport};
use super::config::PipelineConfig;
use crate::buffer::{SessionEntry, SessionRegistry};
use crate::storage::BlobUploader;

/// Buffers incoming video per session and flushes it to object storage
///
/// Every operation on a session runs under that session's registry lock, from
/// the append through the upload. A second chunk for the same session waits
/// until the previous flush has finished, so part `n + 1` is never started
/// before part `n` completes.
pub struct SessionPipeline {
    registry: Arc<SessionRegistry>,
    uploader: BlobUploader,
    config: PipelineConfig,
}

impl SessionPipeline {
    pub fn new(registry: Arc<SessionRegistry>, uploader: BlobUploader, config: PipelineConfig) -> Self {
        info!(
            "Session pipeline: flush at {} bytes or {:?}, upload timeout {:?}, retries {}",
            config.flush_policy.max_buffered_bytes,
            config.flush_policy.max_buffer_age,
            uploader.policy().timeout,
            uploader.policy().max_retries
        );

        Self {
            registry,
            uploader,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn uploader(&self) -> &BlobUploader {
        &self.uploader
    }

    /// Buffer one chunk and flush if the policy says so
    ///
    /// Chunks for a session that has already been ended, or that would start
    /// a new session after shutdown began, are rejected rather than starting
    /// over at part 0.
    pub async fn on_chunk(&self, session_id: &str, chunk: Bytes) -> AckKind {
        let Some(entry) = self.registry.entry(session_id).await else {
            warn!("Rejected chunk for session {}: shutting down", session_id);
            return AckKind::Rejected;
        };
        let mut entry = entry.lock().await;
        if entry.is_ended() {
            warn!("Rejected chunk for session {}: already ended", session_id);
            return AckKind::Rejected;
        }

        let now = Instant::now();
        let buffer = entry.append(chunk, now);
        if !self.config.flush_policy.should_flush(buffer, now) {
            return AckKind::Received;
        }

        self.flush(session_id, &mut entry).await.into()
    }

    /// Flush whatever is left and forget the session
    ///
    /// The registry entry is removed even when the final upload fails. Calling
    /// this for a session that is already gone does nothing.
    pub async fn on_end(&self, session_id: &str) -> Option<FlushReport> {
        let entry = self.registry.get(session_id).await?;

        let report = {
            let mut entry = entry.lock().await;
            if entry.is_ended() {
                return None;
            }
            let report = if entry.buffer().is_empty() {
                None
            } else {
                Some(self.flush(session_id, &mut entry).await)
            };
            entry.mark_ended();
            report
        };

        self.registry.remove(session_id).await;

        match &report {
            Some(report) if report.succeeded() => info!(
                "Session {} ended, final part {} ({} bytes) stored",
                session_id, report.sequence, report.bytes
            ),
            Some(report) => warn!(
                "Session {} ended, final part {} ({} bytes) lost",
                session_id, report.sequence, report.bytes
            ),
            None => info!("Session {} ended with nothing left to flush", session_id),
        }

        report
    }

    /// End every live session and refuse new ones, e.g. on shutdown
    pub async fn end_all(&self) -> Vec<(String, Option<FlushReport>)> {
        self.registry.close().await;

        let mut results = Vec::new();
        for session_id in self.registry.session_ids().await {
            let report = self.on_end(&session_id).await;
            results.push((session_id, report));
        }
        results
    }

    // Caller holds the session lock for the whole call.
    async fn flush(&self, session_id: &str, entry: &mut SessionEntry) -> FlushReport {
        let sequence = entry.next_sequence();
        let opened_at = entry.buffer().opened_at();
        let payload = entry.drain(Instant::now());
        let bytes = payload.len();

        info!(
            "Flushing session {} part {} ({} bytes)",
            session_id, sequence, bytes
        );

        let result = self.uploader.upload(session_id, sequence, &payload).await;
        entry.record_flush(result.is_ok());

        match result {
            Ok(()) => FlushReport {
                sequence,
                bytes,
                error: None,
            },
            Err(e) => {
                error!("Failed to flush session {} part {}: {}", session_id, sequence, e);
                if self.config.rebuffer_on_failure {
                    entry.restore(payload, opened_at);
                }
                FlushReport {
                    sequence,
                    bytes,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
