use crate::buffer::FlushPolicy;
use crate::config::Config;

/// Configuration for the session pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// When buffered video is flushed to storage
    pub flush_policy: FlushPolicy,

    /// On upload failure, keep the drained bytes at the front of the buffer
    /// so the next flush carries them. Default: false (bytes are dropped)
    pub rebuffer_on_failure: bool,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            flush_policy: config.flush_policy(),
            rebuffer_on_failure: config.upload.rebuffer_on_failure,
        }
    }
}
