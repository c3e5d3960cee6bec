use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::buffer::FlushPolicy;
use crate::storage::UploadPolicy;

/// Environment overrides use this prefix: `RECORDER__UPLOAD__TIMEOUT_SECS=10`
pub const ENV_PREFIX: &str = "RECORDER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub buffer: BufferConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub sessions: SessionsConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BufferConfig {
    /// Flush once a session buffers more than this many bytes
    pub flush_size_bytes: usize,
    /// Flush once the oldest unflushed chunk is older than this
    pub flush_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Keep a failed flush's bytes in the session buffer instead of dropping them
    pub rebuffer_on_failure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Root directory for the `local` backend
    pub root: PathBuf,
    pub content_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// JSON catalog of known sessions and their questions
    pub catalog_path: PathBuf,
}

/// Text-to-speech service for `read` messages
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Empty disables synthesis; set via `RECORDER__SPEECH__API_KEY`
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub encoding: String,
    pub container: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load from `path` (extension optional, file optional) plus environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "interview-recorder")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 3000_i64)?
            .set_default("buffer.flush_size_bytes", 5_i64 * 1024 * 1024)?
            .set_default("buffer.flush_interval_secs", 5_i64)?
            .set_default("upload.timeout_secs", 30_i64)?
            .set_default("upload.max_retries", 0_i64)?
            .set_default("upload.retry_backoff_ms", 500_i64)?
            .set_default("upload.rebuffer_on_failure", false)?
            .set_default("storage.backend", "local")?
            .set_default("storage.root", "./recordings")?
            .set_default("storage.content_type", "video/mp4")?
            .set_default("sessions.catalog_path", "config/sessions.json")?
            .set_default("speech.api_key", "")?
            .set_default("speech.base_url", "https://api.deepgram.com")?
            .set_default("speech.model", "aura-asteria-en")?
            .set_default("speech.encoding", "linear16")?
            .set_default("speech.container", "wav")?
            .set_default("speech.timeout_secs", 30_i64)?)
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy::new(
            self.buffer.flush_size_bytes,
            Duration::from_secs(self.buffer.flush_interval_secs),
        )
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            timeout: Duration::from_secs(self.upload.timeout_secs),
            max_retries: self.upload.max_retries,
            retry_backoff: Duration::from_millis(self.upload.retry_backoff_ms),
            content_type: self.storage.content_type.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
