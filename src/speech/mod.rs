//! Text-to-speech for question narration
//!
//! The recorder only forwards text and relays the audio back to the client;
//! synthesis itself is provided by an external service.

pub mod http;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SpeechConfig;

pub use http::HttpSpeechSynthesizer;

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into a complete audio file (WAV)
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Synthesizer name for logging
    fn name(&self) -> &str;
}

/// Synthesizer used when no TTS service is configured; every request fails
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for DisabledSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        anyhow::bail!("speech synthesis is not configured")
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

pub struct SpeechSynthesizerFactory;

impl SpeechSynthesizerFactory {
    /// HTTP synthesizer when an API key is configured, otherwise disabled
    pub fn create(config: &SpeechConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
        if config.api_key.trim().is_empty() {
            warn!("No speech API key configured, read requests will fail");
            return Ok(Arc::new(DisabledSynthesizer));
        }

        let synthesizer = HttpSpeechSynthesizer::new(config)?;
        info!(
            "Speech synthesis via {} (model {})",
            config.base_url, config.model
        );
        Ok(Arc::new(synthesizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech_config(api_key: &str) -> SpeechConfig {
        SpeechConfig {
            api_key: api_key.to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            model: "aura-asteria-en".to_string(),
            encoding: "linear16".to_string(),
            container: "wav".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_factory_without_key_is_disabled() -> Result<()> {
        assert_eq!(SpeechSynthesizerFactory::create(&speech_config(""))?.name(), "disabled");
        assert_eq!(SpeechSynthesizerFactory::create(&speech_config("  "))?.name(), "disabled");
        Ok(())
    }

    #[test]
    fn test_factory_with_key_uses_http() -> Result<()> {
        assert_eq!(SpeechSynthesizerFactory::create(&speech_config("secret"))?.name(), "http");
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_synthesizer_fails() {
        assert!(DisabledSynthesizer.synthesize("hello").await.is_err());
    }
}
