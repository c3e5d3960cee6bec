use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::SpeechSynthesizer;
use crate::config::SpeechConfig;

/// Path of the speak endpoint under the configured base URL
pub const SPEAK_PATH: &str = "/v1/speak";

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

/// Synthesizer backed by a Deepgram-compatible `POST /v1/speak` endpoint
///
/// Voice and output format go in the query string, the text in a JSON body,
/// and the response body is the audio file.
#[derive(Clone)]
pub struct HttpSpeechSynthesizer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    encoding: String,
    container: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build speech HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), SPEAK_PATH),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            encoding: config.encoding.clone(),
            container: config.container.clone(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .query(&[
                ("model", self.model.as_str()),
                ("encoding", self.encoding.as_str()),
                ("container", self.container.as_str()),
            ])
            .json(&SpeakRequest { text })
            .send()
            .await
            .context("Speech request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Speech service returned {}: {}", status, body);
        }

        let audio = response
            .bytes()
            .await
            .context("Failed to read speech audio")?;
        debug!("Synthesized {} chars into {} bytes", text.len(), audio.len());

        Ok(audio.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}
