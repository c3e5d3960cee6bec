use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::buffer::SessionRegistry;
use crate::config::Config;
use crate::lookup::{FileSessionLookup, SessionLookup};
use crate::session::{PipelineConfig, SessionPipeline};
use crate::speech::{SpeechSynthesizer, SpeechSynthesizerFactory};
use crate::storage::{BlobUploader, ObjectStore, ObjectStoreFactory};

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// Buffering and upload for all live sessions
    pub pipeline: Arc<SessionPipeline>,

    /// Validates `sessionId` on upgrade
    pub lookup: Arc<dyn SessionLookup>,

    /// Narration for `read` messages
    pub speech: Arc<dyn SpeechSynthesizer>,

    /// Cancelled when open sockets must wind down
    pub shutdown: CancellationToken,

    /// Every upgraded socket task
    pub sockets: TaskTracker,
}

impl AppState {
    pub fn new(
        pipeline: Arc<SessionPipeline>,
        lookup: Arc<dyn SessionLookup>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            pipeline,
            lookup,
            speech,
            shutdown: CancellationToken::new(),
            sockets: TaskTracker::new(),
        }
    }

    /// Wire up every component from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ObjectStoreFactory::create(&config.storage)
            .context("Failed to create object store")?;
        let lookup = FileSessionLookup::load_or_empty(&config.sessions.catalog_path)
            .context("Failed to load session catalog")?;
        let speech = SpeechSynthesizerFactory::create(&config.speech)
            .context("Failed to create speech synthesizer")?;

        Ok(Self::new(
            Arc::new(Self::pipeline_for(store, config)),
            Arc::new(lookup),
            speech,
        ))
    }

    pub fn pipeline_for(store: Arc<dyn ObjectStore>, config: &Config) -> SessionPipeline {
        SessionPipeline::new(
            Arc::new(SessionRegistry::new()),
            BlobUploader::new(store, config.upload_policy()),
            PipelineConfig::from(config),
        )
    }

    /// Close every open socket and wait until each has run its cleanup
    ///
    /// Sockets upgraded after this call close right away.
    pub async fn close_sockets(&self) {
        info!("Closing {} open sockets", self.sockets.len());
        self.shutdown.cancel();
        self.sockets.close();
        self.sockets.wait().await;
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.pipeline.uploader().store()
    }
}
