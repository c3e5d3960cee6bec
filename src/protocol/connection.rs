use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::ProtocolError;
use super::messages::{decode_video_payload, InboundMessage, OutboundMessage};
use crate::session::{AckKind, SessionPipeline};
use crate::speech::SpeechSynthesizer;

pub const END_MESSAGE: &str = "Interview ended successfully";

/// Immutable per-connection context attached at upgrade time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    /// Interview questions in asking order
    pub questions: Vec<String>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            questions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Closed,
}

/// What the socket loop should do after a message was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send the reply, keep reading
    Reply(OutboundMessage),
    /// Send the reply, then close the socket
    Close(OutboundMessage),
    /// Nothing to send
    Ignore,
}

/// Protocol state for one client connection
///
/// Messages must be handed in one at a time, in arrival order. The socket
/// task owns the `Connection` and awaits each handler before reading the
/// next frame.
pub struct Connection {
    context: SessionContext,
    pipeline: Arc<SessionPipeline>,
    speech: Arc<dyn SpeechSynthesizer>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(
        context: SessionContext,
        pipeline: Arc<SessionPipeline>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        info!("Client connected with session {}", context.session_id);

        Self {
            context,
            pipeline,
            speech,
            state: ConnectionState::Active,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handle a text frame carrying a JSON envelope
    pub async fn handle_text(&mut self, text: &str) -> Dispatch {
        if self.state == ConnectionState::Closed {
            debug!("Ignoring message on closed session {}", self.context.session_id);
            return Dispatch::Ignore;
        }

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => return self.reject(e),
        };

        match message.kind.as_str() {
            "start" => Dispatch::Reply(OutboundMessage::start(&self.context.questions)),
            "read" => self.read(&message.data).await,
            "video" => match decode_video_payload(&message.data) {
                Ok(chunk) => self.video(chunk).await,
                Err(e) => self.reject(e),
            },
            "end" => self.end().await,
            other => {
                debug!("Unknown message type {:?}", other);
                self.reject(ProtocolError::UnknownMessageType)
            }
        }
    }

    /// Handle a binary frame; its bytes are one video chunk
    pub async fn handle_binary(&mut self, chunk: Bytes) -> Dispatch {
        if self.state == ConnectionState::Closed {
            return Dispatch::Ignore;
        }
        self.video(chunk).await
    }

    /// Tear down after the socket went away
    ///
    /// Without a prior `end` this runs the same cleanup: a best-effort final
    /// flush, then the session is freed. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;

        warn!(
            "Client disconnected from session {} without ending it",
            self.context.session_id
        );
        self.pipeline.on_end(&self.context.session_id).await;
    }

    async fn video(&mut self, chunk: Bytes) -> Dispatch {
        match self.pipeline.on_chunk(&self.context.session_id, chunk).await {
            AckKind::Rejected => self.reject(ProtocolError::SessionClosed),
            ack => Dispatch::Reply(OutboundMessage::acknowledge(ack.message())),
        }
    }

    async fn end(&mut self) -> Dispatch {
        self.pipeline.on_end(&self.context.session_id).await;
        self.state = ConnectionState::Closed;
        Dispatch::Close(OutboundMessage::end(END_MESSAGE))
    }

    async fn read(&self, data: &Value) -> Dispatch {
        let text = match data.as_str() {
            Some(text) if !text.trim().is_empty() => text,
            _ => return self.reject(ProtocolError::MissingText),
        };

        match self.speech.synthesize(text).await {
            Ok(wav) => Dispatch::Reply(OutboundMessage::audio(&wav)),
            Err(e) => {
                warn!("Text-to-speech via {} failed: {}", self.speech.name(), e);
                self.reject(ProtocolError::SpeechFailure)
            }
        }
    }

    fn reject(&self, error: ProtocolError) -> Dispatch {
        warn!("Session {}: {}", self.context.session_id, error);
        Dispatch::Reply(OutboundMessage::error(error.to_string()))
    }
}
