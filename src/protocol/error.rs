use thiserror::Error;

/// Errors a connection reports back to its client
///
/// `Display` is the exact text placed in the `data` of the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Upgrade without a `sessionId` query parameter
    #[error("Please provide a sessionId parameter")]
    MissingSession,

    /// Upgrade for a session the lookup does not know
    #[error("Invalid sessionId")]
    InvalidSession,

    /// The lookup itself failed; clients see the same text as for an
    /// unknown session
    #[error("Invalid sessionId")]
    LookupFailure,

    /// Text frame is not valid JSON
    #[error("Failed to parse message")]
    Unparseable,

    /// JSON without the required `type` and `data` fields
    #[error("Invalid message format")]
    MalformedMessage,

    #[error("Unknown message type")]
    UnknownMessageType,

    /// `video` message whose `data` is not a byte payload
    #[error("Failed to process video data")]
    InvalidPayload,

    /// `read` message without text
    #[error("Text is required")]
    MissingText,

    #[error("Failed to convert text to speech")]
    SpeechFailure,

    /// Chunk for a session that was torn down
    #[error("Session has ended")]
    SessionClosed,

    /// Flush triggered but the part never reached storage
    #[error("Failed to store video part {sequence}: {reason}")]
    UploadFailure { sequence: u64, reason: String },
}
