use serde::Serialize;

use crate::protocol::ProtocolError;

/// Outcome of handing one video chunk to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AckKind {
    /// Buffered, no flush yet
    Received,

    /// Flush triggered and the upload succeeded
    Stored { sequence: u64 },

    /// Flush triggered but the upload failed
    Failed { sequence: u64, reason: String },

    /// Not buffered: the session was already ended or the service is
    /// shutting down
    Rejected,
}

impl AckKind {
    /// Text sent back to the client in the acknowledgment envelope
    pub fn message(&self) -> String {
        match self {
            Self::Received => "Video chunk received".to_string(),
            Self::Stored { .. } => "Video chunk processed and stored".to_string(),
            Self::Failed { sequence, reason } => ProtocolError::UploadFailure {
                sequence: *sequence,
                reason: reason.clone(),
            }
            .to_string(),
            Self::Rejected => ProtocolError::SessionClosed.to_string(),
        }
    }
}

/// Result of a single flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub sequence: u64,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlushReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl From<FlushReport> for AckKind {
    fn from(report: FlushReport) -> Self {
        match report.error {
            None => Self::Stored {
                sequence: report.sequence,
            },
            Some(reason) => Self::Failed {
                sequence: report.sequence,
                reason,
            },
        }
    }
}
