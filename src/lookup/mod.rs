//! Session lookup
//!
//! Resolves the `sessionId` of an upgrade request to the interview it
//! belongs to. An unknown session and a failed lookup are told apart here
//! but look the same to the client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{info, warn};

/// What the recorder needs to know about a valid session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewRecord {
    /// Questions in the order they are asked
    #[serde(default)]
    pub questions: Vec<String>,
}

#[async_trait::async_trait]
pub trait SessionLookup: Send + Sync {
    /// The interview for `session_id`, None if it is unknown, or an error
    /// when the catalog could not answer
    async fn lookup(&self, session_id: &str) -> Result<Option<InterviewRecord>>;
}

/// Session catalog held in memory
#[derive(Debug, Default)]
pub struct InMemorySessionLookup {
    sessions: RwLock<HashMap<String, InterviewRecord>>,
}

impl InMemorySessionLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: HashMap<String, InterviewRecord>) -> Self {
        Self {
            sessions: RwLock::new(sessions),
        }
    }

    pub fn insert(&self, session_id: impl Into<String>, record: InterviewRecord) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.into(), record);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SessionLookup for InMemorySessionLookup {
    async fn lookup(&self, session_id: &str) -> Result<Option<InterviewRecord>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("session catalog lock poisoned"))?;
        Ok(sessions.get(session_id).cloned())
    }
}

/// Session catalog loaded from a JSON file at startup
///
/// ```json
/// { "<sessionId>": { "questions": ["Tell me about yourself", "..."] } }
/// ```
pub struct FileSessionLookup;

impl FileSessionLookup {
    pub fn load(path: impl AsRef<Path>) -> Result<InMemorySessionLookup> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session catalog: {:?}", path))?;

        let sessions: HashMap<String, InterviewRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse session catalog: {:?}", path))?;

        info!("Loaded {} sessions from {:?}", sessions.len(), path);

        Ok(InMemorySessionLookup::with_sessions(sessions))
    }

    /// Like `load`, but a missing file yields an empty catalog
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<InMemorySessionLookup> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No session catalog at {:?}, every session will be rejected", path);
            return Ok(InMemorySessionLookup::new());
        }
        Self::load(path)
    }
}
