//! Per-session video buffering
//!
//! - `ChunkBuffer` accumulates chunks between flushes
//! - `FlushPolicy` decides when a buffer goes to storage (size or age)
//! - `SessionRegistry` maps live session ids to their buffer and sequence counter

pub mod chunk;
pub mod policy;
pub mod registry;

pub use chunk::ChunkBuffer;
pub use policy::FlushPolicy;
pub use registry::{SessionEntry, SessionRegistry, SessionStats, SessionStatus};
