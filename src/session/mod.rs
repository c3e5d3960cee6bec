//! Session pipeline
//!
//! Drives a session's video from chunk arrival to stored parts:
//! - Append each chunk to the session buffer
//! - Flush to `{session}/{n}.mp4` when the flush policy triggers
//! - Force a final flush and free the session on end

mod ack;
mod config;
mod pipeline;

pub use ack::{AckKind, FlushReport};
pub use config::PipelineConfig;
pub use pipeline::SessionPipeline;
