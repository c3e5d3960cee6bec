//! Client protocol over the WebSocket
//!
//! Every frame is a JSON envelope `{"type": ..., "data": ...}` in both
//! directions. Client message types:
//! - `start` - reply with the interview questions
//! - `read` - reply with synthesized audio for `data`
//! - `video` - buffer `data` as a video chunk, reply with an acknowledgment
//! - `end` - flush and free the session, reply `end`, close the socket
//!
//! Binary frames are taken as raw `video` chunks.

pub mod connection;
pub mod error;
pub mod messages;

pub use connection::{Connection, ConnectionState, Dispatch, SessionContext, END_MESSAGE};
pub use error::ProtocolError;
pub use messages::{decode_video_payload, InboundMessage, OutboundKind, OutboundMessage};
