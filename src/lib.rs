pub mod buffer;
pub mod config;
pub mod http;
pub mod lookup;
pub mod protocol;
pub mod session;
pub mod speech;
pub mod storage;

pub use buffer::{ChunkBuffer, FlushPolicy, SessionRegistry, SessionStatus};
pub use config::Config;
pub use http::{create_router, AppState};
pub use lookup::{FileSessionLookup, InMemorySessionLookup, InterviewRecord, SessionLookup};
pub use protocol::{Connection, Dispatch, OutboundMessage, ProtocolError, SessionContext};
pub use session::{AckKind, FlushReport, PipelineConfig, SessionPipeline};
pub use speech::{
    DisabledSynthesizer, HttpSpeechSynthesizer, SpeechSynthesizer, SpeechSynthesizerFactory,
};
pub use storage::{
    BlobUploader, InMemoryObjectStore, LocalFsObjectStore, ObjectStore, ObjectStoreFactory,
    UploadError, UploadPolicy,
};
