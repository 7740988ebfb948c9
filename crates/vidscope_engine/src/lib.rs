//! Vidscope engine: HTTP client for the analysis service and monitor I/O.
mod client;
mod engine;
mod timer;
mod types;
mod upload;

pub use client::{ApiClient, ClientSettings, JobService};
pub use engine::EngineHandle;
pub use timer::PollTimer;
pub use types::{
    ApiError, DetectedObject, EngineEvent, FailureKind, FrameMatch, JobStatus, PollTicket,
    ProgressReport, QueryOutcome, Timeframe, UploadReceipt, VideoId, VideoSummary,
};
pub use upload::{upload_percent, UploadProgressSink};
