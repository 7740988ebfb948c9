use crate::{AnalysisStatus, PollTicket, VideoId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The environment selected a video, or cleared the selection.
    VideoSelected(Option<VideoId>),
    /// User asked to cancel the running analysis.
    CancelClicked,
    /// User asked to resume monitoring after a terminal status.
    RetryRequested,
    /// The poll timer armed under `ticket` fired.
    PollDue { ticket: PollTicket },
    /// Engine finished a progress request issued under `ticket`.
    ProgressReceived {
        ticket: PollTicket,
        outcome: PollOutcome,
    },
    /// Engine finished the best-effort cancel request for `video_id`.
    CancelFinished {
        video_id: VideoId,
        outcome: CancelOutcome,
    },
    /// The owning view is going away.
    Shutdown,
}

/// Result of a single progress request, already mapped out of wire types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Reported { percent: u8, status: AnalysisStatus },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Accepted,
    Failed { message: String },
}
