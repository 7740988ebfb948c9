use std::time::Duration;

use crate::{AnalysisStatus, FailureKind, PollTicket, VideoId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Arm the single poll timer. Replaces any timer that is still armed.
    SchedulePoll { ticket: PollTicket, delay: Duration },
    /// Disarm the poll timer if one is armed.
    StopPolling,
    FetchProgress { ticket: PollTicket, video_id: VideoId },
    RequestCancel { video_id: VideoId },
    Notify(Notice),
}

/// User-facing notifications. The presentation layer decides how to show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Emitted once per transition into a terminal status.
    Terminal {
        video_id: VideoId,
        status: AnalysisStatus,
        failure: Option<FailureKind>,
    },
    /// The cancel request failed; local status still reads `Cancelled`.
    CancelRequestFailed { video_id: VideoId, message: String },
}
