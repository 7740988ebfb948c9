use std::fmt;
use std::time::Duration;

use crate::view_model::MonitorView;
use crate::PollPolicy;

pub type VideoId = String;

/// Generation number of one polling cycle. Timers and responses carry the
/// ticket they were issued under so stale ones can be told apart.
pub type PollTicket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Analyzing,
    Completed,
    Cancelled,
    Error,
}

impl AnalysisStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed | AnalysisStatus::Cancelled | AnalysisStatus::Error
        )
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnalysisStatus::Idle => "Idle",
            AnalysisStatus::Analyzing => "Analyzing",
            AnalysisStatus::Completed => "Completed",
            AnalysisStatus::Cancelled => "Cancelled",
            AnalysisStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Why the monitor ended up in `Error`. Both kinds show the same status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The progress request itself failed.
    Transport { message: String },
    /// The service reported the job as failed.
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelConfirmation {
    #[default]
    NotRequested,
    Pending,
    Confirmed,
    Failed,
}

/// Where the poll loop currently is. Anything but `Stopped` means polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollSlot {
    #[default]
    Stopped,
    /// Timer armed; the request goes out when it fires.
    Scheduled(PollTicket),
    /// Request sent; waiting for the response.
    InFlight(PollTicket),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonitorState {
    video_id: Option<VideoId>,
    percent: u8,
    status: AnalysisStatus,
    slot: PollSlot,
    ticket: PollTicket,
    last_failure: Option<FailureKind>,
    cancel: CancelConfirmation,
    unchanged_polls: u32,
    policy: PollPolicy,
    dirty: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PollPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn view(&self) -> MonitorView {
        MonitorView {
            video_id: self.video_id.clone(),
            percent: self.percent,
            status: self.status,
            polling: self.is_polling(),
            last_failure: self.last_failure.clone(),
            cancel: self.cancel,
            dirty: self.dirty,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn is_polling(&self) -> bool {
        self.slot != PollSlot::Stopped
    }

    pub fn slot(&self) -> PollSlot {
        self.slot
    }

    pub fn ticket(&self) -> PollTicket {
        self.ticket
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Returns whether state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn cancel_confirmation(&self) -> CancelConfirmation {
        self.cancel
    }

    /// Clears everything tied to the previous video and invalidates its ticket.
    pub(crate) fn reset_for(&mut self, video_id: Option<VideoId>) {
        self.video_id = video_id;
        self.percent = 0;
        self.status = AnalysisStatus::Idle;
        self.slot = PollSlot::Stopped;
        self.last_failure = None;
        self.cancel = CancelConfirmation::NotRequested;
        self.unchanged_polls = 0;
        self.ticket += 1;
        self.dirty = true;
    }

    /// Enters `Analyzing` under a fresh ticket and returns it.
    pub(crate) fn begin_polling(&mut self) -> PollTicket {
        self.ticket += 1;
        self.status = AnalysisStatus::Analyzing;
        self.slot = PollSlot::Scheduled(self.ticket);
        self.last_failure = None;
        self.cancel = CancelConfirmation::NotRequested;
        self.unchanged_polls = 0;
        self.dirty = true;
        self.ticket
    }

    pub(crate) fn mark_in_flight(&mut self, ticket: PollTicket) {
        self.slot = PollSlot::InFlight(ticket);
    }

    /// Records a non-terminal report and re-arms the loop. Returns the delay
    /// before the next request.
    pub(crate) fn apply_progress(&mut self, ticket: PollTicket, percent: u8) -> Duration {
        if percent == self.percent {
            self.unchanged_polls = self.unchanged_polls.saturating_add(1);
        } else {
            self.unchanged_polls = 0;
            self.percent = percent;
            self.dirty = true;
        }
        self.slot = PollSlot::Scheduled(ticket);
        self.policy.next_delay(self.unchanged_polls)
    }

    /// Moves to a terminal status and stops the loop.
    pub(crate) fn finish(&mut self, status: AnalysisStatus, failure: Option<FailureKind>) {
        self.status = status;
        self.slot = PollSlot::Stopped;
        self.last_failure = failure;
        self.ticket += 1;
        self.dirty = true;
    }

    pub(crate) fn set_percent(&mut self, percent: u8) {
        if self.percent != percent {
            self.percent = percent;
            self.dirty = true;
        }
    }

    pub(crate) fn set_cancel(&mut self, cancel: CancelConfirmation) {
        if self.cancel != cancel {
            self.cancel = cancel;
            self.dirty = true;
        }
    }
}
