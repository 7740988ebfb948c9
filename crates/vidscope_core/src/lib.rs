//! Vidscope core: pure progress-monitor state machine and view-model helpers.
mod effect;
mod msg;
mod policy;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Notice};
pub use msg::{CancelOutcome, Msg, PollOutcome};
pub use policy::{PollPolicy, StallBackoff};
pub use state::{
    AnalysisStatus, CancelConfirmation, FailureKind, MonitorState, PollSlot, PollTicket, VideoId,
};
pub use update::update;
pub use view_model::MonitorView;
