use crate::{AnalysisStatus, CancelConfirmation, FailureKind, VideoId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonitorView {
    pub video_id: Option<VideoId>,
    pub percent: u8,
    pub status: AnalysisStatus,
    pub polling: bool,
    pub last_failure: Option<FailureKind>,
    pub cancel: CancelConfirmation,
    pub dirty: bool,
}

impl MonitorView {
    /// Cancel is only offered while a job is being polled.
    pub fn can_cancel(&self) -> bool {
        self.status == AnalysisStatus::Analyzing
    }

    /// Status line as shown next to the progress bar.
    pub fn status_line(&self) -> String {
        match (&self.video_id, self.status) {
            (None, _) => "Select a video to see analysis progress.".to_string(),
            (Some(_), AnalysisStatus::Idle) => "Analysis Status: Not Started".to_string(),
            (Some(_), AnalysisStatus::Analyzing) => {
                format!("Analysis Status: Analyzing ({}%)", self.percent)
            }
            (Some(_), status) => format!("Analysis Status: {status}"),
        }
    }
}
