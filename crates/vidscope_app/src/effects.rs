use std::io;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use vidscope_core::{AnalysisStatus, CancelOutcome, Effect, Msg, Notice, PollOutcome};
use vidscope_engine::{EngineEvent, EngineHandle, JobService, JobStatus};

/// Carries out core effects on the engine and turns engine events back into
/// core messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(service: Arc<dyn JobService>) -> io::Result<Self> {
        Ok(Self {
            engine: EngineHandle::new(service)?,
        })
    }

    /// Runs one effect. Notices are handed back for the presentation layer.
    pub fn run(&self, effect: Effect) -> Option<Notice> {
        match effect {
            Effect::SchedulePoll { ticket, delay } => {
                self.engine.arm_poll_timer(ticket, delay);
                None
            }
            Effect::StopPolling => {
                self.engine.disarm_poll_timer();
                None
            }
            Effect::FetchProgress { ticket, video_id } => {
                engine_debug!("FetchProgress ticket={} video_id={}", ticket, video_id);
                self.engine.fetch_progress(ticket, video_id);
                None
            }
            Effect::RequestCancel { video_id } => {
                self.engine.request_cancel(video_id);
                None
            }
            Effect::Notify(notice) => Some(notice),
        }
    }

    pub fn recv_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(map_event)
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::PollDue { ticket } => Msg::PollDue { ticket },
        EngineEvent::ProgressFetched {
            ticket,
            video_id,
            result,
        } => {
            let outcome = match result {
                Ok(report) => PollOutcome::Reported {
                    percent: report.percent,
                    status: map_status(&report.status),
                },
                Err(err) => {
                    engine_warn!("Progress request for video {} failed: {}", video_id, err);
                    PollOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            };
            Msg::ProgressReceived { ticket, outcome }
        }
        EngineEvent::CancelFinished { video_id, result } => {
            let outcome = match result {
                Ok(()) => CancelOutcome::Accepted,
                Err(err) => {
                    engine_warn!("Cancel request for video {} failed: {}", video_id, err);
                    CancelOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            };
            Msg::CancelFinished { video_id, outcome }
        }
    }
}

/// Labels the monitor does not act on (`Pending`, `Running`, `Cancelling`, ...)
/// mean the job is still going.
fn map_status(status: &JobStatus) -> AnalysisStatus {
    match status {
        JobStatus::Completed => AnalysisStatus::Completed,
        JobStatus::Error => AnalysisStatus::Error,
        JobStatus::Cancelled => AnalysisStatus::Cancelled,
        JobStatus::Analyzing | JobStatus::Other(_) => AnalysisStatus::Analyzing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidscope_engine::{ApiError, ProgressReport};

    #[test]
    fn unknown_labels_keep_polling() {
        assert_eq!(
            map_status(&JobStatus::Other("Cancelling".into())),
            AnalysisStatus::Analyzing
        );
        assert_eq!(map_status(&JobStatus::Cancelled), AnalysisStatus::Cancelled);
    }

    #[test]
    fn progress_events_map_to_poll_outcomes() {
        let msg = map_event(EngineEvent::ProgressFetched {
            ticket: 4,
            video_id: "v1".into(),
            result: Ok(ProgressReport {
                percent: 100,
                status: JobStatus::Completed,
            }),
        });
        assert_eq!(
            msg,
            Msg::ProgressReceived {
                ticket: 4,
                outcome: PollOutcome::Reported {
                    percent: 100,
                    status: AnalysisStatus::Completed,
                },
            }
        );
    }

    #[test]
    fn failed_cancel_keeps_error_text() {
        let err: Result<(), ApiError> = Err(ApiError {
            kind: vidscope_engine::FailureKind::HttpStatus(500),
            message: "500 Internal Server Error".into(),
        });
        let msg = map_event(EngineEvent::CancelFinished {
            video_id: "v1".into(),
            result: err,
        });
        assert_eq!(
            msg,
            Msg::CancelFinished {
                video_id: "v1".into(),
                outcome: CancelOutcome::Failed {
                    message: "http status 500: 500 Internal Server Error".into(),
                },
            }
        );
    }
}
