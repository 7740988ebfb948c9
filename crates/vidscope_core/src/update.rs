use crate::{
    AnalysisStatus, CancelConfirmation, CancelOutcome, Effect, FailureKind, MonitorState, Msg,
    Notice, PollOutcome, PollSlot,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: MonitorState, msg: Msg) -> (MonitorState, Vec<Effect>) {
    let effects = match msg {
        Msg::VideoSelected(next) => {
            // Reselecting the current video must not restart the loop or drop percent.
            if next.as_deref() == state.video_id() {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(2);
            if state.is_polling() {
                effects.push(Effect::StopPolling);
            }
            let selected = next.is_some();
            state.reset_for(next);
            if selected {
                let ticket = state.begin_polling();
                effects.push(Effect::SchedulePoll {
                    ticket,
                    delay: state.policy().initial_delay,
                });
            }
            effects
        }
        Msg::CancelClicked => {
            if state.status() != AnalysisStatus::Analyzing {
                return (state, Vec::new());
            }
            let Some(video_id) = state.video_id().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            state.finish(AnalysisStatus::Cancelled, None);
            state.set_cancel(CancelConfirmation::Pending);
            vec![
                Effect::StopPolling,
                Effect::RequestCancel {
                    video_id: video_id.clone(),
                },
                Effect::Notify(Notice::Terminal {
                    video_id,
                    status: AnalysisStatus::Cancelled,
                    failure: None,
                }),
            ]
        }
        Msg::RetryRequested => {
            if !state.status().is_terminal() || state.video_id().is_none() {
                return (state, Vec::new());
            }
            let ticket = state.begin_polling();
            vec![Effect::SchedulePoll {
                ticket,
                delay: state.policy().initial_delay,
            }]
        }
        Msg::PollDue { ticket } => {
            if state.slot() != PollSlot::Scheduled(ticket) {
                return (state, Vec::new());
            }
            let Some(video_id) = state.video_id().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            state.mark_in_flight(ticket);
            vec![Effect::FetchProgress { ticket, video_id }]
        }
        Msg::ProgressReceived { ticket, outcome } => {
            // Anything not answering the request we are waiting on is stale.
            if state.slot() != PollSlot::InFlight(ticket) {
                return (state, Vec::new());
            }
            let Some(video_id) = state.video_id().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            match outcome {
                PollOutcome::Reported { percent, status } => {
                    let percent = percent.min(100);
                    if status.is_terminal() {
                        let failure =
                            (status == AnalysisStatus::Error).then_some(FailureKind::Remote);
                        state.set_percent(percent);
                        state.finish(status, failure.clone());
                        vec![Effect::Notify(Notice::Terminal {
                            video_id,
                            status,
                            failure,
                        })]
                    } else {
                        let delay = state.apply_progress(ticket, percent);
                        vec![Effect::SchedulePoll { ticket, delay }]
                    }
                }
                PollOutcome::Failed { message } => {
                    let failure = FailureKind::Transport { message };
                    state.finish(AnalysisStatus::Error, Some(failure.clone()));
                    vec![Effect::Notify(Notice::Terminal {
                        video_id,
                        status: AnalysisStatus::Error,
                        failure: Some(failure),
                    })]
                }
            }
        }
        Msg::CancelFinished { video_id, outcome } => {
            let tracked = state.video_id() == Some(video_id.as_str())
                && state.cancel_confirmation() == CancelConfirmation::Pending;
            match outcome {
                CancelOutcome::Accepted => {
                    if tracked {
                        state.set_cancel(CancelConfirmation::Confirmed);
                    }
                    Vec::new()
                }
                CancelOutcome::Failed { message } => {
                    if tracked {
                        state.set_cancel(CancelConfirmation::Failed);
                    }
                    vec![Effect::Notify(Notice::CancelRequestFailed { video_id, message })]
                }
            }
        }
        Msg::Shutdown => {
            let effects = if state.is_polling() {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            };
            state.reset_for(None);
            effects
        }
    };

    (state, effects)
}
