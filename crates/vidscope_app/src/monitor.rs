use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use vidscope_core::{
    update, AnalysisStatus, CancelConfirmation, FailureKind, Msg, MonitorState, MonitorView,
    Notice, PollPolicy, VideoId,
};

use crate::effects::EffectRunner;

const EVENT_WAIT: Duration = Duration::from_millis(75);

pub trait MonitorRenderer {
    fn render(&mut self, view: &MonitorView);

    fn notice(&mut self, notice: &Notice);

    fn finish(&mut self, _view: &MonitorView) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub video_id: VideoId,
    pub status: AnalysisStatus,
    pub percent: u8,
    pub notices: Vec<Notice>,
    /// Set when the watch was abandoned without a terminal status.
    pub interrupted: bool,
}

/// Drives one monitor through the pure update loop until the watched job
/// settles or the user gives up.
pub struct MonitorSession<R: MonitorRenderer> {
    state: MonitorState,
    runner: EffectRunner,
    renderer: R,
    inbox: Receiver<Msg>,
    notices: Vec<Notice>,
    last_view: MonitorView,
    interrupted: bool,
    transport_retries: u32,
}

impl<R: MonitorRenderer> MonitorSession<R> {
    /// `inbox` carries user input such as `CancelClicked` and `Shutdown`.
    pub fn new(policy: PollPolicy, runner: EffectRunner, renderer: R, inbox: Receiver<Msg>) -> Self {
        let state = MonitorState::with_policy(policy);
        let last_view = state.view();
        Self {
            state,
            runner,
            renderer,
            inbox,
            notices: Vec::new(),
            last_view,
            interrupted: false,
            transport_retries: 0,
        }
    }

    /// Resume polling up to `retries` times after a progress request fails in
    /// transport. Errors reported by the service are never retried.
    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    pub fn watch(mut self, video_id: impl Into<VideoId>) -> MonitorSummary {
        let video_id = video_id.into();
        engine_info!("Watching analysis of video {}", video_id);
        self.dispatch_msg(Msg::VideoSelected(Some(video_id.clone())));

        loop {
            if self.is_settled() {
                if self.resume_after_transport_error() {
                    continue;
                }
                break;
            }
            match self.inbox.try_recv() {
                Ok(Msg::CancelClicked) if !self.last_view.can_cancel() => {
                    self.dispatch_msg(Msg::Shutdown);
                    continue;
                }
                Ok(msg) => {
                    self.dispatch_msg(msg);
                    continue;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }
            if let Some(msg) = self.runner.recv_msg(EVENT_WAIT) {
                self.dispatch_msg(msg);
            }
        }

        self.renderer.finish(&self.last_view);
        MonitorSummary {
            video_id,
            status: self.last_view.status,
            percent: self.last_view.percent,
            notices: self.notices,
            interrupted: self.interrupted,
        }
    }

    fn is_settled(&self) -> bool {
        if self.interrupted || self.state.video_id().is_none() {
            return true;
        }
        self.state.status().is_terminal()
            && self.state.cancel_confirmation() != CancelConfirmation::Pending
    }

    fn resume_after_transport_error(&mut self) -> bool {
        if self.interrupted || self.transport_retries == 0 {
            return false;
        }
        let failed_in_transport = self.last_view.status == AnalysisStatus::Error
            && matches!(self.last_view.last_failure, Some(FailureKind::Transport { .. }));
        if !failed_in_transport {
            return false;
        }
        self.transport_retries -= 1;
        engine_info!(
            "Resuming progress polling; {} retries left",
            self.transport_retries
        );
        self.dispatch_msg(Msg::RetryRequested);
        true
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        if msg == Msg::Shutdown {
            engine_debug!("Shutdown requested; abandoning watch");
            self.interrupted = true;
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;

        if was_dirty && !self.interrupted {
            self.last_view = self.state.view();
            self.renderer.render(&self.last_view);
        }

        for effect in effects {
            if let Some(notice) = self.runner.run(effect) {
                self.renderer.notice(&notice);
                self.notices.push(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc, Mutex};

    use serde_json::json;
    use vidscope_engine::{ApiClient, ClientSettings};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Default, Clone)]
    struct RecordingRenderer {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl MonitorRenderer for RecordingRenderer {
        fn render(&mut self, view: &MonitorView) {
            self.lines.lock().unwrap().push(view.status_line());
        }

        fn notice(&mut self, _notice: &Notice) {}
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(20),
            ..PollPolicy::default()
        }
    }

    fn runner_for(server: &MockServer) -> EffectRunner {
        let client = ApiClient::new(ClientSettings {
            base_url: server.uri(),
            request_timeout: Duration::from_secs(2),
            ..ClientSettings::default()
        })
        .unwrap();
        EffectRunner::new(Arc::new(client)).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watch_follows_job_to_completion() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "progress": 40, "status": "Analyzing" })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "progress": 100, "status": "Completed" })),
            )
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let renderer = RecordingRenderer::default();
        let lines = renderer.lines.clone();
        let (_tx, rx) = mpsc::channel();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, renderer, rx).watch("v1")
        })
        .await
        .unwrap();

        assert_eq!(
            *lines.lock().unwrap(),
            vec![
                "Analysis Status: Analyzing (0%)".to_string(),
                "Analysis Status: Analyzing (40%)".to_string(),
                "Analysis Status: Completed".to_string(),
            ]
        );
        assert_eq!(summary.status, AnalysisStatus::Completed);
        assert_eq!(summary.percent, 100);
        assert!(!summary.interrupted);
        assert_eq!(
            summary.notices,
            vec![Notice::Terminal {
                video_id: "v1".into(),
                status: AnalysisStatus::Completed,
                failure: None,
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_progress_endpoint_ends_in_transport_error() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let (_tx, rx) = mpsc::channel();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, RecordingRenderer::default(), rx).watch("v1")
        })
        .await
        .unwrap();

        assert_eq!(summary.status, AnalysisStatus::Error);
        assert!(matches!(
            summary.notices.as_slice(),
            [Notice::Terminal {
                failure: Some(FailureKind::Transport { .. }),
                ..
            }]
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transport_error_is_retried_when_allowed() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "progress": 100, "status": "Completed" })),
            )
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let (_tx, rx) = mpsc::channel();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, RecordingRenderer::default(), rx)
                .with_transport_retries(1)
                .watch("v1")
        })
        .await
        .unwrap();

        assert_eq!(summary.status, AnalysisStatus::Completed);
        assert!(matches!(
            summary.notices.as_slice(),
            [
                Notice::Terminal {
                    status: AnalysisStatus::Error,
                    failure: Some(FailureKind::Transport { .. }),
                    ..
                },
                Notice::Terminal {
                    status: AnalysisStatus::Completed,
                    ..
                },
            ]
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_error_is_not_retried() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "progress": 70, "status": "Error" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let (_tx, rx) = mpsc::channel();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, RecordingRenderer::default(), rx)
                .with_transport_retries(3)
                .watch("v1")
        })
        .await
        .unwrap();

        assert_eq!(summary.status, AnalysisStatus::Error);
        assert_eq!(summary.notices.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_cancel_is_reported_after_optimistic_stop() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "progress": 10, "status": "Analyzing" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/videos/v1/cancel-analysis"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let (tx, rx) = mpsc::channel();
        tx.send(Msg::CancelClicked).unwrap();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, RecordingRenderer::default(), rx).watch("v1")
        })
        .await
        .unwrap();

        assert_eq!(summary.status, AnalysisStatus::Cancelled);
        assert_eq!(summary.notices.len(), 2);
        assert!(matches!(
            &summary.notices[1],
            Notice::CancelRequestFailed { video_id, .. } if video_id == "v1"
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_abandons_watch() {
        engine_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/v1/analysis-progress"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "progress": 30, "status": "Analyzing" })),
            )
            .mount(&server)
            .await;

        let runner = runner_for(&server);
        let (tx, rx) = mpsc::channel();
        tx.send(Msg::Shutdown).unwrap();
        let summary = tokio::task::spawn_blocking(move || {
            MonitorSession::new(fast_policy(), runner, RecordingRenderer::default(), rx).watch("v1")
        })
        .await
        .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.status, AnalysisStatus::Analyzing);
        assert!(summary.notices.is_empty());
    }
}
