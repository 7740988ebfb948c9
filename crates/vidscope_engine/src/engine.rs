use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};

use crate::client::JobService;
use crate::timer::PollTimer;
use crate::{EngineEvent, PollTicket, VideoId};

enum EngineCommand {
    ArmPollTimer { ticket: PollTicket, delay: Duration },
    DisarmPollTimer,
    FetchProgress { ticket: PollTicket, video_id: VideoId },
    RequestCancel { video_id: VideoId },
}

/// Runs monitor I/O on a background tokio runtime. Commands are handled in
/// order on one thread, which is also the only owner of the poll timer.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(service: Arc<dyn JobService>) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("vidscope-io")
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("vidscope-engine".to_string())
            .spawn(move || {
                let mut timer = PollTimer::new(runtime.handle().clone());
                while let Ok(command) = cmd_rx.recv() {
                    handle_command(&runtime, &mut timer, &service, command, &event_tx);
                }
                timer.disarm();
                engine_debug!("Engine command channel closed; shutting down");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn arm_poll_timer(&self, ticket: PollTicket, delay: Duration) {
        self.send(EngineCommand::ArmPollTimer { ticket, delay });
    }

    pub fn disarm_poll_timer(&self) {
        self.send(EngineCommand::DisarmPollTimer);
    }

    pub fn fetch_progress(&self, ticket: PollTicket, video_id: impl Into<VideoId>) {
        self.send(EngineCommand::FetchProgress {
            ticket,
            video_id: video_id.into(),
        });
    }

    pub fn request_cancel(&self, video_id: impl Into<VideoId>) {
        self.send(EngineCommand::RequestCancel {
            video_id: video_id.into(),
        });
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            engine_warn!("Engine thread is gone; command dropped");
        }
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    timer: &mut PollTimer,
    service: &Arc<dyn JobService>,
    command: EngineCommand,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::ArmPollTimer { ticket, delay } => {
            timer.arm(ticket, delay, event_tx.clone());
        }
        EngineCommand::DisarmPollTimer => timer.disarm(),
        EngineCommand::FetchProgress { ticket, video_id } => {
            let service = service.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = service.fetch_progress(&video_id).await;
                let _ = event_tx.send(EngineEvent::ProgressFetched {
                    ticket,
                    video_id,
                    result,
                });
            });
        }
        EngineCommand::RequestCancel { video_id } => {
            let service = service.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = service.request_cancel(&video_id).await;
                let _ = event_tx.send(EngineEvent::CancelFinished { video_id, result });
            });
        }
    }
}
