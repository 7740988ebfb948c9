use std::sync::mpsc;
use std::time::Duration;

use engine_logging::engine_trace;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::{EngineEvent, PollTicket};

/// The single poll timer. Arming always aborts the previous timer first, so at
/// most one `PollDue` can be pending per slot.
pub struct PollTimer {
    runtime: Handle,
    active: Option<(PollTicket, JoinHandle<()>)>,
}

impl PollTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            active: None,
        }
    }

    pub fn arm(&mut self, ticket: PollTicket, delay: Duration, event_tx: mpsc::Sender<EngineEvent>) {
        self.disarm();
        engine_trace!("Arming poll timer ticket={} delay={:?}", ticket, delay);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = event_tx.send(EngineEvent::PollDue { ticket });
        });
        self.active = Some((ticket, task));
    }

    pub fn disarm(&mut self) {
        if let Some((ticket, task)) = self.active.take() {
            if !task.is_finished() {
                engine_trace!("Disarming poll timer ticket={}", ticket);
            }
            task.abort();
        }
    }

    /// Ticket of the timer that has not fired yet, if any.
    pub fn armed_ticket(&self) -> Option<PollTicket> {
        self.active
            .as_ref()
            .filter(|(_, task)| !task.is_finished())
            .map(|(ticket, _)| *ticket)
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
