//! Arrival-ordered front door to an [`Orchestrator`].
//!
//! Callers that must not wait on a transition (webhooks, HTTP handlers) hand
//! their stimulus to a single worker task. The worker applies submissions in
//! the order they were queued, and when several are waiting only the newest is
//! played, since each would supersede the one before it anyway.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::device::LightDevice;
use crate::orchestrator::{Orchestrator, TriggerReceipt};
use crate::pattern;
use crate::stimulus::Stimulus;

struct Submission {
    id: Uuid,
    stimulus: Stimulus,
}

#[derive(Clone)]
pub struct TriggerQueue {
    tx: mpsc::UnboundedSender<Submission>,
    worker: Arc<JoinHandle<()>>,
}

impl TriggerQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn<D: LightDevice>(orchestrator: Arc<Orchestrator<D>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(drain(orchestrator, rx));
        Self {
            tx,
            worker: Arc::new(worker),
        }
    }

    /// Queue a trigger and return its receipt without waiting for it to start.
    ///
    /// `accepted` is false once the queue has been closed.
    pub fn submit(&self, stimulus: Stimulus) -> TriggerReceipt {
        let id = Uuid::new_v4();
        let mut receipt = TriggerReceipt::new(id, &pattern::select(&stimulus));
        if self.tx.send(Submission { id, stimulus }).is_err() {
            receipt.accepted = false;
        }
        receipt
    }

    /// Stop the worker. Pending submissions are discarded; a transition cut
    /// short here is completed by the orchestrator's next `trigger` or `stop`.
    pub fn close(&self) {
        self.worker.abort();
    }
}

async fn drain<D: LightDevice>(
    orchestrator: Arc<Orchestrator<D>>,
    mut rx: mpsc::UnboundedReceiver<Submission>,
) {
    while let Some(mut latest) = rx.recv().await {
        while let Ok(next) = rx.try_recv() {
            info!(session = %latest.id, "queued trigger superseded before it started");
            latest = next;
        }
        orchestrator.trigger_as(latest.id, latest.stimulus).await;
    }
}
