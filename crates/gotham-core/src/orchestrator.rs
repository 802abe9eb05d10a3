//! Celebration interrupt orchestrator.
//!
//! Owns the single in-flight celebration session for one device. Session
//! transitions (`trigger`, `stop`) are serialized by an async mutex that is
//! held across the previous session's teardown, so a new snapshot is never
//! taken while an older run is still restoring. `status` never touches that
//! mutex; it reads a `watch` board published by the transitions and the run
//! task itself.
//!
//! ```text
//! Idle ──trigger──▶ Celebrating ──▶ Restoring ──▶ Completed | Cancelled | Failed ──▶ Idle
//!                        │  ▲
//!                        └──┘ trigger / stop (cancel + await teardown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::device::{DeviceState, LightDevice, PowerState};
use crate::pattern::{self, CelebrationPattern, PatternStep, Rgb};
use crate::stimulus::Stimulus;

// ---------------------------------------------------------------------------
// Public status types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Celebrating,
    Restoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub pattern_name: String,
    pub stimulus: Stimulus,
    pub started_at: DateTime<Utc>,
    pub phase: SessionPhase,
    /// False when the pre-celebration snapshot could not be captured.
    pub will_restore: bool,
    #[serde(skip)]
    started: Instant,
}

impl SessionInfo {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishedRun {
    pub id: Uuid,
    pub pattern_name: String,
    pub outcome: RunOutcome,
    pub finished_at: DateTime<Utc>,
}

/// What the orchestrator is doing right now, plus how the last run ended.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    pub active: Option<SessionInfo>,
    pub last: Option<FinishedRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<SessionPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<Stimulus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<FinishedRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerReceipt {
    pub session_id: Uuid,
    pub pattern_name: String,
    /// Pattern length in seconds.
    pub duration: f64,
    pub accepted: bool,
}

impl TriggerReceipt {
    pub(crate) fn new(session_id: Uuid, pattern: &CelebrationPattern) -> Self {
        Self {
            session_id,
            pattern_name: pattern.name.clone(),
            duration: pattern.total_duration.as_secs_f64(),
            accepted: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopReport {
    pub stopped: bool,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct RunHandle {
    id: Uuid,
    pattern_name: String,
    cancel: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

pub struct Orchestrator<D: LightDevice> {
    device: Arc<D>,
    transition: Mutex<Option<RunHandle>>,
    board: Arc<watch::Sender<StatusBoard>>,
}

impl<D: LightDevice> Orchestrator<D> {
    pub fn new(device: Arc<D>) -> Self {
        let (board, _) = watch::channel(StatusBoard::default());
        Self {
            device,
            transition: Mutex::new(None),
            board: Arc::new(board),
        }
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// Supersede whatever is running and start celebrating `stimulus`.
    ///
    /// Waits for the previous session's teardown and for the snapshot, but
    /// never for the new celebration itself.
    pub async fn trigger(&self, stimulus: Stimulus) -> TriggerReceipt {
        self.trigger_as(Uuid::new_v4(), stimulus).await
    }

    /// `trigger` with a session id chosen by the caller.
    ///
    /// Dropping the returned future before it resolves never lets two runs
    /// overlap: an interrupted teardown is finished by the next transition.
    pub async fn trigger_as(&self, id: Uuid, stimulus: Stimulus) -> TriggerReceipt {
        let mut slot = self.transition.lock().await;

        let previous_id = slot.as_ref().map(|h| h.id);
        if self.teardown(&mut slot).await {
            if let Some(previous_id) = previous_id {
                info!(session = %previous_id, "superseded by new trigger");
            }
        }

        let saved = match self.device.get_state().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "snapshot unavailable, celebration will not restore");
                None
            }
        };

        let pattern = pattern::select(&stimulus);
        let receipt = TriggerReceipt::new(id, &pattern);

        info!(
            session = %id,
            pattern = %pattern.name,
            kind = %stimulus.kind,
            magnitude = stimulus.magnitude,
            source = %stimulus.source,
            "celebration starting"
        );

        let info = SessionInfo {
            id,
            pattern_name: pattern.name.clone(),
            stimulus,
            started_at: Utc::now(),
            phase: SessionPhase::Celebrating,
            will_restore: saved.is_some(),
            started: Instant::now(),
        };
        self.board.send_modify(|b| b.active = Some(info));

        let cancel = CancellationToken::new();
        let pattern_name = pattern.name.clone();
        let task = tokio::spawn(run_session(
            self.device.clone(),
            self.board.clone(),
            id,
            pattern,
            saved,
            cancel.clone(),
        ));

        *slot = Some(RunHandle {
            id,
            pattern_name,
            cancel,
            task,
        });
        receipt
    }

    /// Cancel the running celebration and wait for its restore.
    pub async fn stop(&self) -> StopReport {
        let mut slot = self.transition.lock().await;
        let id = slot.as_ref().map(|h| h.id);
        let stopped = self.teardown(&mut slot).await;
        match id {
            Some(id) if stopped => info!(session = %id, "celebration stopped"),
            _ => info!("stop requested with no active celebration"),
        }
        StopReport { stopped }
    }

    pub fn status(&self) -> Status {
        let board = self.board.borrow();
        let last_run = board.last.clone();
        match &board.active {
            Some(session) => Status {
                active: true,
                session_id: Some(session.id),
                pattern_name: Some(session.pattern_name.clone()),
                phase: Some(session.phase),
                elapsed_seconds: Some(session.elapsed().as_secs_f64()),
                stimulus: Some(session.stimulus.clone()),
                last_run,
            },
            None => Status {
                active: false,
                session_id: None,
                pattern_name: None,
                phase: None,
                elapsed_seconds: None,
                stimulus: None,
                last_run,
            },
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusBoard> {
        self.board.subscribe()
    }

    /// Resolve once no session is active.
    pub async fn wait_idle(&self) {
        let mut rx = self.board.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|b| b.active.is_none()).await;
    }

    /// Cancel and await the run held in `slot`. Returns whether it was still
    /// active.
    ///
    /// The handle leaves the slot only once its task has joined, so a caller
    /// dropped mid-teardown leaves the wait to whoever takes the lock next.
    async fn teardown(&self, slot: &mut Option<RunHandle>) -> bool {
        let Some(handle) = slot.as_mut() else {
            return false;
        };
        // The task publishes its outcome just before returning, so the board
        // is the authority on whether it is still active.
        let was_running = self
            .board
            .borrow()
            .active
            .as_ref()
            .is_some_and(|a| a.id == handle.id);
        handle.cancel.cancel();
        if let Err(e) = (&mut handle.task).await {
            error!(session = %handle.id, error = %e, "celebration task failed");
            publish_finished(&self.board, handle.id, &handle.pattern_name, RunOutcome::Failed);
        }
        *slot = None;
        was_running
    }
}

impl<D: LightDevice> Drop for Orchestrator<D> {
    fn drop(&mut self) {
        // The detached task still restores after cancellation.
        if let Some(handle) = self.transition.get_mut().take() {
            handle.cancel.cancel();
        }
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Progress {
    attempted: usize,
    applied: usize,
    cancelled: bool,
}

enum StepEvent {
    Applied(bool),
    Cancelled,
    Deadline,
}

async fn run_session<D: LightDevice>(
    device: Arc<D>,
    board: Arc<watch::Sender<StatusBoard>>,
    id: Uuid,
    pattern: CelebrationPattern,
    saved: Option<DeviceState>,
    cancel: CancellationToken,
) -> RunOutcome {
    let initially_on = saved.as_ref().is_some_and(|s| s.power == PowerState::On);
    let progress = play(device.as_ref(), &pattern, initially_on, &cancel).await;

    board.send_if_modified(|b| match b.active.as_mut() {
        Some(active) if active.id == id => {
            active.phase = SessionPhase::Restoring;
            true
        }
        _ => false,
    });

    match &saved {
        Some(state) => restore(device.as_ref(), state).await,
        None => warn!(session = %id, "no snapshot captured, skipping restore"),
    }

    let outcome = if progress.cancelled {
        RunOutcome::Cancelled
    } else if progress.attempted > 0 && progress.applied == 0 {
        RunOutcome::Failed
    } else {
        RunOutcome::Completed
    };

    info!(
        session = %id,
        pattern = %pattern.name,
        outcome = ?outcome,
        steps_attempted = progress.attempted,
        steps_applied = progress.applied,
        "celebration finished"
    );
    publish_finished(&board, id, &pattern.name, outcome);
    outcome
}

/// Loop the pattern's steps until its total duration elapses or the token fires.
async fn play<D: LightDevice>(
    device: &D,
    pattern: &CelebrationPattern,
    initially_on: bool,
    cancel: &CancellationToken,
) -> Progress {
    let mut progress = Progress::default();
    if pattern.steps.is_empty() {
        return progress;
    }

    let deadline = Instant::now() + pattern.total_duration;
    let mut lit = initially_on;

    'cycle: loop {
        for step in &pattern.steps {
            if cancel.is_cancelled() {
                progress.cancelled = true;
                break 'cycle;
            }
            if Instant::now() >= deadline {
                break 'cycle;
            }

            progress.attempted += 1;
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => StepEvent::Cancelled,
                _ = tokio::time::sleep_until(deadline) => StepEvent::Deadline,
                ok = apply_step(device, step, &mut lit) => StepEvent::Applied(ok),
            };
            match event {
                StepEvent::Applied(true) => progress.applied += 1,
                // A failed step still advances timing.
                StepEvent::Applied(false) => {}
                StepEvent::Cancelled => {
                    progress.cancelled = true;
                    break 'cycle;
                }
                StepEvent::Deadline => break 'cycle,
            }

            let hold = step
                .hold
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    progress.cancelled = true;
                    break 'cycle;
                }
                _ = tokio::time::sleep(hold) => {}
            }
        }
    }
    progress
}

async fn apply_step<D: LightDevice>(device: &D, step: &PatternStep, lit: &mut bool) -> bool {
    if step.is_off() {
        return match device.set_power(false).await {
            Ok(()) => {
                *lit = false;
                true
            }
            Err(e) => {
                warn!(error = %e, "off-step failed");
                false
            }
        };
    }

    let mut ok = true;
    if !*lit {
        match device.set_power(true).await {
            Ok(()) => *lit = true,
            Err(e) => {
                warn!(error = %e, "power-on failed");
                ok = false;
            }
        }
    }
    if let Err(e) = device.set_color(step.color).await {
        warn!(color = %step.color, error = %e, "step color failed");
        ok = false;
    }
    if let Err(e) = device.set_brightness(step.brightness).await {
        warn!(brightness = step.brightness, error = %e, "step brightness failed");
        ok = false;
    }
    ok
}

/// Best-effort return to the snapshot. Failures are logged, never propagated.
async fn restore<D: LightDevice>(device: &D, saved: &DeviceState) {
    match saved.power {
        PowerState::On => {}
        PowerState::Off => {
            if let Err(e) = device.set_power(false).await {
                warn!(error = %e, "restore power-off failed");
            }
            return;
        }
        PowerState::Unknown => {
            warn!("snapshot power state unknown, leaving device as is");
            return;
        }
    }

    let mut failures = 0;
    if let Err(e) = device.set_power(true).await {
        warn!(error = %e, "restore power-on failed");
        failures += 1;
    }
    if let Some(level) = saved.brightness.filter(|b| *b > 0) {
        if let Err(e) = device.set_brightness(level).await {
            warn!(error = %e, "restore brightness failed");
            failures += 1;
        }
    }
    if let Some(color) = saved.color.filter(|c| *c != Rgb::BLACK && *c != Rgb::WHITE) {
        if let Err(e) = device.set_color(color).await {
            warn!(error = %e, "restore color failed");
            failures += 1;
        }
    }
    if failures == 0 {
        info!("restored pre-celebration state");
    }
}

fn publish_finished(
    board: &watch::Sender<StatusBoard>,
    id: Uuid,
    pattern_name: &str,
    outcome: RunOutcome,
) {
    board.send_modify(|b| {
        if b.active.as_ref().is_some_and(|a| a.id == id) {
            b.active = None;
        }
        b.last = Some(FinishedRun {
            id,
            pattern_name: pattern_name.to_string(),
            outcome,
            finished_at: Utc::now(),
        });
    });
}
