//! Runs removals on a single background worker and hands progress back to
//! whichever thread drives the interface.
//!
//! At most one worker exists at a time. `begin_removal` claims the run slot
//! under the state mutex before spawning, so a second request made while a
//! run is active is refused instead of queued.

use crate::inventory::{InventorySnapshot, RemovableUnit};
use crate::pipeline::{
    CancellationToken, OutcomeStatus, RemovalContext, RemovalOptions, RemovalOutcome,
    RemovalPipeline,
};
use crate::progress::{ProgressEvent, ProgressReporter};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum RemovalEvent {
    Progress(ProgressEvent),
    UnitCompleted(RemovalOutcome),
    Finished(RemovalSummary),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RemovalSummary {
    pub outcomes: Vec<RemovalOutcome>,
    pub cancelled: bool,
}

impl RemovalSummary {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(RemovalOutcome::succeeded)
    }
}

enum RunState {
    Idle,
    Running {
        handle: Option<JoinHandle<()>>,
        finished: bool,
    },
}

pub struct RemovalCoordinator {
    context: RemovalContext,
    state: Arc<Mutex<RunState>>,
    token: CancellationToken,
    events_tx: Sender<RemovalEvent>,
    events_rx: Receiver<RemovalEvent>,
    workers_spawned: Arc<AtomicUsize>,
}

impl RemovalCoordinator {
    pub fn new(context: RemovalContext) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            context,
            state: Arc::new(Mutex::new(RunState::Idle)),
            token: CancellationToken::new(),
            events_tx,
            events_rx,
            workers_spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Claims the run slot. A worker that already finished but was never
    /// joined is reaped here.
    fn try_begin(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        match &mut *state {
            RunState::Idle => {}
            RunState::Running { finished: false, .. } => return false,
            RunState::Running { handle, finished: true } => {
                if let Some(handle) = handle.take() {
                    let _ = handle.join();
                }
            }
        }

        *state = RunState::Running {
            handle: None,
            finished: false,
        };
        true
    }

    /// Starts removing `units` in order on a new worker. Returns `false`
    /// without doing anything if a run is already active.
    pub fn begin_removal(
        &self,
        units: Vec<RemovableUnit>,
        options: RemovalOptions,
        snapshot: InventorySnapshot,
    ) -> bool {
        if !self.try_begin() {
            log::warn!("removal requested while another is running; ignored");
            return false;
        }

        self.token.reset();
        log::info!("starting removal of {} libraries", units.len());

        let worker = Worker {
            context: self.context.clone(),
            token: self.token.clone(),
            events: self.events_tx.clone(),
            state: Arc::clone(&self.state),
        };
        self.workers_spawned.fetch_add(1, Ordering::SeqCst);
        let handle = thread::spawn(move || worker.run(units, options, snapshot));

        if let Ok(mut state) = self.state.lock() {
            if let RunState::Running { handle: slot, .. } = &mut *state {
                *slot = Some(handle);
            }
        }
        true
    }

    pub fn request_cancel(&self) {
        if self.is_busy() {
            log::info!("cancellation requested");
        }
        self.token.cancel();
    }

    /// A worker that panicked never marks itself finished, so the thread
    /// itself is consulted too.
    pub fn is_busy(&self) -> bool {
        self.state
            .lock()
            .map(|state| match &*state {
                RunState::Running {
                    finished: false,
                    handle,
                } => handle.as_ref().map_or(true, |h| !h.is_finished()),
                _ => false,
            })
            .unwrap_or(false)
    }

    /// Returns the slot to idle and joins the worker. Call after `Finished`
    /// has been received.
    pub fn end(&self) {
        let handle = match self.state.lock() {
            Ok(mut state) => match std::mem::replace(&mut *state, RunState::Idle) {
                RunState::Running { handle, .. } => handle,
                RunState::Idle => None,
            },
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Cancels any active run and waits up to `timeout` for the worker to
    /// stop. Returns `false` if it was still running when time ran out; the
    /// worker is then left detached.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if !self.is_busy() {
            self.end();
            return true;
        }

        self.request_cancel();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if !self.is_busy() {
                self.end();
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }

        log::warn!(
            "worker still running after {:?}; exiting without waiting",
            timeout
        );
        if let Ok(mut state) = self.state.lock() {
            *state = RunState::Idle;
        }
        false
    }

    pub fn try_recv(&self) -> Option<RemovalEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RemovalEvent> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocks until the active run reports its summary, handing every other
    /// event to `on_event`. Returns `None` if the worker died without one.
    pub fn wait(&self, mut on_event: impl FnMut(&RemovalEvent)) -> Option<RemovalSummary> {
        loop {
            match self.recv_timeout(Duration::from_millis(100)) {
                Some(RemovalEvent::Finished(summary)) => return Some(summary),
                Some(event) => on_event(&event),
                None if !self.is_busy() => {
                    // Finished is sent just after the flag flips.
                    while let Some(event) = self.recv_timeout(Duration::from_millis(200)) {
                        match event {
                            RemovalEvent::Finished(summary) => return Some(summary),
                            other => on_event(&other),
                        }
                    }
                    return None;
                }
                None => {}
            }
        }
    }

    pub fn workers_spawned(&self) -> usize {
        self.workers_spawned.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &RemovalContext {
        &self.context
    }
}

struct Worker {
    context: RemovalContext,
    token: CancellationToken,
    events: Sender<RemovalEvent>,
    state: Arc<Mutex<RunState>>,
}

impl Worker {
    fn run(self, units: Vec<RemovableUnit>, options: RemovalOptions, mut snapshot: InventorySnapshot) {
        let mut progress = ProgressReporter::new(self.events.clone());
        let mut summary = RemovalSummary::default();

        for unit in &units {
            let outcome = {
                let mut pipeline = RemovalPipeline::new(&self.context, &self.token, &mut progress);
                pipeline.run(unit, &options, &snapshot)
            };

            if outcome.succeeded() {
                snapshot.remove(&unit.name);
            }
            if outcome.cancelled() {
                summary.cancelled = true;
            }

            let _ = self.events.send(RemovalEvent::UnitCompleted(outcome.clone()));
            summary.outcomes.push(outcome);
        }

        log::info!(
            "removal finished: {} succeeded, {} failed, {} cancelled",
            summary.count(OutcomeStatus::Succeeded),
            summary.count(OutcomeStatus::Failed),
            summary.count(OutcomeStatus::Cancelled)
        );

        if let Ok(mut state) = self.state.lock() {
            if let RunState::Running { finished, .. } = &mut *state {
                *finished = true;
            }
        }
        let _ = self.events.send(RemovalEvent::Finished(summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Access, ConfigStore, StoreRoot};
    use crate::test_support::{Fixture, GatedStore};

    const OPTIONS: RemovalOptions = RemovalOptions {
        backup_config_entry: true,
        delete_content_dir: true,
    };

    fn wait_for_summary(coordinator: &RemovalCoordinator) -> (Vec<RemovalEvent>, RemovalSummary) {
        let mut events = Vec::new();
        while let Some(event) = coordinator.recv_timeout(Duration::from_secs(10)) {
            if let RemovalEvent::Finished(summary) = event {
                return (events, summary);
            }
            events.push(event);
        }
        panic!("worker never finished");
    }

    #[test]
    fn test_removes_units_in_order() {
        let fixture = Fixture::factory_strings();
        let coordinator = RemovalCoordinator::new(fixture.context(fixture.store.clone()));

        assert!(coordinator.begin_removal(fixture.units.clone(), OPTIONS, fixture.snapshot()));
        let (events, summary) = wait_for_summary(&coordinator);
        coordinator.end();

        assert!(summary.all_succeeded());
        assert!(!summary.cancelled);
        let completed: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RemovalEvent::UnitCompleted(o) => Some(o.unit.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec!["Factory Strings", "Session Horns"]);

        // Progress for the second unit only starts after the first completed.
        let first_done = events
            .iter()
            .position(|e| matches!(e, RemovalEvent::UnitCompleted(_)))
            .unwrap();
        assert!(events[..first_done].iter().all(|e| match e {
            RemovalEvent::Progress(p) => p.unit == "Factory Strings",
            _ => true,
        }));

        assert!(!fixture.cache("K SNP99 c.cache").exists());
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.workers_spawned(), 1);
    }

    #[test]
    fn test_second_begin_while_running_is_refused() {
        let fixture = Fixture::factory_strings();
        let (release, gate) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore::new(fixture.store.clone(), gate));
        let coordinator = RemovalCoordinator::new(fixture.context(store));
        let units = vec![fixture.unit.clone()];

        assert!(coordinator.begin_removal(units.clone(), OPTIONS, fixture.snapshot()));
        assert!(coordinator.is_busy());
        assert!(!coordinator.begin_removal(units.clone(), OPTIONS, fixture.snapshot()));
        assert_eq!(coordinator.workers_spawned(), 1);

        release.send(()).unwrap();
        let (_, summary) = wait_for_summary(&coordinator);
        assert!(summary.all_succeeded());
        coordinator.end();
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.workers_spawned(), 1);
    }

    #[test]
    fn test_cancel_stops_remaining_units() {
        let fixture = Fixture::factory_strings();
        let (release, gate) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore::new(fixture.store.clone(), gate));
        let coordinator = RemovalCoordinator::new(fixture.context(store));

        assert!(coordinator.begin_removal(fixture.units.clone(), OPTIONS, fixture.snapshot()));
        // Wait until the first unit reaches its last step, then cancel.
        while let Some(event) = coordinator.recv_timeout(Duration::from_secs(10)) {
            if let RemovalEvent::Progress(p) = event {
                if p.step_index == 8 {
                    break;
                }
            }
        }
        coordinator.request_cancel();
        release.send(()).unwrap();

        let (_, summary) = wait_for_summary(&coordinator);
        coordinator.end();

        assert!(summary.cancelled);
        assert_eq!(summary.outcomes[0].status, OutcomeStatus::Succeeded);
        assert_eq!(summary.outcomes[1].status, OutcomeStatus::Cancelled);
        assert!(summary.outcomes[1].completed_steps.is_empty());
        assert!(fixture
            .store
            .open_subtree(StoreRoot::Primary, "Session Horns", Access::Read)
            .is_ok());
        assert!(fixture.cache("K SNP99 c.cache").exists());
    }

    #[test]
    fn test_new_run_resets_cancellation() {
        let fixture = Fixture::factory_strings();
        let coordinator = RemovalCoordinator::new(fixture.context(fixture.store.clone()));
        coordinator.request_cancel();

        assert!(coordinator.begin_removal(vec![fixture.unit.clone()], OPTIONS, fixture.snapshot()));
        let (_, summary) = wait_for_summary(&coordinator);
        assert!(summary.all_succeeded());

        // A finished but un-ended run does not block the next one.
        let rest = vec![fixture.units[1].clone()];
        assert!(coordinator.begin_removal(rest, OPTIONS, fixture.snapshot()));
        let (_, summary) = wait_for_summary(&coordinator);
        assert!(summary.all_succeeded());
        assert_eq!(coordinator.workers_spawned(), 2);
    }

    #[test]
    fn test_shutdown_waits_for_cancelled_worker() {
        let fixture = Fixture::factory_strings();
        let (release, gate) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore::new(fixture.store.clone(), gate));
        let coordinator = RemovalCoordinator::new(fixture.context(store));

        assert!(coordinator.begin_removal(vec![fixture.unit.clone()], OPTIONS, fixture.snapshot()));
        release.send(()).unwrap();
        assert!(coordinator.shutdown(Duration::from_secs(10)));
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_shutdown_times_out_on_stuck_worker() {
        let fixture = Fixture::factory_strings();
        let (release, gate) = std::sync::mpsc::channel::<()>();
        let store = Arc::new(GatedStore::new(fixture.store.clone(), gate));
        let coordinator = RemovalCoordinator::new(fixture.context(store));

        assert!(coordinator.begin_removal(vec![fixture.unit.clone()], OPTIONS, fixture.snapshot()));
        // Let the worker reach the gated delete before cancelling.
        while let Some(event) = coordinator.recv_timeout(Duration::from_secs(10)) {
            if matches!(event, RemovalEvent::Progress(ref p) if p.step_index == 8) {
                break;
            }
        }
        assert!(!coordinator.shutdown(Duration::from_millis(100)));
        drop(release);
    }
}
