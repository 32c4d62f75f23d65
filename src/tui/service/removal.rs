use crate::coordinator::{RemovalCoordinator, RemovalEvent};
use crate::inventory::{InventorySnapshot, RemovableUnit};
use crate::pipeline::RemovalOptions;
use crate::tui::state::{AppMode, RemovalProgress, RemovalResultDisplay};
use std::collections::HashSet;

pub struct StartContext<'a> {
    pub coordinator: &'a RemovalCoordinator,
    pub units: &'a [RemovableUnit],
    pub snapshot: &'a InventorySnapshot,
    pub selected: &'a HashSet<String>,
    pub options: RemovalOptions,
    pub progress: &'a mut RemovalProgress,
    pub mode: &'a mut AppMode,
    pub status: &'a mut Option<String>,
}

/// Hands the selected libraries, in list order, to the worker.
pub fn start_removal(ctx: &mut StartContext) {
    let units: Vec<RemovableUnit> = ctx
        .units
        .iter()
        .filter(|u| ctx.selected.contains(&u.name))
        .cloned()
        .collect();
    if units.is_empty() {
        *ctx.mode = AppMode::LibraryList;
        return;
    }

    let count = units.len();
    if ctx
        .coordinator
        .begin_removal(units, ctx.options, ctx.snapshot.clone())
    {
        *ctx.progress = RemovalProgress::start(count);
        *ctx.mode = AppMode::Removing;
        *ctx.status = None;
    } else {
        *ctx.status = Some("A removal is already running".to_string());
        *ctx.mode = AppMode::LibraryList;
    }
}

pub struct PollContext<'a> {
    pub coordinator: &'a RemovalCoordinator,
    pub progress: &'a mut RemovalProgress,
    pub result: &'a mut Option<RemovalResultDisplay>,
    pub selected: &'a mut HashSet<String>,
    pub mode: &'a mut AppMode,
}

/// Drains worker events. Returns `true` once the run has finished and the
/// inventory should be rescanned.
pub fn poll_removal_events(ctx: &mut PollContext) -> bool {
    let mut finished = false;
    while let Some(event) = ctx.coordinator.try_recv() {
        match event {
            RemovalEvent::Progress(p) => ctx.progress.current = Some(p),
            RemovalEvent::UnitCompleted(outcome) => ctx.progress.outcomes.push(outcome),
            RemovalEvent::Finished(summary) => {
                ctx.coordinator.end();
                *ctx.result = Some(RemovalResultDisplay {
                    summary,
                    duration: ctx.progress.started.elapsed(),
                });
                ctx.selected.clear();
                *ctx.mode = AppMode::RemovalResult;
                finished = true;
            }
        }
    }
    finished
}
