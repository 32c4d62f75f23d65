use crate::inventory::{spawn_size_scan, InventoryScanner, InventorySnapshot, RemovableUnit};
use crate::store::ConfigStore;
use crate::tui::logic::clamp_selection;
use ratatui::widgets::ListState;
use std::collections::HashSet;
use std::sync::mpsc::{Receiver, TryRecvError};

pub struct InventoryContext<'a> {
    pub store: &'a dyn ConfigStore,
    pub units: &'a mut Vec<RemovableUnit>,
    pub snapshot: &'a mut InventorySnapshot,
    pub selected: &'a mut HashSet<String>,
    pub size_receiver: &'a mut Option<Receiver<(usize, u64)>>,
    pub list_state: &'a mut ListState,
    pub status: &'a mut Option<String>,
}

/// Replaces the list and snapshot with a fresh scan and restarts the size
/// walk. Selections that no longer exist are dropped.
pub fn rescan(ctx: &mut InventoryContext) {
    match InventoryScanner::new().scan(ctx.store) {
        Ok(units) => {
            *ctx.snapshot = InventorySnapshot::from_units(&units);
            let snapshot = &*ctx.snapshot;
            ctx.selected.retain(|name| snapshot.contains(name));
            *ctx.size_receiver = Some(spawn_size_scan(&units));
            clamp_selection(ctx.list_state, units.len());
            *ctx.units = units;
        }
        Err(e) => {
            log::error!("inventory scan failed: {}", e);
            *ctx.status = Some(format!("Scan failed: {}", e));
        }
    }
}

pub fn poll_sizes(units: &[RemovableUnit], size_receiver: &mut Option<Receiver<(usize, u64)>>) {
    let mut done = false;
    if let Some(rx) = size_receiver.as_ref() {
        loop {
            match rx.try_recv() {
                Ok((idx, size)) => {
                    if let Some(unit) = units.get(idx) {
                        unit.set_size_on_disk(size);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    done = true;
                    break;
                }
            }
        }
    }
    if done {
        *size_receiver = None;
    }
}
