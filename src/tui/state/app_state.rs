use crate::config::Config;
use crate::coordinator::RemovalCoordinator;
use crate::inventory::{InventorySnapshot, RemovableUnit};
use crate::pipeline::{RemovalContext, RemovalOptions};
use crate::tui::state::{AppMode, RemovalProgress, RemovalResultDisplay, SortMode};
use ratatui::widgets::ListState;
use std::collections::HashSet;
use std::sync::mpsc::Receiver;

pub struct App {
    pub config: Config,
    pub options: RemovalOptions,
    pub units: Vec<RemovableUnit>,
    pub snapshot: InventorySnapshot,
    pub selected: HashSet<String>,
    pub list_state: ListState,
    pub mode: AppMode,
    pub prev_mode: Option<AppMode>,
    pub should_quit: bool,
    pub sort_mode: SortMode,
    pub coordinator: RemovalCoordinator,
    pub progress: RemovalProgress,
    pub result: Option<RemovalResultDisplay>,
    pub size_receiver: Option<Receiver<(usize, u64)>>,
    pub status: Option<String>,
    pub rescan_requested: bool,
    pub start_requested: bool,
}

impl App {
    pub fn new(config: Config, context: RemovalContext) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        let mut app = Self {
            options: RemovalOptions::from(&config.removal),
            config,
            units: Vec::new(),
            snapshot: InventorySnapshot::default(),
            selected: HashSet::new(),
            list_state,
            mode: AppMode::LibraryList,
            prev_mode: None,
            should_quit: false,
            sort_mode: SortMode::default(),
            coordinator: RemovalCoordinator::new(context),
            progress: RemovalProgress::default(),
            result: None,
            size_receiver: None,
            status: None,
            rescan_requested: false,
            start_requested: false,
        };
        app.rescan();
        app
    }
}
