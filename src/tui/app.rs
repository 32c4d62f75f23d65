use crate::tui::state::App;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};
use std::time::Duration;

use crate::tui::controller::common;
use crate::tui::controller::library_list;
use crate::tui::controller::removing;
use crate::tui::controller::{
    handle_confirm_key, handle_help_key, handle_library_list_key, handle_removing_key,
    handle_result_key,
};
use crate::tui::service::inventory::{poll_sizes, rescan, InventoryContext};
use crate::tui::service::removal::{
    poll_removal_events, start_removal, PollContext, StartContext,
};
use crate::tui::state::AppMode;
use crate::tui::view::components::modal::{
    render_confirm_modal, render_help_modal, render_result_modal, ConfirmModalData,
};
use crate::tui::view::{render_library_list, render_removing, LibraryListData};

impl App {
    pub fn rescan(&mut self) {
        let store = std::sync::Arc::clone(&self.coordinator.context().store);
        let mut ctx = InventoryContext {
            store: store.as_ref(),
            units: &mut self.units,
            snapshot: &mut self.snapshot,
            selected: &mut self.selected,
            size_receiver: &mut self.size_receiver,
            list_state: &mut self.list_state,
            status: &mut self.status,
        };
        rescan(&mut ctx);
        self.rescan_requested = false;
    }

    pub fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> Result<()> {
        while !self.should_quit {
            poll_sizes(&self.units, &mut self.size_receiver);

            if self.poll_removal() {
                self.rescan();
            }
            if self.rescan_requested {
                self.rescan();
            }
            if self.start_requested {
                self.start_requested = false;
                self.start();
            }

            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers)?;
                    }
                }
            }
        }

        if !self.coordinator.shutdown(self.config.shutdown.timeout()) {
            log::warn!(
                "removal worker still running after {}s; exiting without it",
                self.config.shutdown.timeout_secs
            );
        }
        Ok(())
    }

    fn poll_removal(&mut self) -> bool {
        let mut ctx = PollContext {
            coordinator: &self.coordinator,
            progress: &mut self.progress,
            result: &mut self.result,
            selected: &mut self.selected,
            mode: &mut self.mode,
        };
        poll_removal_events(&mut ctx)
    }

    fn start(&mut self) {
        let mut ctx = StartContext {
            coordinator: &self.coordinator,
            units: &self.units,
            snapshot: &self.snapshot,
            selected: &self.selected,
            options: self.options,
            progress: &mut self.progress,
            mode: &mut self.mode,
            status: &mut self.status,
        };
        start_removal(&mut ctx);
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            self.coordinator.request_cancel();
            self.should_quit = true;
            return Ok(());
        }

        match self.mode {
            AppMode::LibraryList => {
                let mut ctx = library_list::LibraryListContext {
                    list_state: &mut self.list_state,
                    units: &self.units,
                    selected: &mut self.selected,
                    options: &mut self.options,
                    sort_mode: &mut self.sort_mode,
                    mode: &mut self.mode,
                    prev_mode: &mut self.prev_mode,
                    should_quit: &mut self.should_quit,
                    rescan_requested: &mut self.rescan_requested,
                };
                handle_library_list_key(&mut ctx, code)
            }
            AppMode::ConfirmRemoval => {
                let mut ctx = common::ConfirmContext {
                    mode: &mut self.mode,
                    start_requested: &mut self.start_requested,
                };
                handle_confirm_key(&mut ctx, code)
            }
            AppMode::Removing => {
                let mut ctx = removing::RemovingContext {
                    coordinator: &self.coordinator,
                    progress: &mut self.progress,
                    should_quit: &mut self.should_quit,
                };
                handle_removing_key(&mut ctx, code)
            }
            AppMode::RemovalResult => {
                let mut ctx = common::ResultContext {
                    mode: &mut self.mode,
                };
                handle_result_key(&mut ctx, code)
            }
            AppMode::Help => {
                let mut ctx = common::HelpContext {
                    mode: &mut self.mode,
                    prev_mode: &mut self.prev_mode,
                };
                handle_help_key(&mut ctx, code)
            }
        }
    }

    fn render(&mut self, f: &mut ratatui::Frame) {
        match self.mode {
            AppMode::Removing => render_removing(f, &self.progress),
            _ => {
                let mut data = LibraryListData {
                    list_state: &mut self.list_state,
                    units: &self.units,
                    selected: &self.selected,
                    options: self.options,
                    sort_mode: self.sort_mode,
                    status: self.status.as_deref(),
                };
                render_library_list(f, &mut data);
            }
        }

        match self.mode {
            AppMode::ConfirmRemoval => {
                let selected: Vec<_> = self
                    .units
                    .iter()
                    .filter(|u| self.selected.contains(&u.name))
                    .collect();
                let total_size = selected.iter().map(|u| u.known_size()).sum();
                render_confirm_modal(
                    f,
                    &ConfirmModalData {
                        names: selected.iter().map(|u| u.name.as_str()).collect(),
                        total_size,
                        options: self.options,
                    },
                );
            }
            AppMode::RemovalResult => {
                render_result_modal(f, self.result.as_ref());
            }
            AppMode::Help => {
                render_help_modal(f);
            }
            _ => {}
        }
    }
}
