use crate::inventory::RemovableUnit;
use crate::pipeline::RemovalOptions;
use crate::tui::logic::{
    deselect_all, navigate_down, navigate_up, select_all, sorted_indices, toggle_selection,
};
use crate::tui::state::{AppMode, SortMode};
use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::collections::HashSet;

pub struct LibraryListContext<'a> {
    pub list_state: &'a mut ListState,
    pub units: &'a [RemovableUnit],
    pub selected: &'a mut HashSet<String>,
    pub options: &'a mut RemovalOptions,
    pub sort_mode: &'a mut SortMode,
    pub mode: &'a mut AppMode,
    pub prev_mode: &'a mut Option<AppMode>,
    pub should_quit: &'a mut bool,
    pub rescan_requested: &'a mut bool,
}

impl LibraryListContext<'_> {
    fn focused(&self) -> Option<&RemovableUnit> {
        let order = sorted_indices(self.units, *self.sort_mode);
        self.list_state
            .selected()
            .and_then(|row| order.get(row))
            .and_then(|&i| self.units.get(i))
    }
}

pub fn handle_library_list_key(ctx: &mut LibraryListContext, code: KeyCode) -> Result<()> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => *ctx.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => navigate_up(ctx.list_state),
        KeyCode::Down | KeyCode::Char('j') => navigate_down(ctx.list_state, ctx.units.len()),
        KeyCode::Char(' ') => {
            let focused = ctx.focused().cloned();
            toggle_selection(ctx.selected, focused.as_ref());
        }
        KeyCode::Char('a') => select_all(ctx.selected, ctx.units),
        KeyCode::Char('n') => deselect_all(ctx.selected),
        KeyCode::Char('b') => {
            ctx.options.backup_config_entry = !ctx.options.backup_config_entry;
        }
        KeyCode::Char('d') => {
            ctx.options.delete_content_dir = !ctx.options.delete_content_dir;
        }
        KeyCode::Char('s') => {
            *ctx.sort_mode = ctx.sort_mode.next();
        }
        KeyCode::Char('r') => *ctx.rescan_requested = true,
        KeyCode::Enter => {
            if ctx.selected.is_empty() {
                let focused = ctx.focused().cloned();
                toggle_selection(ctx.selected, focused.as_ref());
            }
            if !ctx.selected.is_empty() {
                *ctx.mode = AppMode::ConfirmRemoval;
            }
        }
        KeyCode::Char('?') => {
            *ctx.prev_mode = Some(*ctx.mode);
            *ctx.mode = AppMode::Help;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRoot;

    struct Harness {
        list_state: ListState,
        units: Vec<RemovableUnit>,
        selected: HashSet<String>,
        options: RemovalOptions,
        sort_mode: SortMode,
        mode: AppMode,
        prev_mode: Option<AppMode>,
        should_quit: bool,
        rescan_requested: bool,
    }

    impl Harness {
        fn new() -> Self {
            let mut list_state = ListState::default();
            list_state.select(Some(0));
            Self {
                list_state,
                units: vec![
                    RemovableUnit::new("Session Horns", "", StoreRoot::Primary, "Session Horns"),
                    RemovableUnit::new("Factory Strings", "", StoreRoot::Primary, "Factory Strings"),
                ],
                selected: HashSet::new(),
                options: RemovalOptions {
                    backup_config_entry: true,
                    delete_content_dir: false,
                },
                sort_mode: SortMode::NameAsc,
                mode: AppMode::LibraryList,
                prev_mode: None,
                should_quit: false,
                rescan_requested: false,
            }
        }

        fn press(&mut self, code: KeyCode) {
            let mut ctx = LibraryListContext {
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
            handle_library_list_key(&mut ctx, code).unwrap();
        }
    }

    #[test]
    fn test_space_selects_focused_row_in_display_order() {
        let mut h = Harness::new();
        h.press(KeyCode::Char(' '));
        assert!(h.selected.contains("Factory Strings"));
        h.press(KeyCode::Char(' '));
        assert!(h.selected.is_empty());
    }

    #[test]
    fn test_enter_with_nothing_selected_confirms_focused() {
        let mut h = Harness::new();
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        assert_eq!(h.mode, AppMode::ConfirmRemoval);
        assert_eq!(h.selected.len(), 1);
        assert!(h.selected.contains("Session Horns"));
    }

    #[test]
    fn test_option_toggles() {
        let mut h = Harness::new();
        h.press(KeyCode::Char('b'));
        h.press(KeyCode::Char('d'));
        assert!(!h.options.backup_config_entry);
        assert!(h.options.delete_content_dir);
        h.press(KeyCode::Char('r'));
        assert!(h.rescan_requested);
    }
}
