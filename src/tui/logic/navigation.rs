use ratatui::widgets::ListState;

pub fn navigate_up(list_state: &mut ListState) {
    if let Some(current) = list_state.selected() {
        if current > 0 {
            list_state.select(Some(current - 1));
        }
    }
}

pub fn navigate_down(list_state: &mut ListState, max_items: usize) {
    let max = max_items.saturating_sub(1);
    if let Some(current) = list_state.selected() {
        if current < max {
            list_state.select(Some(current + 1));
        }
    }
}

/// Keeps the cursor on a real row after the list shrank.
pub fn clamp_selection(list_state: &mut ListState, len: usize) {
    match (list_state.selected(), len) {
        (_, 0) => list_state.select(Some(0)),
        (Some(current), len) if current >= len => list_state.select(Some(len - 1)),
        (None, _) => list_state.select(Some(0)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut state = ListState::default();
        state.select(Some(0));
        navigate_up(&mut state);
        assert_eq!(state.selected(), Some(0));
        navigate_down(&mut state, 2);
        navigate_down(&mut state, 2);
        assert_eq!(state.selected(), Some(1));
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut state = ListState::default();
        state.select(Some(4));
        clamp_selection(&mut state, 2);
        assert_eq!(state.selected(), Some(1));
    }
}
