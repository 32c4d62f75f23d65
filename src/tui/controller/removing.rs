use crate::coordinator::RemovalCoordinator;
use crate::tui::state::RemovalProgress;
use anyhow::Result;
use crossterm::event::KeyCode;

pub struct RemovingContext<'a> {
    pub coordinator: &'a RemovalCoordinator,
    pub progress: &'a mut RemovalProgress,
    pub should_quit: &'a mut bool,
}

/// The run keeps the screen until it reports back; keys can only ask it to
/// stop at the next step boundary.
pub fn handle_removing_key(ctx: &mut RemovingContext, code: KeyCode) -> Result<()> {
    match code {
        KeyCode::Esc | KeyCode::Char('c') => {
            ctx.coordinator.request_cancel();
            ctx.progress.cancel_requested = true;
        }
        KeyCode::Char('q') => {
            ctx.coordinator.request_cancel();
            ctx.progress.cancel_requested = true;
            *ctx.should_quit = true;
        }
        _ => {}
    }
    Ok(())
}
