use crossterm::event::KeyCode;

use super::Action;
use crate::app::{AppState, Mode, Page};

/// Yes/no prompt for a pending delete on either page.
pub fn handle_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    match key {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(match state.page {
            Page::Calendar => Action::ConfirmDelete,
            Page::Admin => Action::DeleteUser,
        }),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            match state.page {
                Page::Calendar => state.calendar.cancel_delete(),
                Page::Admin => state.admin.cancel_delete(),
            }
            state.mode = Mode::Normal;
            None
        }
        _ => None,
    }
}
