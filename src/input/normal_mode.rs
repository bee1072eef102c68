use chrono::Local;
use crossterm::event::KeyCode;

use super::Action;
use crate::app::{AppState, Mode, Page};
use crate::calendar::EventType;

pub fn handle_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    if state.show_help {
        handle_help_key(key, state);
        return None;
    }

    match key {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Char(':') => {
            state.enter_command_mode();
            return None;
        }
        KeyCode::Char('?') => {
            state.show_help = true;
            state.help_scroll = 0;
            return None;
        }
        _ => {}
    }

    match state.page {
        Page::Calendar => handle_calendar_key(key, state),
        Page::Admin => handle_admin_key(key, state),
    }
}

fn handle_help_key(key: KeyCode, state: &mut AppState) {
    match key {
        KeyCode::Char('j') | KeyCode::Down => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Esc => {
            state.show_help = false;
            state.help_scroll = 0;
        }
        _ => {}
    }
}

fn selected_event_id(state: &AppState) -> Option<String> {
    state.calendar.selected_event().map(|event| event.id.clone())
}

fn handle_calendar_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    state.calendar.clear_notice();
    match key {
        KeyCode::Char('h') | KeyCode::Left => state.calendar.move_days(-1),
        KeyCode::Char('l') | KeyCode::Right => state.calendar.move_days(1),
        KeyCode::Char('j') | KeyCode::Down => state.calendar.move_days(7),
        KeyCode::Char('k') | KeyCode::Up => state.calendar.move_days(-7),
        KeyCode::Char('J') | KeyCode::Tab => state.calendar.select_next_event(),
        KeyCode::Char('K') | KeyCode::BackTab => state.calendar.select_prev_event(),
        KeyCode::Char('{') => state.calendar.prev_month(),
        KeyCode::Char('}') => state.calendar.next_month(),
        KeyCode::Char('t') => state.calendar.today(Local::now().date_naive()),
        KeyCode::Char('v') => state.calendar.toggle_view_mode(),
        KeyCode::Char('f') => state.show_filters = !state.show_filters,
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            state.calendar.toggle_filter(EventType::ALL[index]);
        }
        KeyCode::Char('r') => return Some(Action::Refresh),
        KeyCode::Char('A') => return Some(Action::OpenAdmin),
        KeyCode::Char('a') => {
            if state.calendar.open_new().is_ok() {
                state.mode = Mode::Insert;
            }
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(id) = selected_event_id(state)
                && state.calendar.open_edit(&id).is_ok()
            {
                state.mode = Mode::Insert;
            }
        }
        KeyCode::Char('x') => {
            if let Some(id) = selected_event_id(state)
                && state.calendar.request_delete(&id).is_ok()
            {
                state.mode = Mode::Confirm;
            }
        }
        KeyCode::Char('c') => {
            if let Some(id) = selected_event_id(state) {
                return Some(Action::OpenComments(id));
            }
        }
        _ => {}
    }
    None
}

fn handle_admin_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    state.admin.clear_notice();
    match key {
        KeyCode::Esc | KeyCode::Char('C') => state.page = Page::Calendar,
        KeyCode::Char('i') if !state.admin.is_authenticated() => state.mode = Mode::Insert,
        KeyCode::Char('j') | KeyCode::Down => state.admin.select_next(),
        KeyCode::Char('k') | KeyCode::Up => state.admin.select_prev(),
        KeyCode::Char('r') => return Some(Action::Refresh),
        KeyCode::Char('o') => return Some(Action::SignOut),
        KeyCode::Char('a') if state.admin.is_authenticated() => {
            state.admin.open_add();
            state.mode = Mode::Insert;
        }
        KeyCode::Char('e') | KeyCode::Enter if state.admin.is_authenticated() => {
            if let Some(id) = state.admin.selected_user().map(|user| user.id.clone()) {
                state.admin.open_edit(&id);
                state.mode = Mode::Insert;
            }
        }
        KeyCode::Char('x') if state.admin.is_authenticated() => {
            if let Some(id) = state.admin.selected_user().map(|user| user.id.clone()) {
                state.admin.request_delete(&id);
                state.mode = Mode::Confirm;
            }
        }
        _ => {}
    }
    None
}
