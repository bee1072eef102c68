use crossterm::event::KeyCode;

use super::{Action, InsertTarget, insert_target};
use crate::app::{AppState, FormField, LoginField, Mode, UserField};

pub fn handle_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    let Some(target) = insert_target(state) else {
        state.mode = Mode::Normal;
        return None;
    };

    match target {
        InsertTarget::EventForm => handle_event_form(key, state),
        InsertTarget::Comment => handle_comment(key, state),
        InsertTarget::UserForm => handle_user_form(key, state),
        InsertTarget::Login => handle_login(key, state),
    }
}

fn handle_event_form(key: KeyCode, state: &mut AppState) -> Option<Action> {
    if key == KeyCode::Esc {
        state.calendar.cancel_modal();
        state.mode = Mode::Normal;
        return None;
    }
    if key == KeyCode::Enter {
        return Some(Action::SaveEvent);
    }

    let form = state.calendar.modal_form_mut()?;
    match (key, form.active_field) {
        (KeyCode::Tab, _) => form.next_field(),
        (KeyCode::BackTab, _) => form.prev_field(),
        (KeyCode::Right | KeyCode::Char(' '), FormField::Type) => form.cycle_type(true),
        (KeyCode::Left, FormField::Type) => form.cycle_type(false),
        (KeyCode::Right | KeyCode::Left, FormField::Color) => form.cycle_color(),
        (KeyCode::Backspace, _) => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.pop();
            }
        }
        (KeyCode::Char(c), _) => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
    None
}

fn handle_comment(key: KeyCode, state: &mut AppState) -> Option<Action> {
    match key {
        KeyCode::Esc => {
            state.calendar.close_thread();
            state.mode = Mode::Normal;
        }
        KeyCode::Enter => return Some(Action::PostComment),
        KeyCode::Backspace => {
            if let Some(thread) = state.calendar.thread_mut() {
                thread.draft.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(thread) = state.calendar.thread_mut() {
                thread.draft.push(c);
            }
        }
        _ => {}
    }
    None
}

fn handle_user_form(key: KeyCode, state: &mut AppState) -> Option<Action> {
    if key == KeyCode::Esc {
        state.admin.cancel_form();
        state.mode = Mode::Normal;
        return None;
    }
    if key == KeyCode::Enter {
        return Some(Action::SubmitUser);
    }

    let form = state.admin.form_mut()?;
    match (key, form.active_field) {
        (KeyCode::Tab, _) => form.next_field(),
        (KeyCode::BackTab, _) => form.prev_field(),
        (KeyCode::Left | KeyCode::Right | KeyCode::Char(' '), UserField::Role) => form.cycle_role(),
        (KeyCode::Backspace, _) => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.pop();
            }
        }
        (KeyCode::Char(c), _) => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
    None
}

fn handle_login(key: KeyCode, state: &mut AppState) -> Option<Action> {
    let login = state.admin.login_mut();
    match key {
        KeyCode::Esc => state.mode = Mode::Normal,
        KeyCode::Enter => {
            return Some(match login.field {
                LoginField::Code if login.link_sent => Action::ConfirmLogin,
                _ => Action::RequestLogin,
            });
        }
        KeyCode::Tab | KeyCode::BackTab if login.link_sent => {
            login.field = match login.field {
                LoginField::Email => LoginField::Code,
                LoginField::Code => LoginField::Email,
            };
        }
        KeyCode::Backspace => {
            login.active_buffer_mut().pop();
        }
        KeyCode::Char(c) => login.active_buffer_mut().push(c),
        _ => {}
    }
    None
}
