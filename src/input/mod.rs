pub mod command_mode;
pub mod confirm_mode;
pub mod insert_mode;
pub mod normal_mode;

use std::path::PathBuf;

use chrono::Utc;

use crate::app::{AppState, Mode, Notice, Page};
use crate::export::write_report;

/// Work a key handler asks the session loop to do; everything here awaits the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    SaveEvent,
    ConfirmDelete,
    OpenComments(String),
    PostComment,
    OpenAdmin,
    RequestLogin,
    ConfirmLogin,
    SignOut,
    SubmitUser,
    DeleteUser,
    Export(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Which text input insert mode is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTarget {
    EventForm,
    Comment,
    UserForm,
    Login,
}

pub fn insert_target(state: &AppState) -> Option<InsertTarget> {
    match state.page {
        Page::Calendar => {
            if state.calendar.modal_form().is_some() {
                Some(InsertTarget::EventForm)
            } else if state.calendar.thread().is_some() {
                Some(InsertTarget::Comment)
            } else {
                None
            }
        }
        Page::Admin => {
            if state.admin.form().is_some() {
                Some(InsertTarget::UserForm)
            } else if !state.admin.is_authenticated() {
                Some(InsertTarget::Login)
            } else {
                None
            }
        }
    }
}

/// Keeps the calendar's permissions in step with whoever is signed in.
async fn sync_current_user(state: &mut AppState) {
    let user = state.admin.signed_in_user().cloned();
    if state.calendar.current_user() != user.as_ref() {
        state.calendar.set_current_user(user);
        state.calendar.load().await;
    }
}

/// Picks up a session saved by an earlier run so the calendar opens with the right permissions.
pub async fn restore_session(state: &mut AppState) {
    state.admin.check_session().await;
    sync_current_user(state).await;
}

async fn enter_admin(state: &mut AppState) {
    state.page = Page::Admin;
    state.admin.seed_users().await;
    state.admin.check_session().await;
    sync_current_user(state).await;
    if state.admin.is_authenticated() {
        state.admin.load_users().await;
        state.admin.subscribe().await;
        state.mode = Mode::Normal;
    } else {
        state.mode = Mode::Insert;
    }
}

pub async fn perform(state: &mut AppState, action: Action) -> Flow {
    tracing::debug!("Performing {:?}", action);
    match action {
        Action::Quit => return Flow::Quit,
        Action::Refresh => match state.page {
            Page::Calendar => state.calendar.refresh().await,
            Page::Admin => state.admin.load_users().await,
        },
        Action::SaveEvent => {
            let _ = state.calendar.save().await;
            if state.calendar.modal_form().is_none() {
                state.mode = Mode::Normal;
            }
        }
        Action::ConfirmDelete => {
            let _ = state.calendar.confirm_delete().await;
            state.mode = Mode::Normal;
        }
        Action::OpenComments(event_id) => {
            state.mode = match state.calendar.open_thread(&event_id).await {
                Ok(()) => Mode::Insert,
                Err(_) => Mode::Normal,
            };
        }
        Action::PostComment => {
            let _ = state.calendar.post_comment().await;
        }
        Action::OpenAdmin => enter_admin(state).await,
        Action::RequestLogin => {
            let _ = state.admin.request_login().await;
        }
        Action::ConfirmLogin => {
            let _ = state.admin.confirm_link().await;
            sync_current_user(state).await;
            if state.admin.is_authenticated() {
                state.admin.load_users().await;
                state.admin.subscribe().await;
                state.mode = Mode::Normal;
            }
        }
        Action::SignOut => {
            state.admin.sign_out().await;
            sync_current_user(state).await;
            state.mode = Mode::Insert;
        }
        Action::SubmitUser => {
            let _ = state.admin.submit_form().await;
            if state.admin.form().is_none() || !state.admin.is_authenticated() {
                state.mode = if state.admin.is_authenticated() { Mode::Normal } else { Mode::Insert };
            }
        }
        Action::DeleteUser => {
            let _ = state.admin.confirm_delete().await;
            state.mode = if state.admin.is_authenticated() { Mode::Normal } else { Mode::Insert };
        }
        Action::Export(path) => {
            let report = state.calendar.export_report(Utc::now());
            let notice = match write_report(&path, &report) {
                Ok(()) => Notice::success(format!("Exported timeline to {}", path.display())),
                Err(e) => {
                    tracing::error!("Export to {} failed: {}", path.display(), e);
                    Notice::error(format!("Failed to export timeline: {}", e))
                }
            };
            state.calendar.set_notice(notice);
        }
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AdminPage, AuthState, CalendarPage, Modal};
    use crate::auth::MemoryAuth;
    use crate::backend::MemoryBackend;
    use crate::calendar::Role;
    use crate::store::{EventStore, UserStore};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn state() -> (Arc<MemoryAuth>, AppState) {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());
        let users = UserStore::new(backend.clone(), auth.clone());
        users.ensure_bootstrap().await.unwrap();
        let mut calendar = CalendarPage::new(EventStore::new(backend), NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        calendar.load().await;
        (auth, AppState::new(calendar, AdminPage::new(users)))
    }

    #[tokio::test]
    async fn opening_admin_without_session_asks_for_login() {
        let (_, mut state) = state().await;

        perform(&mut state, Action::OpenAdmin).await;

        assert_eq!(state.page, Page::Admin);
        assert_eq!(state.admin.auth_state(), &AuthState::Unauthenticated);
        assert_eq!(insert_target(&state), Some(InsertTarget::Login));
        assert_eq!(state.mode, Mode::Insert);
    }

    #[tokio::test]
    async fn login_grants_calendar_permissions() {
        let (auth, mut state) = state().await;
        perform(&mut state, Action::OpenAdmin).await;
        state.admin.login_mut().email = "admin@oiaa.edu".to_string();
        perform(&mut state, Action::RequestLogin).await;
        state.admin.login_mut().code = auth.pending_code("admin@oiaa.edu").unwrap();

        perform(&mut state, Action::ConfirmLogin).await;

        assert!(state.admin.is_authenticated());
        assert_eq!(state.calendar.current_user().map(|u| u.role), Some(Role::Admin));
        assert_eq!(state.admin.users().len(), 3);
        assert_eq!(state.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn restore_without_session_keeps_guest() {
        let (_, mut state) = state().await;

        restore_session(&mut state).await;

        assert_eq!(state.page, Page::Calendar);
        assert!(state.calendar.current_user().is_none());
        assert_eq!(state.admin.auth_state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn first_admin_can_sign_in_on_empty_users_table() {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());
        let users = UserStore::new(backend.clone(), auth.clone());
        let calendar = CalendarPage::new(EventStore::new(backend.clone()), NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        let mut state = AppState::new(calendar, AdminPage::new(users));

        perform(&mut state, Action::OpenAdmin).await;
        state.admin.login_mut().email = "admin@oiaa.edu".to_string();
        perform(&mut state, Action::RequestLogin).await;

        assert!(state.admin.login().link_sent);
        assert_eq!(state.admin.notice().map(|n| n.level), Some(crate::app::NoticeLevel::Info));
        let seeded = UserStore::new(backend, auth.clone()).list_all().await.unwrap();
        assert_eq!(seeded.len(), 3);

        state.admin.login_mut().code = auth.pending_code("admin@oiaa.edu").unwrap();
        perform(&mut state, Action::ConfirmLogin).await;
        assert!(state.admin.is_authenticated());
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (_, mut state) = state().await;
        assert_eq!(perform(&mut state, Action::Quit).await, Flow::Quit);
    }

    #[tokio::test]
    async fn failed_save_stays_in_insert_mode() {
        let (auth, mut state) = state().await;
        perform(&mut state, Action::OpenAdmin).await;
        state.admin.login_mut().email = "admin@oiaa.edu".to_string();
        perform(&mut state, Action::RequestLogin).await;
        state.admin.login_mut().code = auth.pending_code("admin@oiaa.edu").unwrap();
        perform(&mut state, Action::ConfirmLogin).await;
        state.page = Page::Calendar;

        state.calendar.open_new().unwrap();
        state.mode = Mode::Insert;
        perform(&mut state, Action::SaveEvent).await;

        assert!(matches!(state.calendar.modal(), Modal::Open { .. }));
        assert_eq!(state.mode, Mode::Insert);
    }

    #[tokio::test]
    async fn export_writes_file_and_reports() {
        let (_, mut state) = state().await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timeline.txt");

        perform(&mut state, Action::Export(path.clone())).await;

        assert!(path.exists());
        assert!(state.calendar.notice().unwrap().message.starts_with("Exported timeline"));
    }
}
