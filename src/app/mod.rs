pub mod admin_page;
pub mod calendar_page;
pub mod event_form;
pub mod user_form;

use std::fmt::Display;

use thiserror::Error;

use crate::ui::theme::Theme;

pub use admin_page::{AdminPage, AuthState, LoginField, LoginForm, UsersState};
pub use calendar_page::{CalendarPage, CommentThread, EventsState, Modal, ModalTarget, ViewMode};
pub use event_form::{EventForm, FormError, FormField};
pub use user_form::{UserField, UserForm};

/// Why a page action did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("A user with this email already exists.")]
    Conflict,
    #[error("Failed to {action}: {cause}")]
    Backend { action: String, cause: String },
}

impl ActionError {
    pub fn backend(action: &str, cause: impl Display) -> Self {
        ActionError::Backend {
            action: action.to_string(),
            cause: cause.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// An inline message shown until the next action replaces or clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

impl From<&ActionError> for Notice {
    fn from(err: &ActionError) -> Self {
        Notice::error(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Command,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Calendar,
    Admin,
}

pub struct AppState {
    pub mode: Mode,
    pub page: Page,
    pub calendar: CalendarPage,
    pub admin: AdminPage,
    pub command_buffer: String,
    pub show_help: bool,
    pub help_scroll: usize,
    pub show_filters: bool,
    pub theme: Theme,
    pub date_format: String,
}

impl AppState {
    pub fn new(calendar: CalendarPage, admin: AdminPage) -> Self {
        Self {
            mode: Mode::Normal,
            page: Page::Calendar,
            calendar,
            admin,
            command_buffer: String::new(),
            show_help: false,
            help_scroll: 0,
            show_filters: false,
            theme: Theme::default(),
            date_format: crate::grid::DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    /// The notice for whichever page is showing.
    pub fn notice(&self) -> Option<&Notice> {
        match self.page {
            Page::Calendar => self.calendar.notice(),
            Page::Admin => self.admin.notice(),
        }
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_buffer = ":".to_string();
    }

    pub fn leave_command_mode(&mut self) {
        self.command_buffer.clear();
        self.mode = Mode::Normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_names_the_action() {
        let err = ActionError::backend("save event", "connection refused");
        assert_eq!(err.to_string(), "Failed to save event: connection refused");
    }

    #[test]
    fn conflict_has_fixed_message() {
        assert_eq!(ActionError::Conflict.to_string(), "A user with this email already exists.");
    }

    #[test]
    fn notice_from_error_is_error_level() {
        let notice = Notice::from(&ActionError::Validation("Title is required".to_string()));
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Title is required");
    }
}
