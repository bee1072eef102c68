use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use crossterm::event::KeyCode;

use super::Action;
use crate::app::{AppState, Mode, Notice, Page, ViewMode};
use crate::calendar::EventType;
use crate::calendar::filter::DEFAULT_FILTER_COLOR;
use crate::grid::parse_day;
use crate::ui::theme::Theme;

#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Refresh,
    Goto(NaiveDate),
    Today,
    NewEvent(Option<String>),
    View(ViewMode),
    Filter(EventType),
    Tag { name: String, color: String },
    Export(PathBuf),
    Theme(String),
    Admin,
    Calendar,
    Login(String),
    Logout,
    Help,
    Error(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();

    let Some(command_text) = trimmed.strip_prefix(':') else {
        return Command::Error("Commands must start with ':'".to_string());
    };
    let parts: Vec<&str> = command_text.split_whitespace().collect();

    if parts.is_empty() {
        return Command::Error("Empty command".to_string());
    }

    match parts[0] {
        "q" | "quit" => Command::Quit,
        "r" | "refresh" => Command::Refresh,
        "help" => Command::Help,
        "today" => Command::Today,
        "admin" => Command::Admin,
        "cal" | "calendar" => Command::Calendar,
        "logout" => Command::Logout,
        "goto" => {
            if parts.len() < 2 {
                Command::Error("goto requires a date argument".to_string())
            } else if let Ok(date) = parse_day(parts[1]) {
                Command::Goto(date)
            } else {
                Command::Error(format!("Invalid date format: {}", parts[1]))
            }
        }
        "new" => {
            if parts.len() < 2 {
                Command::NewEvent(None)
            } else {
                Command::NewEvent(Some(parts[1..].join(" ")))
            }
        }
        "view" => match parts.get(1) {
            None => Command::Error("view requires calendar or timeline".to_string()),
            Some(name) => ViewMode::from_name(name)
                .map(Command::View)
                .unwrap_or_else(|| Command::Error(format!("Unknown view: {}", name))),
        },
        "filter" => match parts.get(1) {
            None => Command::Error("filter requires an event type".to_string()),
            Some(name) => name
                .parse::<EventType>()
                .map(Command::Filter)
                .unwrap_or_else(|e| Command::Error(e.to_string())),
        },
        "tag" => {
            if parts.len() < 2 {
                return Command::Error("tag requires a name".to_string());
            }
            let (name_parts, color) = match parts.last() {
                Some(last) if parts.len() > 2 && last.starts_with('#') => {
                    (&parts[1..parts.len() - 1], last.to_string())
                }
                _ => (&parts[1..], DEFAULT_FILTER_COLOR.to_string()),
            };
            Command::Tag {
                name: name_parts.join(" "),
                color,
            }
        }
        "export" => {
            if parts.len() < 2 {
                Command::Error("export requires a file path".to_string())
            } else {
                Command::Export(PathBuf::from(parts[1..].join(" ")))
            }
        }
        "theme" => {
            if parts.len() < 2 {
                Command::Error("theme requires a theme name".to_string())
            } else {
                Command::Theme(parts[1].to_string())
            }
        }
        "login" => {
            if parts.len() < 2 {
                Command::Error("login requires an email address".to_string())
            } else {
                Command::Login(parts[1].to_string())
            }
        }
        _ => Command::Error(format!("Unknown command: {}", parts[0])),
    }
}

fn report_error(state: &mut AppState, message: String) {
    tracing::debug!("Command error: {}", message);
    match state.page {
        Page::Calendar => state.calendar.set_notice(Notice::error(message)),
        Page::Admin => state.admin.set_notice(Notice::error(message)),
    }
}

/// Applies a parsed command. View-only commands take effect immediately;
/// anything that touches the backend comes back as an [`Action`].
pub fn execute(command: Command, state: &mut AppState) -> Option<Action> {
    match command {
        Command::Quit => return Some(Action::Quit),
        Command::Refresh => return Some(Action::Refresh),
        Command::Admin => return Some(Action::OpenAdmin),
        Command::Logout => return Some(Action::SignOut),
        Command::Export(path) => return Some(Action::Export(path)),
        Command::Help => {
            state.show_help = true;
            state.help_scroll = 0;
        }
        Command::Goto(date) => {
            state.page = Page::Calendar;
            state.calendar.select_date(date);
        }
        Command::Today => {
            state.page = Page::Calendar;
            state.calendar.today(Local::now().date_naive());
        }
        Command::View(view_mode) => {
            state.page = Page::Calendar;
            state.calendar.set_view_mode(view_mode);
        }
        Command::Filter(event_type) => state.calendar.toggle_filter(event_type),
        Command::Tag { name, color } => {
            let _ = state.calendar.add_custom_filter(&name, &color);
        }
        Command::Theme(name) => {
            if Theme::available_themes().contains(&name.as_str()) {
                state.theme = Theme::get_by_name(&name);
            } else {
                report_error(state, format!("Unknown theme: {}", name));
            }
        }
        Command::Calendar => state.page = Page::Calendar,
        Command::NewEvent(title) => {
            state.page = Page::Calendar;
            let opened = match title {
                Some(title) => state.calendar.open_new_with_title(&title),
                None => state.calendar.open_new(),
            };
            if opened.is_ok() {
                state.mode = Mode::Insert;
            }
        }
        Command::Login(email) => {
            state.page = Page::Admin;
            state.admin.login_mut().email = email;
            state.mode = Mode::Insert;
            return Some(Action::RequestLogin);
        }
        Command::Error(message) => report_error(state, message),
    }
    None
}

pub fn handle_key(key: KeyCode, state: &mut AppState) -> Option<Action> {
    match key {
        KeyCode::Enter => {
            let command = parse_command(&state.command_buffer);
            state.leave_command_mode();
            execute(command, state)
        }
        KeyCode::Esc => {
            state.leave_command_mode();
            None
        }
        KeyCode::Backspace => {
            state.command_buffer.pop();
            if state.command_buffer.is_empty() {
                state.mode = Mode::Normal;
            }
            None
        }
        KeyCode::Char(c) => {
            state.command_buffer.push(c);
            None
        }
        _ => None,
    }
}
