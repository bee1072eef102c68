pub mod app;
pub mod auth;
pub mod backend;
pub mod calendar;
pub mod export;
pub mod grid;
pub mod input;
pub mod services;
pub mod storage;
pub mod store;
pub mod timeline;
pub mod ui;

pub use app::{AppState, Mode, Page};
pub use calendar::{CalendarEvent, EventType, Role, User};
pub use services::Services;

pub use input::{Action, Flow, command_mode, normal_mode};
