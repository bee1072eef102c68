pub mod comment;
pub mod event;
pub mod filter;
pub mod sample_data;
pub mod user;

pub use comment::{EventComment, NewComment};
pub use event::{CalendarEvent, EventData, EventError, EventType};
pub use filter::{ActiveFilters, CustomFilter};
pub use user::{NewUser, Permissions, Role, User, UserUpdate};
