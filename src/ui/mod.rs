pub mod month_view;
pub mod theme;
pub mod timeline_view;
