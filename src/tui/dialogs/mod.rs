pub mod comments;
pub mod delete_confirmation;
pub mod event_form;
pub mod filters;
pub mod help;
