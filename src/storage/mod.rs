pub mod config;
pub mod local;

pub use config::{Config, ConfigError};
pub use local::{LocalStorage, LocalStorageError};
