pub mod gotrue;
pub mod memory;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gotrue::GoTrueClient;
pub use memory::MemoryAuth;
pub use session::{Session, SessionStorage};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read session file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse session: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Session has expired")]
    SessionExpired,
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("Invalid or expired login code")]
    InvalidToken,
    #[error("A login identity for {0} is already registered")]
    AlreadyRegistered(String),
    #[error("No login identity found for {0}")]
    IdentityNotFound(String),
    #[error("Identity administration is not configured")]
    AdminUnavailable,
    #[error("Auth error: {0}")]
    AuthFailed(String),
}

/// The backend's view of a signed-in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The live session, refreshed if close to expiry, or `None` when signed out.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    async fn send_magic_link(&self, email: &str) -> Result<(), AuthError>;

    async fn verify_magic_link(&self, email: &str, token: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn admin_create_user(&self, email: &str) -> Result<AuthUser, AuthError>;

    async fn admin_find_user(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;

    async fn admin_delete_user(&self, id: &str) -> Result<(), AuthError>;
}
