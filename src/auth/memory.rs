use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{AuthError, AuthProvider, AuthUser, Session};
use crate::calendar::user::normalize_email;

/// Identity service kept in process. Login codes are not emailed; demo mode
/// reads them back with [`MemoryAuth::pending_code`].
pub struct MemoryAuth {
    identities: Mutex<HashMap<String, AuthUser>>,
    pending: Mutex<HashMap<String, String>>,
    session: Mutex<Option<Session>>,
    admin_enabled: bool,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            admin_enabled: true,
        }
    }

    pub fn without_admin() -> Self {
        Self {
            admin_enabled: false,
            ..Self::new()
        }
    }

    pub fn with_identity(self, id: &str, email: &str) -> Self {
        let email = normalize_email(email);
        lock(&self.identities).insert(
            email.clone(),
            AuthUser {
                id: id.to_string(),
                email: Some(email),
            },
        );
        self
    }

    pub fn pending_code(&self, email: &str) -> Option<String> {
        lock(&self.pending).get(&normalize_email(email)).cloned()
    }

    pub fn identity_count(&self) -> usize {
        lock(&self.identities).len()
    }

    fn require_admin(&self) -> Result<(), AuthError> {
        if self.admin_enabled {
            Ok(())
        } else {
            Err(AuthError::AdminUnavailable)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn login_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let session = lock(&self.session).clone();
        Ok(session.filter(Session::is_valid))
    }

    async fn send_magic_link(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !lock(&self.identities).contains_key(&email) {
            return Err(AuthError::AuthFailed("Signups not allowed for otp".to_string()));
        }
        let code = login_code();
        tracing::info!("Login code for {} is {}", email, code);
        lock(&self.pending).insert(email, code);
        Ok(())
    }

    async fn verify_magic_link(&self, email: &str, token: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let expected = lock(&self.pending).get(&email).cloned();
        if expected.as_deref() != Some(token.trim()) {
            return Err(AuthError::InvalidToken);
        }
        lock(&self.pending).remove(&email);

        let user = lock(&self.identities)
            .get(&email)
            .cloned()
            .ok_or_else(|| AuthError::IdentityNotFound(email.clone()))?;
        let session = Session::new(Uuid::new_v4().to_string(), 3600, user)
            .with_refresh_token(Uuid::new_v4().to_string());

        *lock(&self.session) = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *lock(&self.session) = None;
        Ok(())
    }

    async fn admin_create_user(&self, email: &str) -> Result<AuthUser, AuthError> {
        self.require_admin()?;
        let email = normalize_email(email);
        let mut identities = lock(&self.identities);
        if identities.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered(email));
        }
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.clone()),
        };
        identities.insert(email, user.clone());
        Ok(user)
    }

    async fn admin_find_user(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        self.require_admin()?;
        Ok(lock(&self.identities).get(&normalize_email(email)).cloned())
    }

    async fn admin_delete_user(&self, id: &str) -> Result<(), AuthError> {
        self.require_admin()?;
        let mut identities = lock(&self.identities);
        let before = identities.len();
        identities.retain(|_, user| user.id != id);
        if identities.len() == before {
            return Err(AuthError::IdentityNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_must_be_confirmed_before_session_exists() {
        let auth = MemoryAuth::new().with_identity("u1", "admin@oiaa.edu");

        auth.send_magic_link("admin@oiaa.edu").await.unwrap();
        assert_eq!(auth.current_session().await.unwrap(), None);

        let code = auth.pending_code("admin@oiaa.edu").unwrap();
        let session = auth.verify_magic_link("admin@oiaa.edu", &code).await.unwrap();

        assert_eq!(session.user.id, "u1");
        assert_eq!(auth.current_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn wrong_code_is_rejected() {
        let auth = MemoryAuth::new().with_identity("u1", "admin@oiaa.edu");
        auth.send_magic_link("admin@oiaa.edu").await.unwrap();

        let result = auth.verify_magic_link("admin@oiaa.edu", "not-a-code").await;

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_email_cannot_request_link() {
        let auth = MemoryAuth::new();
        assert!(auth.send_magic_link("nobody@oiaa.edu").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_identity_is_already_registered() {
        let auth = MemoryAuth::new();
        auth.admin_create_user("a@oiaa.edu").await.unwrap();

        let result = auth.admin_create_user("A@oiaa.edu").await;

        assert!(matches!(result, Err(AuthError::AlreadyRegistered(_))));
        assert_eq!(auth.identity_count(), 1);
    }

    #[tokio::test]
    async fn admin_calls_fail_when_disabled() {
        let auth = MemoryAuth::without_admin();
        assert!(matches!(
            auth.admin_create_user("a@oiaa.edu").await,
            Err(AuthError::AdminUnavailable)
        ));
    }
}
