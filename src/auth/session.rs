use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthUser};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[allow(dead_code)]
    pub token_type: String,
    pub user: AuthUser,
}

impl Session {
    pub fn new(access_token: String, expires_in_seconds: i64, user: AuthUser) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_seconds),
            token_type: "bearer".to_string(),
            user,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }
}

/// Keeps the signed-in session across runs.
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Session, AuthError> {
        let content = std::fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&content)?;
        Ok(session)
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        session.expires_at <= Utc::now()
    }

    pub fn needs_refresh(&self, session: &Session) -> bool {
        let buffer = chrono::Duration::minutes(5);
        session.expires_at <= Utc::now() + buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_session() -> Session {
        Session::new(
            "test_access_token".to_string(),
            3600,
            AuthUser {
                id: "user-1".to_string(),
                email: Some("admin@oiaa.edu".to_string()),
            },
        )
    }

    fn create_expired_session() -> Session {
        Session {
            expires_at: Utc::now() - chrono::Duration::hours(1),
            ..create_test_session().with_refresh_token("refresh_token".to_string())
        }
    }

    #[test]
    fn new_session_is_valid() {
        assert!(create_test_session().is_valid());
    }

    #[test]
    fn expired_session_is_not_valid() {
        assert!(!create_expired_session().is_valid());
    }

    #[test]
    fn save_and_load_session() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(temp_dir.path().join("nested").join("session.json"));
        let original = create_test_session().with_refresh_token("refresh".to_string());

        storage.save(&original).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, original);
        assert_eq!(loaded.email(), Some("admin@oiaa.edu"));
    }

    #[test]
    fn load_nonexistent_session_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(temp_dir.path().join("missing.json"));

        assert!(storage.load().is_err());
    }

    #[test]
    fn clear_removes_file_and_tolerates_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let storage = SessionStorage::new(path.clone());

        storage.save(&create_test_session()).unwrap();
        storage.clear().unwrap();
        assert!(!path.exists());
        assert!(storage.clear().is_ok());
    }

    #[test]
    fn needs_refresh_detects_soon_to_expire_session() {
        let storage = SessionStorage::new(PathBuf::from("/tmp/session.json"));
        let session = Session {
            expires_at: Utc::now() + chrono::Duration::minutes(3),
            ..create_test_session()
        };

        assert!(storage.needs_refresh(&session));
        assert!(!storage.is_expired(&session));
    }

    #[test]
    fn needs_refresh_returns_false_for_fresh_session() {
        let storage = SessionStorage::new(PathBuf::from("/tmp/session.json"));
        assert!(!storage.needs_refresh(&create_test_session()));
    }
}
