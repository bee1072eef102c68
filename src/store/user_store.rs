use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::Feed;
use crate::auth::{AuthError, AuthProvider, Session};
use crate::backend::{Backend, BackendError, ChannelSpec, Query};
use crate::calendar::user::{normalize_email, BOOTSTRAP_USERS};
use crate::calendar::{NewUser, Permissions, Role, User, UserUpdate};

pub const USERS_TABLE: &str = "users";

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("A user with email {0} already exists")]
    AlreadyExists(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
}

pub fn decode_user(row: &Value) -> Result<User, BackendError> {
    let row: UserRow = serde_json::from_value(row.clone())
        .map_err(|e| BackendError::InvalidRecord(e.to_string()))?;
    Ok(User {
        role: row
            .role
            .parse()
            .map_err(|e: crate::calendar::user::UnknownRole| BackendError::InvalidRecord(e.to_string()))?,
        id: row.id,
        email: row.email,
        name: row.name,
    })
}

fn validate(name: &str, email: &str) -> Result<(), UserStoreError> {
    if name.trim().is_empty() {
        return Err(UserStoreError::Invalid("Name is required".to_string()));
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(UserStoreError::Invalid("A valid email is required".to_string()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserStore {
    backend: Arc<dyn Backend>,
    auth: Arc<dyn AuthProvider>,
}

impl UserStore {
    pub fn new(backend: Arc<dyn Backend>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { backend, auth }
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    /// Row access follows the signed-in session, or the anonymous key without one.
    pub fn use_session(&self, session: Option<&Session>) {
        self.backend
            .set_access_token(session.map(|s| s.access_token.clone()));
    }

    pub async fn list_all(&self) -> Result<Vec<User>, BackendError> {
        let rows = self
            .backend
            .select(USERS_TABLE, &Query::new().order_by("name", true))
            .await?;
        rows.iter().map(decode_user).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, BackendError> {
        let rows = self.backend.select(USERS_TABLE, &Query::new().eq("id", id)).await?;
        rows.first().map(decode_user).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, BackendError> {
        let rows = self
            .backend
            .select(USERS_TABLE, &Query::new().eq("email", normalize_email(email)))
            .await?;
        rows.first().map(decode_user).transpose()
    }

    /// Provisions a login identity, then the profile row. A freshly provisioned
    /// identity is removed again if the profile cannot be stored.
    pub async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        validate(&new_user.name, &new_user.email)?;
        let email = normalize_email(&new_user.email);

        let (id, provisioned) = match self.auth.admin_create_user(&email).await {
            Ok(identity) => (identity.id, true),
            Err(AuthError::AdminUnavailable) => {
                tracing::warn!("Identity administration unavailable, using a local id for {}", email);
                (Uuid::new_v4().to_string(), false)
            }
            Err(AuthError::AlreadyRegistered(_)) => match self.auth.admin_find_user(&email).await? {
                Some(identity) => (identity.id, false),
                None => return Err(AuthError::IdentityNotFound(email).into()),
            },
            Err(e) => return Err(e.into()),
        };

        let row = json!({
            "id": id,
            "email": email,
            "name": new_user.name.trim(),
            "role": new_user.role,
        });

        match self.backend.insert(USERS_TABLE, row).await {
            Ok(row) => {
                let user = decode_user(&row)?;
                tracing::info!("Created user {} ({})", user.email, user.role);
                Ok(user)
            }
            Err(err) => {
                if provisioned {
                    if let Err(rollback) = self.auth.admin_delete_user(&id).await {
                        tracing::error!("Failed to remove identity {} after profile insert failed: {}", id, rollback);
                    }
                }
                match err {
                    BackendError::Conflict(_) => Err(UserStoreError::AlreadyExists(email)),
                    other => Err(other.into()),
                }
            }
        }
    }

    pub async fn update(&self, id: &str, update: UserUpdate) -> Result<User, UserStoreError> {
        let mut patch = Map::new();
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(UserStoreError::Invalid("Name is required".to_string()));
            }
            patch.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(email) = &update.email {
            validate("-", email)?;
            patch.insert("email".to_string(), json!(normalize_email(email)));
        }
        if let Some(role) = update.role {
            patch.insert("role".to_string(), json!(role));
        }

        match self.backend.update(USERS_TABLE, id, Value::Object(patch)).await {
            Ok(row) => Ok(decode_user(&row)?),
            Err(BackendError::Conflict(_)) => Err(UserStoreError::AlreadyExists(
                update.email.as_deref().map(normalize_email).unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_role(&self, id: &str, role: Role) -> Result<User, UserStoreError> {
        self.update(id, UserUpdate { role: Some(role), ..UserUpdate::default() }).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), BackendError> {
        tracing::info!("Deleting user {}", id);
        self.backend.delete(USERS_TABLE, id).await
    }

    /// False whenever the session probe or profile lookup fails.
    pub async fn is_current_user_admin(&self) -> bool {
        let session = match self.auth.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("Session probe failed: {}", e);
                return false;
            }
        };
        self.use_session(Some(&session));

        match self.find_by_id(&session.user.id).await {
            Ok(Some(user)) => user.role.is_admin(),
            Ok(None) => false,
            Err(e) => {
                tracing::error!("Admin check failed: {}", e);
                false
            }
        }
    }

    pub fn permissions_for(&self, role: Role) -> Permissions {
        role.permissions()
    }

    /// Seeds the fixed starting users into an empty table.
    pub async fn ensure_bootstrap(&self) -> Result<Vec<User>, UserStoreError> {
        let existing = self.list_all().await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        tracing::info!("Users table is empty, seeding bootstrap users");
        for (email, name, role) in BOOTSTRAP_USERS {
            match self.create(NewUser::new(email, name, role)).await {
                Ok(_) | Err(UserStoreError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.list_all().await?)
    }

    pub async fn subscribe(&self) -> Result<Feed<User>, BackendError> {
        let subscription = self
            .backend
            .subscribe(ChannelSpec::table(USERS_TABLE).named("users-changes"))
            .await?;
        Ok(Feed::new(subscription, decode_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthUser, MemoryAuth, MockAuthProvider};
    use crate::backend::{MemoryBackend, MockBackend};

    fn stores() -> (Arc<MemoryBackend>, Arc<MemoryAuth>, UserStore) {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());
        let store = UserStore::new(backend.clone(), auth.clone());
        (backend, auth, store)
    }

    #[tokio::test]
    async fn create_normalizes_email_and_uses_identity_id() {
        let (_, auth, store) = stores();

        let user = store
            .create(NewUser::new("  New.Staff@OIAA.edu ", "New Staff", Role::Editor))
            .await
            .unwrap();

        assert_eq!(user.email, "new.staff@oiaa.edu");
        let identity = auth.admin_find_user("new.staff@oiaa.edu").await.unwrap().unwrap();
        assert_eq!(identity.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists_and_count_unchanged() {
        let (backend, _, store) = stores();
        store
            .create(NewUser::new("admin@oiaa.edu", "OIAA Administrator", Role::Admin))
            .await
            .unwrap();

        let result = store
            .create(NewUser::new("ADMIN@oiaa.edu", "Someone Else", Role::Viewer))
            .await;

        assert!(matches!(result, Err(UserStoreError::AlreadyExists(email)) if email == "admin@oiaa.edu"));
        assert_eq!(backend.row_count(USERS_TABLE), 1);
    }

    #[tokio::test]
    async fn existing_identity_is_reused() {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new().with_identity("identity-7", "late@oiaa.edu"));
        let store = UserStore::new(backend, auth);

        let user = store
            .create(NewUser::new("late@oiaa.edu", "Late Joiner", Role::Viewer))
            .await
            .unwrap();

        assert_eq!(user.id, "identity-7");
    }

    #[tokio::test]
    async fn missing_admin_capability_falls_back_to_local_id() {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let store = UserStore::new(backend.clone(), Arc::new(MemoryAuth::without_admin()));

        let user = store
            .create(NewUser::new("x@oiaa.edu", "X", Role::Viewer))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(backend.row_count(USERS_TABLE), 1);
    }

    #[tokio::test]
    async fn failed_profile_insert_rolls_back_new_identity() {
        let mut auth = MockAuthProvider::new();
        auth.expect_admin_create_user().times(1).returning(|email| {
            Ok(AuthUser {
                id: "identity-1".to_string(),
                email: Some(email.to_string()),
            })
        });
        auth.expect_admin_delete_user()
            .times(1)
            .returning(|id| {
                assert_eq!(id, "identity-1");
                Ok(())
            });

        let mut backend = MockBackend::new();
        backend.expect_insert().times(1).returning(|_, _| {
            Err(BackendError::Status {
                status: 500,
                message: "boom".to_string(),
            })
        });

        let store = UserStore::new(Arc::new(backend), Arc::new(auth));
        let result = store.create(NewUser::new("x@oiaa.edu", "X", Role::Viewer)).await;

        assert!(matches!(result, Err(UserStoreError::Backend(BackendError::Status { status: 500, .. }))));
    }

    #[tokio::test]
    async fn reused_identity_is_not_rolled_back() {
        let mut auth = MockAuthProvider::new();
        auth.expect_admin_create_user()
            .returning(|email| Err(AuthError::AlreadyRegistered(email.to_string())));
        auth.expect_admin_find_user().returning(|email| {
            Ok(Some(AuthUser {
                id: "existing".to_string(),
                email: Some(email.to_string()),
            }))
        });
        auth.expect_admin_delete_user().never();

        let mut backend = MockBackend::new();
        backend
            .expect_insert()
            .returning(|_, _| Err(BackendError::Conflict("users_email_key".to_string())));

        let store = UserStore::new(Arc::new(backend), Arc::new(auth));
        let result = store.create(NewUser::new("x@oiaa.edu", "X", Role::Viewer)).await;

        assert!(matches!(result, Err(UserStoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_provisioning() {
        let mut auth = MockAuthProvider::new();
        auth.expect_admin_create_user().never();
        let store = UserStore::new(Arc::new(MemoryBackend::for_calendar()), Arc::new(auth));

        let result = store.create(NewUser::new("x@oiaa.edu", " ", Role::Viewer)).await;

        assert!(matches!(result, Err(UserStoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn bootstrap_seeds_only_empty_table() {
        let (backend, _, store) = stores();

        let users = store.ensure_bootstrap().await.unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].name, "Event Coordinator");

        store.ensure_bootstrap().await.unwrap();
        assert_eq!(backend.row_count(USERS_TABLE), 3);
    }

    #[tokio::test]
    async fn update_role_changes_only_role() {
        let (_, _, store) = stores();
        let user = store
            .create(NewUser::new("a@oiaa.edu", "A", Role::Viewer))
            .await
            .unwrap();

        let updated = store.update_role(&user.id, Role::Editor).await.unwrap();

        assert_eq!(updated.role, Role::Editor);
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.name, user.name);
    }

    #[tokio::test]
    async fn admin_check_follows_stored_role() {
        let (_, auth, store) = stores();
        store.ensure_bootstrap().await.unwrap();

        assert!(!store.is_current_user_admin().await);

        auth.send_magic_link("admin@oiaa.edu").await.unwrap();
        let code = auth.pending_code("admin@oiaa.edu").unwrap();
        auth.verify_magic_link("admin@oiaa.edu", &code).await.unwrap();
        assert!(store.is_current_user_admin().await);

        auth.sign_out().await.unwrap();
        auth.send_magic_link("assistant@oiaa.edu").await.unwrap();
        let code = auth.pending_code("assistant@oiaa.edu").unwrap();
        auth.verify_magic_link("assistant@oiaa.edu", &code).await.unwrap();
        assert!(!store.is_current_user_admin().await);
    }

    #[tokio::test]
    async fn admin_check_is_false_when_probe_fails() {
        let mut auth = MockAuthProvider::new();
        auth.expect_current_session()
            .returning(|| Err(AuthError::AuthFailed("offline".to_string())));
        let store = UserStore::new(Arc::new(MemoryBackend::for_calendar()), Arc::new(auth));

        assert!(!store.is_current_user_admin().await);
    }
}
