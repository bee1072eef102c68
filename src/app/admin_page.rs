use super::{ActionError, Notice, UserForm};
use crate::auth::{AuthError, Session};
use crate::calendar::User;
use crate::store::{Change, Feed, UserStore, UserStoreError};

pub const ACCESS_DENIED: &str = "Access denied. Please contact your administrator.";
pub const LINK_SENT: &str = "Check your email for a login link!";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Checking,
    Authenticated { session: Session, user: User },
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UsersState {
    Loading,
    Loaded(Vec<User>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Code,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub code: String,
    pub field: LoginField,
    pub link_sent: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: String::new(),
            code: String::new(),
            field: LoginField::Email,
            link_sent: false,
        }
    }
}

impl LoginForm {
    pub fn active_buffer_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Code => &mut self.code,
        }
    }
}

fn store_error(action: &str, err: UserStoreError) -> ActionError {
    match err {
        UserStoreError::AlreadyExists(_) => ActionError::Conflict,
        UserStoreError::Invalid(message) => ActionError::Validation(message),
        other => ActionError::backend(action, other),
    }
}

/// Sign-in state and user management. Every management action re-checks that
/// the session still belongs to an administrator.
pub struct AdminPage {
    store: UserStore,
    auth: AuthState,
    profile: Option<User>,
    login: LoginForm,
    users: UsersState,
    form: Option<UserForm>,
    form_error: Option<String>,
    pending_delete: Option<String>,
    selected: usize,
    feed: Option<Feed<User>>,
    notice: Option<Notice>,
}

impl AdminPage {
    pub fn new(store: UserStore) -> Self {
        Self {
            store,
            auth: AuthState::Checking,
            profile: None,
            login: LoginForm::default(),
            users: UsersState::Loading,
            form: None,
            form_error: None,
            pending_delete: None,
            selected: 0,
            feed: None,
            notice: None,
        }
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    /// The signed-in user's profile, admin or not.
    pub fn signed_in_user(&self) -> Option<&User> {
        self.profile.as_ref()
    }

    pub fn login(&self) -> &LoginForm {
        &self.login
    }

    pub fn login_mut(&mut self) -> &mut LoginForm {
        &mut self.login
    }

    pub fn users_state(&self) -> &UsersState {
        &self.users
    }

    pub fn users(&self) -> &[User] {
        match &self.users {
            UsersState::Loaded(users) => users,
            _ => &[],
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.users().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let count = self.users().len();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_prev(&mut self) {
        let count = self.users().len();
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }

    pub fn form(&self) -> Option<&UserForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut UserForm> {
        self.form.as_mut()
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&User> {
        let id = self.pending_delete.as_deref()?;
        self.users().iter().find(|user| user.id == id)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    fn fail(&mut self, err: ActionError) -> ActionError {
        self.notice = Some(Notice::from(&err));
        err
    }

    fn deny(&mut self) -> ActionError {
        self.auth = AuthState::Unauthenticated;
        self.form = None;
        self.pending_delete = None;
        self.close();
        self.fail(ActionError::Unauthorized(ACCESS_DENIED.to_string()))
    }

    /// Probes the stored session. Any failure lands in `Unauthenticated`.
    pub async fn check_session(&mut self) {
        self.auth = AuthState::Checking;
        match self.store.auth().current_session().await {
            Ok(Some(session)) => {
                let _ = self.resolve(session).await;
            }
            Ok(None) => {
                self.profile = None;
                self.store.use_session(None);
                self.auth = AuthState::Unauthenticated;
            }
            Err(e) => {
                tracing::error!("Session check failed: {}", e);
                self.profile = None;
                self.auth = AuthState::Unauthenticated;
            }
        }
    }

    /// Maps a session to its profile; only administrators are admitted.
    async fn resolve(&mut self, session: Session) -> Result<(), ActionError> {
        self.store.use_session(Some(&session));
        let profile = match self.store.find_by_id(&session.user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("Profile lookup failed: {}", e);
                None
            }
        };
        self.profile = profile.clone();

        match profile {
            Some(user) if user.role.is_admin() => {
                tracing::info!("Admin session for {}", user.email);
                self.auth = AuthState::Authenticated { session, user };
                Ok(())
            }
            Some(user) => {
                tracing::warn!("{} signed in without admin role", user.email);
                Err(self.deny())
            }
            None => Err(self.deny()),
        }
    }

    pub async fn request_login(&mut self) -> Result<(), ActionError> {
        let email = self.login.email.trim().to_string();
        if email.is_empty() {
            return Err(self.fail(ActionError::Validation("Email is required".to_string())));
        }

        self.seed_users().await;
        match self.store.find_by_email(&email).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(self.fail(ActionError::Unauthorized(ACCESS_DENIED.to_string()))),
            Err(e) => return Err(self.fail(ActionError::backend("log in", e))),
        }

        if let Err(e) = self.store.auth().send_magic_link(&email).await {
            tracing::error!("Magic link request for {} failed: {}", email, e);
            return Err(self.fail(ActionError::backend("log in", e)));
        }
        self.login.link_sent = true;
        self.login.field = LoginField::Code;
        self.notice = Some(Notice::info(LINK_SENT));
        Ok(())
    }

    /// Completes sign-in with the code from the emailed link.
    pub async fn confirm_link(&mut self) -> Result<(), ActionError> {
        let email = self.login.email.trim().to_string();
        let code = self.login.code.trim().to_string();
        if !self.login.link_sent {
            return Err(self.fail(ActionError::Validation("Request a login link first".to_string())));
        }
        if code.is_empty() {
            return Err(self.fail(ActionError::Validation("Enter the code from the login email".to_string())));
        }

        let session = match self.store.auth().verify_magic_link(&email, &code).await {
            Ok(session) => session,
            Err(AuthError::InvalidToken) => {
                return Err(self.fail(ActionError::Validation(AuthError::InvalidToken.to_string())));
            }
            Err(e) => return Err(self.fail(ActionError::backend("log in", e))),
        };

        self.login = LoginForm::default();
        self.resolve(session).await?;
        self.notice = Some(Notice::success("Signed in"));
        Ok(())
    }

    /// Treats a session established elsewhere as a sign-in.
    pub async fn on_signed_in(&mut self, session: Session) -> Result<(), ActionError> {
        self.resolve(session).await
    }

    pub async fn sign_out(&mut self) {
        if let Err(e) = self.store.auth().sign_out().await {
            tracing::warn!("Sign out failed: {}", e);
        }
        self.store.use_session(None);
        self.close();
        self.profile = None;
        self.auth = AuthState::Unauthenticated;
        self.users = UsersState::Loading;
        self.form = None;
        self.pending_delete = None;
        self.notice = Some(Notice::info("Signed out"));
    }

    async fn require_admin(&mut self) -> Result<(), ActionError> {
        if self.is_authenticated() && self.store.is_current_user_admin().await {
            Ok(())
        } else {
            Err(self.deny())
        }
    }

    /// Puts the starting users into an empty table so the first administrator can sign in.
    pub async fn seed_users(&mut self) {
        if let Err(e) = self.store.ensure_bootstrap().await {
            tracing::error!("Failed to seed bootstrap users: {}", e);
        }
    }

    /// Loads users, seeding the fixed starting list into an empty table.
    pub async fn load_users(&mut self) {
        self.users = UsersState::Loading;
        self.users = match self.store.ensure_bootstrap().await {
            Ok(users) => UsersState::Loaded(users),
            Err(e) => {
                tracing::error!("Failed to load users: {}", e);
                UsersState::Error(ActionError::backend("load users", e).to_string())
            }
        };
        let count = self.users().len();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }
    }

    pub async fn subscribe(&mut self) {
        if self.feed.is_some() {
            return;
        }
        match self.store.subscribe().await {
            Ok(feed) => self.feed = Some(feed),
            Err(e) => tracing::warn!("User list will not update live: {}", e),
        }
    }

    pub fn drain_changes(&mut self) -> bool {
        let mut pending = Vec::new();
        if let Some(feed) = self.feed.as_mut() {
            while let Some(change) = feed.try_recv() {
                pending.push(change);
            }
        }
        let changed = !pending.is_empty();
        for change in pending {
            self.apply_change(change);
        }
        changed
    }

    pub fn apply_change(&mut self, change: Change<User>) {
        let UsersState::Loaded(users) = &mut self.users else {
            return;
        };
        match change {
            Change::Inserted(user) | Change::Updated(user) => {
                users.retain(|existing| existing.id != user.id);
                let at = users
                    .iter()
                    .position(|existing| existing.name > user.name)
                    .unwrap_or(users.len());
                users.insert(at, user);
            }
            Change::Deleted(id) => users.retain(|user| user.id != id),
        }
    }

    pub fn close(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
    }

    pub fn open_add(&mut self) {
        self.form = Some(UserForm::new());
        self.form_error = None;
    }

    pub fn open_edit(&mut self, id: &str) {
        if let Some(user) = self.users().iter().find(|user| user.id == id) {
            self.form = Some(UserForm::for_user(user));
            self.form_error = None;
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.form_error = None;
    }

    pub async fn submit_form(&mut self) -> Result<(), ActionError> {
        let Some(form) = self.form.clone() else {
            return Ok(());
        };
        if let Some(field) = form.missing_field() {
            let err = ActionError::Validation(format!("{} is required", field));
            self.form_error = Some(err.to_string());
            return Err(err);
        }
        self.require_admin().await?;

        let result = match &form.user_id {
            Some(id) => self
                .store
                .update(id, form.to_update())
                .await
                .map_err(|e| store_error("update user", e)),
            None => self
                .store
                .create(form.to_new_user())
                .await
                .map_err(|e| store_error("create user", e)),
        };

        match result {
            Ok(user) => {
                self.apply_change(Change::Updated(user.clone()));
                self.form = None;
                self.form_error = None;
                self.notice = Some(Notice::success(if form.is_editing() {
                    format!("Updated {}", user.name)
                } else {
                    format!("Added {}", user.name)
                }));
                Ok(())
            }
            Err(err) => {
                self.form_error = Some(err.to_string());
                Err(self.fail(err))
            }
        }
    }

    pub fn request_delete(&mut self, id: &str) {
        if self.users().iter().any(|user| user.id == id) {
            self.pending_delete = Some(id.to_string());
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(&mut self) -> Result<(), ActionError> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };
        self.require_admin().await?;

        let removing_admin = self
            .users()
            .iter()
            .find(|user| user.id == id)
            .is_some_and(|user| user.role.is_admin());
        let admins = self.users().iter().filter(|user| user.role.is_admin()).count();
        if removing_admin && admins <= 1 {
            tracing::warn!("Deleting the last administrator {}", id);
        }

        match self.store.delete(&id).await {
            Ok(()) => {
                self.apply_change(Change::Deleted(id));
                let count = self.users().len();
                if self.selected >= count {
                    self.selected = count.saturating_sub(1);
                }
                self.notice = Some(Notice::success("User deleted"));
                Ok(())
            }
            Err(e) => Err(self.fail(ActionError::backend("delete user", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryAuth;
    use crate::backend::MemoryBackend;
    use crate::calendar::{NewUser, Role};
    use crate::store::user_store::USERS_TABLE;
    use std::sync::Arc;

    struct Fixture {
        backend: Arc<MemoryBackend>,
        auth: Arc<MemoryAuth>,
        page: AdminPage,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());
        let store = UserStore::new(backend.clone(), auth.clone());
        store.ensure_bootstrap().await.unwrap();
        Fixture { backend, auth, page: AdminPage::new(store) }
    }

    async fn sign_in(fixture: &mut Fixture, email: &str) -> Result<(), ActionError> {
        fixture.page.login_mut().email = email.to_string();
        fixture.page.request_login().await?;
        fixture.page.login_mut().code = fixture.auth.pending_code(email).unwrap();
        fixture.page.confirm_link().await
    }

    #[tokio::test]
    async fn no_session_is_unauthenticated() {
        let mut fixture = fixture().await;

        fixture.page.check_session().await;

        assert_eq!(fixture.page.auth_state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn unknown_email_is_denied_without_sending_link() {
        let mut fixture = fixture().await;
        fixture.page.login_mut().email = "stranger@example.com".to_string();

        let result = fixture.page.request_login().await;

        assert_eq!(result, Err(ActionError::Unauthorized(ACCESS_DENIED.to_string())));
        assert!(!fixture.page.login().link_sent);
    }

    #[tokio::test]
    async fn known_email_sends_link_but_does_not_grant_access() {
        let mut fixture = fixture().await;
        fixture.page.login_mut().email = "admin@oiaa.edu".to_string();

        fixture.page.request_login().await.unwrap();

        assert!(fixture.page.login().link_sent);
        assert_eq!(fixture.page.notice().unwrap().message, LINK_SENT);
        assert!(!fixture.page.is_authenticated());
    }

    #[tokio::test]
    async fn confirming_link_authenticates_admin() {
        let mut fixture = fixture().await;

        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();

        assert!(fixture.page.is_authenticated());
        assert_eq!(fixture.page.signed_in_user().unwrap().role, Role::Admin);
        assert!(fixture.backend.access_token().is_some());
    }

    #[tokio::test]
    async fn wrong_code_is_rejected() {
        let mut fixture = fixture().await;
        fixture.page.login_mut().email = "admin@oiaa.edu".to_string();
        fixture.page.request_login().await.unwrap();
        fixture.page.login_mut().code = "not-the-code".to_string();

        assert!(matches!(fixture.page.confirm_link().await, Err(ActionError::Validation(_))));
        assert!(!fixture.page.is_authenticated());
    }

    #[tokio::test]
    async fn editor_signs_in_but_is_denied_admin_access() {
        let mut fixture = fixture().await;

        let result = sign_in(&mut fixture, "coordinator@oiaa.edu").await;

        assert_eq!(result, Err(ActionError::Unauthorized(ACCESS_DENIED.to_string())));
        assert_eq!(fixture.page.auth_state(), &AuthState::Unauthenticated);
        assert_eq!(fixture.page.signed_in_user().unwrap().role, Role::Editor);
    }

    #[tokio::test]
    async fn existing_session_is_restored() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();

        let store = UserStore::new(fixture.backend.clone(), fixture.auth.clone());
        let mut fresh = AdminPage::new(store);
        fresh.check_session().await;

        assert!(fresh.is_authenticated());
    }

    #[tokio::test]
    async fn add_user_defaults_to_viewer() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();
        fixture.page.load_users().await;

        fixture.page.open_add();
        let form = fixture.page.form_mut().unwrap();
        form.name = "New Staff".to_string();
        form.email = "new@oiaa.edu".to_string();
        fixture.page.submit_form().await.unwrap();

        let added = fixture.page.users().iter().find(|u| u.email == "new@oiaa.edu").unwrap();
        assert_eq!(added.role, Role::Viewer);
        assert_eq!(fixture.backend.row_count(USERS_TABLE), 4);
        assert!(fixture.page.form().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_reports_conflict() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();
        fixture.page.load_users().await;

        fixture.page.open_add();
        let form = fixture.page.form_mut().unwrap();
        form.name = "Copy".to_string();
        form.email = "Coordinator@oiaa.edu".to_string();
        let result = fixture.page.submit_form().await;

        assert_eq!(result, Err(ActionError::Conflict));
        assert_eq!(fixture.page.form_error(), Some("A user with this email already exists."));
        assert_eq!(fixture.backend.row_count(USERS_TABLE), 3);
    }

    #[tokio::test]
    async fn missing_name_blocks_submit() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();

        fixture.page.open_add();
        fixture.page.form_mut().unwrap().email = "x@oiaa.edu".to_string();

        assert_eq!(
            fixture.page.submit_form().await,
            Err(ActionError::Validation("Name is required".to_string()))
        );
    }

    #[tokio::test]
    async fn edit_changes_role() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();
        fixture.page.load_users().await;
        let assistant = fixture
            .page
            .users()
            .iter()
            .find(|u| u.email == "assistant@oiaa.edu")
            .unwrap()
            .clone();

        fixture.page.open_edit(&assistant.id);
        fixture.page.form_mut().unwrap().role = Role::Editor;
        fixture.page.submit_form().await.unwrap();

        let edited = fixture.page.users().iter().find(|u| u.id == assistant.id).unwrap();
        assert_eq!(edited.role, Role::Editor);
    }

    #[tokio::test]
    async fn delete_needs_confirmation() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();
        fixture.page.load_users().await;
        let id = fixture.page.users()[0].id.clone();

        fixture.page.request_delete(&id);
        fixture.page.cancel_delete();
        fixture.page.confirm_delete().await.unwrap();
        assert_eq!(fixture.backend.row_count(USERS_TABLE), 3);

        fixture.page.request_delete(&id);
        fixture.page.confirm_delete().await.unwrap();
        assert_eq!(fixture.backend.row_count(USERS_TABLE), 2);
    }

    #[tokio::test]
    async fn management_after_demotion_forces_sign_in() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();
        fixture.page.load_users().await;
        let admin_id = fixture.page.signed_in_user().unwrap().id.clone();
        let store = UserStore::new(fixture.backend.clone(), fixture.auth.clone());
        store.update_role(&admin_id, Role::Viewer).await.unwrap();

        fixture.page.open_add();
        let form = fixture.page.form_mut().unwrap();
        form.name = "Late".to_string();
        form.email = "late@oiaa.edu".to_string();
        let result = fixture.page.submit_form().await;

        assert_eq!(result, Err(ActionError::Unauthorized(ACCESS_DENIED.to_string())));
        assert_eq!(fixture.page.auth_state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let mut fixture = fixture().await;
        sign_in(&mut fixture, "admin@oiaa.edu").await.unwrap();

        fixture.page.sign_out().await;

        assert_eq!(fixture.page.auth_state(), &AuthState::Unauthenticated);
        assert!(fixture.page.signed_in_user().is_none());
        assert!(fixture.backend.access_token().is_none());
    }

    #[tokio::test]
    async fn empty_table_is_seeded_on_first_load() {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());
        let store = UserStore::new(backend.clone(), auth);
        let mut page = AdminPage::new(store.clone());

        page.load_users().await;

        assert_eq!(page.users().len(), 3);
        store
            .create(NewUser::new("extra@oiaa.edu", "Extra", Role::Viewer))
            .await
            .unwrap();
        page.load_users().await;
        assert_eq!(page.users().len(), 4);
    }
}
