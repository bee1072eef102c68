use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use super::{AuthError, AuthProvider, AuthUser, Session, SessionStorage};
use crate::calendar::user::normalize_email;
use crate::storage::config::Config;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AdminUserList {
    users: Vec<AuthUser>,
}

/// Email-link sign-in and identity administration against `{url}/auth/v1`.
pub struct GoTrueClient {
    base_url: String,
    api_key: String,
    service_role_key: Option<String>,
    redirect_url: Option<String>,
    storage: SessionStorage,
    session: Mutex<Option<Session>>,
    client: reqwest::Client,
}

impl GoTrueClient {
    pub fn new(base_url: &str, api_key: &str, storage: SessionStorage) -> Self {
        Self {
            base_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            service_role_key: None,
            redirect_url: None,
            storage,
            session: Mutex::new(None),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(
            &config.backend.url,
            &config.backend.anon_key,
            SessionStorage::new(config.auth.session_cache.clone()),
        );
        client.service_role_key = config.backend.service_role_key.clone().filter(|k| !k.is_empty());
        client.redirect_url = config.auth.redirect_url.clone().filter(|u| !u.is_empty());
        client
    }

    pub fn with_service_role_key(mut self, key: &str) -> Self {
        self.service_role_key = Some(key.to_string());
        self
    }

    pub fn with_redirect_url(mut self, url: &str) -> Self {
        self.redirect_url = Some(url.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.api_key)
    }

    fn admin(&self, request: RequestBuilder) -> Result<RequestBuilder, AuthError> {
        let key = self.service_role_key.as_ref().ok_or(AuthError::AdminUnavailable)?;
        Ok(request.header("apikey", key).bearer_auth(key))
    }

    fn cached(&self) -> Option<Session> {
        let in_memory = self.session.lock().ok().and_then(|s| s.clone());
        in_memory.or_else(|| self.storage.load().ok())
    }

    fn remember(&self, session: &Session) {
        if let Ok(mut current) = self.session.lock() {
            *current = Some(session.clone());
        }
        if let Err(e) = self.storage.save(session) {
            tracing::warn!("Failed to save session: {}", e);
        }
    }

    fn forget(&self) {
        if let Ok(mut current) = self.session.lock() {
            *current = None;
        }
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Failed to clear saved session: {}", e);
        }
    }

    async fn failure(response: Response) -> AuthError {
        let status = response.status();
        match response.text().await {
            Ok(body) => {
                tracing::error!("Auth request failed. Status: {}, Body: {}", status, body);
                AuthError::AuthFailed(format!("Status {}: {}", status, body))
            }
            Err(e) => e.into(),
        }
    }

    async fn into_session(response: Response) -> Result<Session, AuthError> {
        let token: TokenResponse = response.json().await?;
        let session = Session::new(token.access_token, token.expires_in, token.user);
        Ok(match token.refresh_token {
            Some(refresh) => session.with_refresh_token(refresh),
            None => session,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        tracing::info!("Refreshing session");
        let response = self
            .public(self.client.post(self.url("/token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Self::into_session(response).await
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(mut session) = self.cached() else {
            return Ok(None);
        };

        if self.storage.needs_refresh(&session) {
            match session.refresh_token.clone() {
                Some(refresh_token) => match self.refresh(&refresh_token).await {
                    Ok(fresh) => session = fresh,
                    Err(e) => {
                        tracing::warn!("Session refresh failed: {}", e);
                        self.forget();
                        return Ok(None);
                    }
                },
                None if self.storage.is_expired(&session) => {
                    self.forget();
                    return Ok(None);
                }
                None => {}
            }
        }

        let response = self
            .public(self.client.get(self.url("/user")))
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            tracing::info!("Saved session was rejected, signing out");
            self.forget();
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }

        session.user = response.json().await?;
        self.remember(&session);
        Ok(Some(session))
    }

    async fn send_magic_link(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        tracing::info!("Requesting login link for {}", email);

        let mut request = self
            .public(self.client.post(self.url("/otp")))
            .json(&json!({ "email": email, "create_user": false }));
        if let Some(redirect) = &self.redirect_url {
            request = request.query(&[("redirect_to", redirect.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }

    async fn verify_magic_link(&self, email: &str, token: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let response = self
            .public(self.client.post(self.url("/verify")))
            .json(&json!({ "type": "email", "email": email, "token": token.trim() }))
            .send()
            .await?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }

        let session = Self::into_session(response).await?;
        tracing::info!("Signed in as {}", email);
        self.remember(&session);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.cached();
        self.forget();

        if let Some(session) = session {
            let response = self
                .public(self.client.post(self.url("/logout")))
                .bearer_auth(&session.access_token)
                .send()
                .await?;
            if !response.status().is_success() && response.status() != 401 {
                return Err(Self::failure(response).await);
            }
        }
        tracing::info!("Signed out");
        Ok(())
    }

    async fn admin_create_user(&self, email: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        let response = self
            .admin(self.client.post(self.url("/admin/users")))?
            .json(&json!({ "email": email, "email_confirm": true }))
            .send()
            .await?;

        let status = response.status();
        if status == 422 || status == 400 {
            let body = response.text().await?;
            if body.contains("already") || body.contains("email_exists") {
                tracing::info!("Identity for {} already registered", email);
                return Err(AuthError::AlreadyRegistered(email));
            }
            return Err(AuthError::AuthFailed(format!("Status {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }

        let user: AuthUser = response.json().await?;
        tracing::info!("Provisioned identity {} for {}", user.id, email);
        Ok(user)
    }

    async fn admin_find_user(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let email = normalize_email(email);
        let response = self
            .admin(self.client.get(self.url("/admin/users")))?
            .query(&[("page", "1"), ("per_page", "1000")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let list: AdminUserList = response.json().await?;
        Ok(list
            .users
            .into_iter()
            .find(|user| user.email.as_deref().map(normalize_email).as_deref() == Some(email.as_str())))
    }

    async fn admin_delete_user(&self, id: &str) -> Result<(), AuthError> {
        let response = self
            .admin(self.client.delete(self.url(&format!("/admin/users/{}", id))))?
            .send()
            .await?;

        if response.status() == 404 {
            return Err(AuthError::IdentityNotFound(id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        tracing::info!("Deleted identity {}", id);
        Ok(())
    }
}
