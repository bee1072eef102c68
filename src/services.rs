use std::sync::Arc;

use thiserror::Error;

use crate::auth::{AuthProvider, GoTrueClient, MemoryAuth};
use crate::backend::{Backend, BackendError, MemoryBackend, RestBackend};
use crate::calendar::sample_data::{sample_events, SAMPLE_AUTHOR};
use crate::storage::{Config, LocalStorage, LocalStorageError};
use crate::store::{EventStore, UserStore, UserStoreError};

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("No backend configured; set backend.url and backend.anon_key in {0}")]
    NotConfigured(String),
    #[error("Local storage error: {0}")]
    LocalStorage(#[from] LocalStorageError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("User store error: {0}")]
    Users(#[from] UserStoreError),
}

/// The backend, identity service and local storage one session runs against.
pub struct Services {
    pub backend: Arc<dyn Backend>,
    pub auth: Arc<dyn AuthProvider>,
    pub local: Option<LocalStorage>,
    demo_auth: Option<Arc<MemoryAuth>>,
}

impl Services {
    pub fn connect(config: &Config) -> Result<Self, ServicesError> {
        if !config.has_backend() {
            return Err(ServicesError::NotConfigured(Config::config_path().display().to_string()));
        }
        tracing::info!("Connecting to backend at {}", config.backend.url);

        let backend = RestBackend::new(&config.backend.url, &config.backend.anon_key);
        let auth = GoTrueClient::from_config(config);
        let local = LocalStorage::open(&config.storage.local_db)?;

        Ok(Self {
            backend: Arc::new(backend),
            auth: Arc::new(auth),
            local: Some(local),
            demo_auth: None,
        })
    }

    /// In-process backend seeded with the bootstrap users and the sample events.
    pub async fn demo() -> Result<Self, ServicesError> {
        let backend = Arc::new(MemoryBackend::for_calendar());
        let auth = Arc::new(MemoryAuth::new());

        UserStore::new(backend.clone(), auth.clone()).ensure_bootstrap().await?;
        let events = EventStore::new(backend.clone());
        for data in sample_events() {
            events.create(&data, SAMPLE_AUTHOR).await?;
        }
        tracing::info!("Demo backend seeded");

        Ok(Self {
            backend,
            auth: auth.clone(),
            local: Some(LocalStorage::in_memory()?),
            demo_auth: Some(auth),
        })
    }

    pub fn is_demo(&self) -> bool {
        self.demo_auth.is_some()
    }

    /// The code a demo sign-in would have emailed.
    pub fn demo_login_code(&self, email: &str) -> Option<String> {
        self.demo_auth.as_ref()?.pending_code(email)
    }

    pub fn event_store(&self) -> EventStore {
        EventStore::new(self.backend.clone())
    }

    pub fn user_store(&self) -> UserStore {
        UserStore::new(self.backend.clone(), self.auth.clone())
    }

    pub fn take_local_storage(&mut self) -> Option<LocalStorage> {
        self.local.take()
    }
}
