//! The hosted data store, seen as tables of JSON rows plus a change feed.

pub mod memory;
pub mod realtime;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Not authorized")]
    Unauthorized,
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Realtime channel error: {0}")]
    Realtime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filters plus an optional ordering, the subset of PostgREST we use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| column_equals(row, column, expected))
    }
}

pub(crate) fn column_equals(row: &Value, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Value,
    pub old_record: Value,
}

impl RowChange {
    /// The row the change is about: the old row for deletes, the new one otherwise.
    pub fn row(&self) -> &Value {
        match self.kind {
            ChangeKind::Delete => &self.old_record,
            _ => &self.record,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listen {
    All,
    Inserts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub name: String,
    pub table: String,
    pub listen: Listen,
    pub filter: Option<(String, String)>,
}

impl ChannelSpec {
    pub fn table(table: &str) -> Self {
        Self {
            name: table.to_string(),
            table: table.to_string(),
            listen: Listen::All,
            filter: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn inserts_only(mut self) -> Self {
        self.listen = Listen::Inserts;
        self
    }

    pub fn filter_eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filter = Some((column.to_string(), value.into()));
        self
    }

    pub fn accepts(&self, change: &RowChange) -> bool {
        if change.table != self.table {
            return false;
        }
        if self.listen == Listen::Inserts && change.kind != ChangeKind::Insert {
            return false;
        }
        match &self.filter {
            Some((column, value)) => column_equals(change.row(), column, value),
            None => true,
        }
    }
}

/// Live handle on a change channel. Closing (or dropping) it leaves the channel.
pub struct Subscription {
    name: String,
    receiver: mpsc::UnboundedReceiver<RowChange>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        name: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<RowChange>,
        on_close: Option<Box<dyn FnOnce() + Send>>,
    ) -> Self {
        Self {
            name: name.into(),
            receiver,
            on_close,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn recv(&mut self) -> Option<RowChange> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RowChange> {
        self.receiver.try_recv().ok()
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            tracing::info!("Closing subscription {}", self.name);
            on_close();
        }
        self.receiver.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("name", &self.name).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError>;

    async fn subscribe(&self, channel: ChannelSpec) -> Result<Subscription, BackendError>;

    /// Row-level access uses the signed-in session's token when there is one.
    fn set_access_token(&self, token: Option<String>);
}
