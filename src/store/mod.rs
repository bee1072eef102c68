pub mod event_store;
pub mod user_store;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::backend::{BackendError, ChangeKind, RowChange, Subscription};

pub use event_store::EventStore;
pub use user_store::{UserStore, UserStoreError};

/// A decoded row change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Inserted(T),
    Updated(T),
    Deleted(String),
}

impl<T> Change<T> {
    fn decode(change: &RowChange, decode: fn(&Value) -> Result<T, BackendError>) -> Result<Self, BackendError> {
        match change.kind {
            ChangeKind::Insert => decode(&change.record).map(Change::Inserted),
            ChangeKind::Update => decode(&change.record).map(Change::Updated),
            ChangeKind::Delete => change
                .old_record
                .get("id")
                .and_then(Value::as_str)
                .map(|id| Change::Deleted(id.to_string()))
                .ok_or_else(|| BackendError::InvalidRecord("delete without id".to_string())),
        }
    }
}

/// A subscription whose rows are already mapped to domain values.
/// Rows that fail to decode are logged and skipped.
#[derive(Debug)]
pub struct Feed<T> {
    subscription: Subscription,
    decode: fn(&Value) -> Result<T, BackendError>,
}

impl<T> Feed<T> {
    pub(crate) fn new(subscription: Subscription, decode: fn(&Value) -> Result<T, BackendError>) -> Self {
        Self { subscription, decode }
    }

    pub fn name(&self) -> &str {
        self.subscription.name()
    }

    pub async fn recv(&mut self) -> Option<Change<T>> {
        loop {
            let change = self.subscription.recv().await?;
            if let Some(decoded) = self.accept(&change) {
                return Some(decoded);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Change<T>> {
        loop {
            let change = self.subscription.try_recv()?;
            if let Some(decoded) = self.accept(&change) {
                return Some(decoded);
            }
        }
    }

    pub fn close(self) {
        self.subscription.close();
    }

    fn accept(&self, change: &RowChange) -> Option<Change<T>> {
        match Change::decode(change, self.decode) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Skipping undecodable {} change: {}", change.table, e);
                None
            }
        }
    }
}

/// Accepts RFC 3339 or offset-less ISO timestamps, the latter read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, BackendError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .or_else(|| {
            DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z")
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .ok_or_else(|| BackendError::InvalidRecord(format!("invalid timestamp '{}'", value)))
}
