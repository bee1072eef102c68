use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{Backend, BackendError, ChangeKind, ChannelSpec, Order, Query, RowChange, Subscription};

type Subscriber = (ChannelSpec, mpsc::UnboundedSender<RowChange>);

/// In-process table store used by demo mode and tests. Behaves like the hosted
/// backend: assigns ids and timestamps, enforces unique columns and pushes
/// row changes to subscribers.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    unique: Vec<(String, String)>,
    touched: HashSet<String>,
    access_token: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured with the calendar's own table constraints.
    pub fn for_calendar() -> Self {
        Self::new()
            .with_unique("users", "email")
            .with_updated_at("events")
    }

    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        self.unique.push((table.to_string(), column.to_string()));
        self
    }

    pub fn with_updated_at(mut self, table: &str) -> Self {
        self.touched.insert(table.to_string());
        self
    }

    pub fn row_count(&self, table: &str) -> usize {
        lock(&self.tables).get(table).map(Vec::len).unwrap_or(0)
    }

    pub fn access_token(&self) -> Option<String> {
        lock(&self.access_token).clone()
    }

    fn check_unique(&self, table: &str, rows: &[Value], row: &Value, skip_id: Option<&str>) -> Result<(), BackendError> {
        for (unique_table, column) in &self.unique {
            if unique_table != table {
                continue;
            }
            let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = rows.iter().any(|existing| {
                existing.get(column) == Some(value) && row_id(existing) != skip_id
            });
            if clash {
                return Err(BackendError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    table, column
                )));
            }
        }
        Ok(())
    }

    fn publish(&self, change: RowChange) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|(channel, sender)| {
            if !channel.accepts(&change) {
                return !sender.is_closed();
            }
            sender.send(change.clone()).is_ok()
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn into_object(value: Value) -> Result<Map<String, Value>, BackendError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::InvalidRecord(format!("expected an object, got {}", other))),
    }
}

fn compare(a: &Value, b: &Value, order: &Order) -> Ordering {
    let left = a.get(&order.column);
    let right = b.get(&order.column);
    let ordering = match (left, right) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (x, y) => x.map(Value::to_string).cmp(&y.map(Value::to_string)),
    };
    if order.ascending { ordering } else { ordering.reverse() }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError> {
        let tables = lock(&self.tables);
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| compare(a, b, order));
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let mut record = into_object(row)?;
        let now = Value::String(Utc::now().to_rfc3339());

        let needs_id = record.get("id").map(Value::is_null).unwrap_or(true);
        if needs_id {
            record.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        record.entry("created_at").or_insert_with(|| now.clone());
        if self.touched.contains(table) {
            record.entry("updated_at").or_insert(now);
        }
        let record = Value::Object(record);

        {
            let mut tables = lock(&self.tables);
            let rows = tables.entry(table.to_string()).or_default();
            if let Some(id) = row_id(&record) {
                if rows.iter().any(|existing| row_id(existing) == Some(id)) {
                    return Err(BackendError::Conflict(format!(
                        "duplicate key value violates unique constraint \"{}_pkey\"",
                        table
                    )));
                }
            }
            self.check_unique(table, rows, &record, None)?;
            rows.push(record.clone());
        }

        self.publish(RowChange {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            record: record.clone(),
            old_record: Value::Object(Map::new()),
        });
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, BackendError> {
        let patch = into_object(patch)?;

        let (old, updated) = {
            let mut tables = lock(&self.tables);
            let rows = tables.entry(table.to_string()).or_default();
            let index = rows
                .iter()
                .position(|row| row_id(row) == Some(id))
                .ok_or_else(|| BackendError::NotFound(format!("{} row {}", table, id)))?;

            let old = rows[index].clone();
            let mut merged = into_object(old.clone())?;
            for (key, value) in patch {
                if key != "id" {
                    merged.insert(key, value);
                }
            }
            if self.touched.contains(table) {
                merged.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
            }
            let updated = Value::Object(merged);

            self.check_unique(table, rows, &updated, Some(id))?;
            rows[index] = updated.clone();
            (old, updated)
        };

        self.publish(RowChange {
            table: table.to_string(),
            kind: ChangeKind::Update,
            record: updated.clone(),
            old_record: old,
        });
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let removed = {
            let mut tables = lock(&self.tables);
            let rows = tables.entry(table.to_string()).or_default();
            rows.iter()
                .position(|row| row_id(row) == Some(id))
                .map(|index| rows.remove(index))
        };

        if let Some(old) = removed {
            self.publish(RowChange {
                table: table.to_string(),
                kind: ChangeKind::Delete,
                record: Value::Object(Map::new()),
                old_record: old,
            });
        }
        Ok(())
    }

    async fn subscribe(&self, channel: ChannelSpec) -> Result<Subscription, BackendError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let name = channel.name.clone();
        tracing::info!("Subscribed to {} changes on channel {}", channel.table, name);
        lock(&self.subscribers).push((channel, sender));
        Ok(Subscription::new(name, receiver, None))
    }

    fn set_access_token(&self, token: Option<String>) {
        *lock(&self.access_token) = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let backend = MemoryBackend::for_calendar();

        let row = backend.insert("events", json!({"title": "Orientation"})).await.unwrap();

        assert!(row["id"].as_str().is_some());
        assert!(row["created_at"].as_str().is_some());
        assert!(row["updated_at"].as_str().is_some());
        assert_eq!(backend.row_count("events"), 1);
    }

    #[tokio::test]
    async fn unique_column_rejects_duplicates() {
        let backend = MemoryBackend::for_calendar();
        backend
            .insert("users", json!({"email": "admin@oiaa.edu", "name": "A"}))
            .await
            .unwrap();

        let result = backend
            .insert("users", json!({"email": "admin@oiaa.edu", "name": "B"}))
            .await;

        assert!(matches!(result, Err(BackendError::Conflict(_))));
        assert_eq!(backend.row_count("users"), 1);
    }

    #[tokio::test]
    async fn select_filters_and_orders() {
        let backend = MemoryBackend::new();
        for (event_id, created) in [("e1", "2025-01-03"), ("e2", "2025-01-01"), ("e1", "2025-01-02")] {
            backend
                .insert("event_comments", json!({"event_id": event_id, "created_at": created}))
                .await
                .unwrap();
        }

        let rows = backend
            .select(
                "event_comments",
                &Query::new().eq("event_id", "e1").order_by("created_at", true),
            )
            .await
            .unwrap();

        let created: Vec<&str> = rows.iter().filter_map(|r| r["created_at"].as_str()).collect();
        assert_eq!(created, vec!["2025-01-02", "2025-01-03"]);
    }

    #[tokio::test]
    async fn update_merges_patch_and_keeps_id() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("users", json!({"email": "a@oiaa.edu", "role": "viewer"}))
            .await
            .unwrap();
        let id = row["id"].as_str().unwrap().to_string();

        let updated = backend
            .update("users", &id, json!({"role": "editor", "id": "other"}))
            .await
            .unwrap();

        assert_eq!(updated["id"], id.as_str());
        assert_eq!(updated["role"], "editor");
        assert_eq!(updated["email"], "a@oiaa.edu");
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let backend = MemoryBackend::new();
        let result = backend.update("users", "nope", json!({"name": "x"})).await;
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn subscribers_receive_matching_changes() {
        let backend = MemoryBackend::new();
        let mut subscription = backend
            .subscribe(ChannelSpec::table("events"))
            .await
            .unwrap();

        let row = backend.insert("events", json!({"title": "Trip"})).await.unwrap();
        backend.insert("users", json!({"email": "x@oiaa.edu"})).await.unwrap();
        backend.delete("events", row["id"].as_str().unwrap()).await.unwrap();

        let inserted = subscription.try_recv().unwrap();
        assert_eq!(inserted.kind, ChangeKind::Insert);
        let deleted = subscription.try_recv().unwrap();
        assert_eq!(deleted.kind, ChangeKind::Delete);
        assert_eq!(deleted.old_record["title"], "Trip");
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn deleting_missing_row_is_silent() {
        let backend = MemoryBackend::new();
        assert!(backend.delete("events", "nope").await.is_ok());
    }
}
