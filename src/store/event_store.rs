use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_timestamp, Feed};
use crate::backend::{Backend, BackendError, ChannelSpec, Query};
use crate::calendar::event::is_hex_color;
use crate::calendar::{CalendarEvent, EventComment, EventData, EventType, NewComment};
use crate::grid::parse_day;

pub const EVENTS_TABLE: &str = "events";
pub const COMMENTS_TABLE: &str = "event_comments";

#[derive(Debug, Deserialize)]
struct EventRow {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    custom_color: Option<String>,
    #[serde(default)]
    action_items: Option<Vec<String>>,
    #[serde(default)]
    created_by: Option<String>,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventWrite<'a> {
    title: &'a str,
    description: Option<&'a str>,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    event_type: EventType,
    custom_color: Option<&'a str>,
    action_items: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl<'a> EventWrite<'a> {
    fn from_data(data: &'a EventData) -> Self {
        Self {
            title: data.title.trim(),
            description: data.description.as_deref().filter(|d| !d.trim().is_empty()),
            date: data.date,
            end_date: data.end_date,
            event_type: data.event_type,
            custom_color: data.custom_color.as_deref(),
            action_items: data
                .action_items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect(),
            created_by: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: String,
    event_id: String,
    user_id: String,
    user_name: String,
    comment: String,
    created_at: String,
}

fn invalid(e: impl std::fmt::Display) -> BackendError {
    BackendError::InvalidRecord(e.to_string())
}

pub fn decode_event(row: &Value) -> Result<CalendarEvent, BackendError> {
    let row: EventRow = serde_json::from_value(row.clone()).map_err(invalid)?;
    let created_at = parse_timestamp(&row.created_at)?;
    let updated_at = match row.updated_at.as_deref() {
        Some(ts) => parse_timestamp(ts)?,
        None => created_at,
    };

    Ok(CalendarEvent {
        date: parse_day(&row.date).map_err(invalid)?,
        end_date: row.end_date.as_deref().map(parse_day).transpose().map_err(invalid)?,
        event_type: row.event_type.parse().map_err(invalid)?,
        id: row.id,
        title: row.title,
        description: row.description.filter(|d| !d.is_empty()),
        custom_color: row.custom_color.filter(|c| is_hex_color(c)),
        action_items: row.action_items.unwrap_or_default(),
        created_by: row.created_by.unwrap_or_default(),
        created_at,
        updated_at,
    })
}

pub fn decode_comment(row: &Value) -> Result<EventComment, BackendError> {
    let row: CommentRow = serde_json::from_value(row.clone()).map_err(invalid)?;
    Ok(EventComment {
        created_at: parse_timestamp(&row.created_at)?,
        id: row.id,
        event_id: row.event_id,
        user_id: row.user_id,
        user_name: row.user_name,
        comment: row.comment,
    })
}

#[derive(Clone)]
pub struct EventStore {
    backend: Arc<dyn Backend>,
}

impl EventStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn list_all(&self) -> Result<Vec<CalendarEvent>, BackendError> {
        let rows = self
            .backend
            .select(EVENTS_TABLE, &Query::new().order_by("date", true))
            .await?;
        let events = rows.iter().map(decode_event).collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Loaded {} events", events.len());
        Ok(events)
    }

    pub async fn create(&self, data: &EventData, created_by: &str) -> Result<CalendarEvent, BackendError> {
        data.validate().map_err(invalid)?;
        let mut write = EventWrite::from_data(data);
        write.created_by = Some(created_by);

        tracing::info!("Creating event: {} on {}", data.title, data.date);
        let row = self
            .backend
            .insert(EVENTS_TABLE, serde_json::to_value(&write)?)
            .await?;
        decode_event(&row)
    }

    pub async fn update(&self, id: &str, data: &EventData) -> Result<CalendarEvent, BackendError> {
        data.validate().map_err(invalid)?;
        let mut write = EventWrite::from_data(data);
        write.updated_at = Some(Utc::now().to_rfc3339());

        tracing::info!("Updating event {}: {}", id, data.title);
        let row = self
            .backend
            .update(EVENTS_TABLE, id, serde_json::to_value(&write)?)
            .await?;
        decode_event(&row)
    }

    pub async fn delete(&self, id: &str) -> Result<(), BackendError> {
        tracing::info!("Deleting event {}", id);
        for comment in self.list_comments(id).await? {
            match self.backend.delete(COMMENTS_TABLE, &comment.id).await {
                Ok(()) | Err(BackendError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.backend.delete(EVENTS_TABLE, id).await
    }

    pub async fn list_comments(&self, event_id: &str) -> Result<Vec<EventComment>, BackendError> {
        let rows = self
            .backend
            .select(
                COMMENTS_TABLE,
                &Query::new().eq("event_id", event_id).order_by("created_at", true),
            )
            .await?;
        rows.iter().map(decode_comment).collect()
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<EventComment, BackendError> {
        if comment.is_blank() {
            return Err(BackendError::InvalidRecord("comment is empty".to_string()));
        }
        let row = serde_json::json!({
            "event_id": comment.event_id,
            "user_id": comment.user_id,
            "user_name": comment.user_name,
            "comment": comment.comment.trim(),
        });
        let row = self.backend.insert(COMMENTS_TABLE, row).await?;
        decode_comment(&row)
    }

    pub async fn subscribe_events(&self) -> Result<Feed<CalendarEvent>, BackendError> {
        let subscription = self
            .backend
            .subscribe(ChannelSpec::table(EVENTS_TABLE).named("events-changes"))
            .await?;
        Ok(Feed::new(subscription, decode_event))
    }

    pub async fn subscribe_comments(&self, event_id: &str) -> Result<Feed<EventComment>, BackendError> {
        let channel = ChannelSpec::table(COMMENTS_TABLE)
            .named(format!("comments-{}", event_id))
            .inserts_only()
            .filter_eq("event_id", event_id);
        let subscription = self.backend.subscribe(channel).await?;
        Ok(Feed::new(subscription, decode_comment))
    }
}
