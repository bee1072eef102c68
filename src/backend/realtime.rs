//! Postgres change feed over the Phoenix channel websocket protocol.

use std::sync::Arc;
use std::time::Duration;

use ewebsock::{Options, WsEvent, WsMessage, WsReceiver, WsSender};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};

use super::{BackendError, ChangeKind, ChannelSpec, Listen, RowChange, Subscription};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const PROTOCOL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

impl PhoenixMessage {
    pub fn join(channel: &ChannelSpec, msg_ref: u64, access_token: Option<&str>) -> Self {
        let event = match channel.listen {
            Listen::All => "*",
            Listen::Inserts => "INSERT",
        };
        let mut change = json!({
            "event": event,
            "schema": "public",
            "table": channel.table,
        });
        if let Some((column, value)) = &channel.filter {
            change["filter"] = Value::String(format!("{}=eq.{}", column, value));
        }

        let mut payload = json!({
            "config": {
                "broadcast": { "ack": false, "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }

        Self {
            topic: topic_for(channel),
            event: "phx_join".to_string(),
            payload,
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn leave(topic: &str, msg_ref: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn heartbeat(msg_ref: u64) -> Self {
        Self {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref.to_string()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn topic_for(channel: &ChannelSpec) -> String {
    format!("realtime:{}", channel.name)
}

pub fn websocket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        base,
        urlencoding::encode(api_key),
        PROTOCOL_VERSION
    )
}

/// Extracts a row change from a `postgres_changes` push, ignoring replies and system messages.
pub fn decode_change(message: &PhoenixMessage) -> Option<RowChange> {
    if message.event != "postgres_changes" {
        return None;
    }
    let data = message.payload.get("data")?;
    let kind = data
        .get("type")
        .or_else(|| data.get("eventType"))
        .and_then(Value::as_str)
        .and_then(ChangeKind::parse)?;
    let table = data.get("table").and_then(Value::as_str)?.to_string();

    Some(RowChange {
        table,
        kind,
        record: data.get("record").cloned().unwrap_or_else(|| json!({})),
        old_record: data.get("old_record").cloned().unwrap_or_else(|| json!({})),
    })
}

pub struct RealtimeClient {
    socket_url: String,
}

impl RealtimeClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            socket_url: websocket_url(base_url, api_key),
        }
    }

    pub fn socket_url(&self) -> &str {
        &self.socket_url
    }

    /// Opens a socket, joins the channel and forwards its row changes until the
    /// subscription is closed.
    pub async fn subscribe(
        &self,
        channel: ChannelSpec,
        access_token: Option<String>,
    ) -> Result<Subscription, BackendError> {
        let notify = Arc::new(Notify::new());
        let wakeup = notify.clone();
        let (mut sender, receiver) =
            ewebsock::connect_with_wakeup(&self.socket_url, Options::default(), move || {
                wakeup.notify_one()
            })
            .map_err(BackendError::Realtime)?;

        let join = PhoenixMessage::join(&channel, 1, access_token.as_deref());
        sender.send(WsMessage::Text(join.to_json()?));
        tracing::info!("Joining realtime channel {}", join.topic);

        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel::<()>();
        tokio::spawn(run_channel(
            topic_for(&channel),
            sender,
            receiver,
            notify,
            changes_tx,
            close_rx,
        ));

        Ok(Subscription::new(
            channel.name,
            changes_rx,
            Some(Box::new(move || {
                let _ = close_tx.send(());
            })),
        ))
    }
}

async fn run_channel(
    topic: String,
    mut sender: WsSender,
    mut receiver: WsReceiver,
    notify: Arc<Notify>,
    changes: mpsc::UnboundedSender<RowChange>,
    mut close: oneshot::Receiver<()>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = &mut close => {
                if let Ok(leave) = PhoenixMessage::leave(&topic, next_ref).to_json() {
                    sender.send(WsMessage::Text(leave));
                }
                tracing::info!("Left realtime channel {}", topic);
                break;
            }
            _ = heartbeat.tick() => {
                if changes.is_closed() {
                    break;
                }
                if let Ok(beat) = PhoenixMessage::heartbeat(next_ref).to_json() {
                    sender.send(WsMessage::Text(beat));
                }
                next_ref += 1;
            }
            _ = notify.notified() => {
                if !drain(&topic, &mut receiver, &changes) {
                    break;
                }
            }
        }
    }
}

/// Returns false once the socket is closed or nobody is listening.
fn drain(topic: &str, receiver: &mut WsReceiver, changes: &mpsc::UnboundedSender<RowChange>) -> bool {
    while let Some(event) = receiver.try_recv() {
        match event {
            WsEvent::Opened => tracing::info!("Realtime socket open for {}", topic),
            WsEvent::Message(WsMessage::Text(text)) => {
                let message = match serde_json::from_str::<PhoenixMessage>(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("Ignoring malformed realtime frame: {}", e);
                        continue;
                    }
                };
                if message.event == "phx_reply" && message.payload["status"] == "error" {
                    tracing::error!("Realtime join rejected for {}: {}", topic, message.payload);
                }
                if let Some(change) = decode_change(&message) {
                    if changes.send(change).is_err() {
                        return false;
                    }
                }
            }
            WsEvent::Message(_) => {}
            WsEvent::Error(e) => tracing::error!("Realtime socket error on {}: {}", topic, e),
            WsEvent::Closed => {
                tracing::warn!("Realtime socket closed for {}", topic);
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn websocket_url_switches_scheme_and_carries_key() {
        assert_eq!(
            websocket_url("https://demo.supabase.co/", "anon key"),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon%20key&vsn=1.0.0"
        );
        assert_eq!(
            websocket_url("http://localhost:54321", "k"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
    }

    #[test]
    fn join_carries_filter_and_event_kind() {
        let channel = ChannelSpec::table("event_comments")
            .named("comments-e1")
            .inserts_only()
            .filter_eq("event_id", "e1");

        let join = PhoenixMessage::join(&channel, 1, Some("token"));

        assert_eq!(join.topic, "realtime:comments-e1");
        assert_eq!(join.event, "phx_join");
        let change = &join.payload["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "INSERT");
        assert_eq!(change["table"], "event_comments");
        assert_eq!(change["filter"], "event_id=eq.e1");
        assert_eq!(join.payload["access_token"], "token");
    }

    #[test]
    fn message_ref_serializes_as_ref() {
        let json = PhoenixMessage::heartbeat(7).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["ref"], "7");
        assert_eq!(value["topic"], "phoenix");
    }

    #[test]
    fn decodes_postgres_change_push() {
        let frame = r#"{
            "topic": "realtime:events",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": "DELETE",
                    "table": "events",
                    "schema": "public",
                    "old_record": {"id": "e1"}
                },
                "ids": [1]
            },
            "ref": null
        }"#;
        let message: PhoenixMessage = serde_json::from_str(frame).unwrap();

        let change = decode_change(&message).unwrap();

        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.table, "events");
        assert_eq!(change.row()["id"], "e1");
    }

    #[test]
    fn replies_are_not_changes() {
        let message = PhoenixMessage {
            topic: "realtime:events".to_string(),
            event: "phx_reply".to_string(),
            payload: json!({"status": "ok"}),
            msg_ref: Some("1".to_string()),
        };
        assert!(decode_change(&message).is_none());
    }
}
