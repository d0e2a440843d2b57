//! Row change subscription over Supabase Realtime.
//!
//! Realtime speaks the Phoenix channel protocol over a websocket: every frame is a
//! JSON object with `topic`, `event`, `payload` and `ref`. The client joins one
//! topic per document with a `postgres_changes` filter on the row id, answers the
//! server's expectations with a heartbeat on the `phoenix` topic and receives
//! `postgres_changes` frames whose `data` carries the changed record.
//!
//! The connection must be driven inside a tokio runtime.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use pdfchat_core::{ChangeEvent, ChangeType, DocumentId, EventSink, PushEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::config::SupabaseConfig;
use crate::error::{Result, SupabaseError};

/// Phoenix protocol events used by the client.
pub mod events {
    /// Join a topic.
    pub const JOIN: &str = "phx_join";
    /// Leave a topic.
    pub const LEAVE: &str = "phx_leave";
    /// Server reply to a client frame.
    pub const REPLY: &str = "phx_reply";
    /// The server crashed the channel.
    pub const ERROR: &str = "phx_error";
    /// The server closed the channel.
    pub const CLOSE: &str = "phx_close";
    /// Keep-alive on the `phoenix` topic.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Row change notification.
    pub const POSTGRES_CHANGES: &str = "postgres_changes";
    /// Realtime system message.
    pub const SYSTEM: &str = "system";
}

/// One frame of the Phoenix channel protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    /// Channel topic.
    pub topic: String,
    /// Event name.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub payload: Value,
    /// Client-chosen reference, echoed in replies.
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    /// Join frame subscribing `topic` to changes of the row `id`.
    #[must_use]
    pub fn join(config: &SupabaseConfig, id: &DocumentId, reference: &str) -> Self {
        Self {
            topic: config.topic(id),
            event: events::JOIN.to_owned(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "*",
                        "schema": config.schema(),
                        "table": config.table(),
                        "filter": format!("id=eq.{id}"),
                    }],
                },
                "access_token": config.anon_key(),
            }),
            reference: Some(reference.to_owned()),
        }
    }

    /// Heartbeat frame.
    #[must_use]
    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: "phoenix".to_owned(),
            event: events::HEARTBEAT.to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
        }
    }

    /// Leave frame for `topic`.
    #[must_use]
    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_owned(),
            event: events::LEAVE.to_owned(),
            payload: json!({}),
            reference: Some(reference.to_owned()),
        }
    }
}

/// What an inbound frame means for the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The subscribed row changed.
    Change(ChangeEvent),
    /// The server accepted the join.
    Joined,
    /// The server refused the join.
    Rejected(String),
    /// The channel is gone.
    Closed(String),
    /// Nothing the subscription cares about.
    Ignored,
}

/// Classifies a frame received while subscribed to `topic`.
#[must_use]
pub fn classify(message: &PhoenixMessage, topic: &str, join_ref: &str) -> Inbound {
    if message.topic != topic {
        return Inbound::Ignored;
    }
    match message.event.as_str() {
        events::REPLY if message.reference.as_deref() == Some(join_ref) => {
            if message.payload.get("status").and_then(Value::as_str) == Some("ok") {
                Inbound::Joined
            } else {
                Inbound::Rejected(reply_reason(&message.payload))
            }
        }
        events::POSTGRES_CHANGES => {
            let data = message.payload.get("data").unwrap_or(&message.payload);
            parse_change(data).map_or(Inbound::Ignored, Inbound::Change)
        }
        events::SYSTEM
            if message.payload.get("status").and_then(Value::as_str) == Some("error") =>
        {
            Inbound::Rejected(reply_reason(&message.payload))
        }
        events::ERROR => Inbound::Closed("realtime channel crashed".to_owned()),
        events::CLOSE => Inbound::Closed("realtime channel closed".to_owned()),
        _ => Inbound::Ignored,
    }
}

fn reply_reason(payload: &Value) -> String {
    let response = payload.get("response").unwrap_or(payload);
    ["reason", "message"]
        .iter()
        .find_map(|key| response.get(key).and_then(Value::as_str))
        .map_or_else(|| response.to_string(), str::to_owned)
}

/// Translates the `data` object of a `postgres_changes` frame.
///
/// Returns `None` when the frame names no change type.
#[must_use]
pub fn parse_change(data: &Value) -> Option<ChangeEvent> {
    let change_type = ChangeType::from_label(data.get("type")?.as_str()?);
    let record = data.get("record");
    let column = |name: &str| {
        record
            .and_then(|record| record.get(name))
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_owned)
    };
    Some(ChangeEvent {
        change_type,
        new_state: column("status"),
        error_detail: column("error_message").or_else(|| column("error")),
    })
}

/// Runs one subscription until `stop` closes or the channel fails.
///
/// Failures are reported through `sink` as [`PushEvent::ChannelError`] unless the
/// subscription was released first.
pub(crate) async fn run(
    config: Arc<SupabaseConfig>,
    id: DocumentId,
    sink: EventSink,
    stop: async_channel::Receiver<()>,
) {
    match listen(&config, &id, &sink, &stop).await {
        Ok(()) => debug!(document = %id, "realtime subscription released"),
        Err(err) if stop.is_closed() => {
            debug!(document = %id, error = %err, "realtime failed after release");
        }
        Err(err) => {
            warn!(document = %id, error = %err, "realtime subscription failed");
            sink(PushEvent::ChannelError(err.to_string()));
        }
    }
}

async fn listen(
    config: &SupabaseConfig,
    id: &DocumentId,
    sink: &EventSink,
    stop: &async_channel::Receiver<()>,
) -> Result<()> {
    let url = config.realtime_url()?;
    let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let (mut write, mut read) = socket.split();

    let mut next_ref = 0_u64;
    let mut reference = move || {
        next_ref += 1;
        next_ref.to_string()
    };

    let topic = config.topic(id);
    let join_ref = reference();
    write
        .send(frame(&PhoenixMessage::join(config, id, &join_ref))?)
        .await?;
    debug!(topic = %topic, "joining realtime channel");

    let period = config.heartbeat_interval();
    let mut heartbeat = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = stop.recv() => {
                let leave = frame(&PhoenixMessage::leave(&topic, &reference()))?;
                let _ = write.send(leave).await;
                let _ = write.close().await;
                return Ok(());
            }
            _ = heartbeat.tick() => {
                write.send(frame(&PhoenixMessage::heartbeat(&reference()))?).await?;
                trace!("realtime heartbeat sent");
            }
            incoming = read.next() => {
                let text = match incoming {
                    None => return Err(SupabaseError::WebSocket("connection closed".to_owned())),
                    Some(Err(err)) => return Err(err.into()),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(close))) => {
                        let reason = close.map_or_else(String::new, |close| close.reason.into_owned());
                        return Err(SupabaseError::WebSocket(format!("server closed the connection: {reason}")));
                    }
                    Some(Ok(_)) => continue,
                };
                let message: PhoenixMessage = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(err) => {
                        debug!(error = %err, "skipping malformed realtime frame");
                        continue;
                    }
                };
                match classify(&message, &topic, &join_ref) {
                    Inbound::Change(change) => sink(PushEvent::Change(change)),
                    Inbound::Joined => debug!(topic = %topic, "realtime channel joined"),
                    Inbound::Rejected(reason) => return Err(SupabaseError::JoinRejected(reason)),
                    Inbound::Closed(reason) => return Err(SupabaseError::WebSocket(reason)),
                    Inbound::Ignored => {}
                }
            }
        }
    }
}

fn frame(message: &PhoenixMessage) -> Result<Message> {
    Ok(Message::Text(serde_json::to_string(message)?))
}
