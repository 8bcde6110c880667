//! Pusher-protocol WebSocket connection and frame handling
//!
//! Speaks protocol 7 against the configured Pusher cluster: handshake on
//! `pusher:connection_established`, channel subscription, ping/pong.

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::models::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Fallback when the handshake does not carry an activity timeout.
const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// A raw protocol frame. `data` arrives either as a JSON value or as a
/// JSON-encoded string, depending on the event.
#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    channel: Option<String>,
}

/// A decoded channel event with its payload normalized to a JSON value.
#[derive(Debug)]
pub struct ChannelEvent {
    pub event: String,
    pub channel: Option<String>,
    pub data: Option<serde_json::Value>,
}

pub struct PusherSocket {
    stream: WsStream,
    activity_timeout: Duration,
}

impl PusherSocket {
    /// Connect and wait for `pusher:connection_established`.
    pub async fn connect(key: &str, cluster: &str) -> Result<Self> {
        let mut ws_url = url::Url::parse(&format!("wss://ws-{}.pusher.com/app/{}", cluster, key))
            .context("Invalid broadcaster URL")?;
        ws_url
            .query_pairs_mut()
            .append_pair("protocol", "7")
            .append_pair("client", "tindahan-cli")
            .append_pair("version", env!("CARGO_PKG_VERSION"));
        tracing::info!("Connecting WebSocket to {}", ws_url);

        let (stream, response) = connect_async(ws_url.as_str())
            .await
            .context("WebSocket connection failed")?;
        tracing::info!("WebSocket connected (status={})", response.status());

        let mut socket = Self {
            stream,
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
        };

        let established = socket
            .recv_event()
            .await?
            .context("Connection closed before handshake")?;
        if established.event != "pusher:connection_established" {
            bail!(
                "Expected pusher:connection_established, got {}",
                established.event
            );
        }
        if let Some(timeout) = established
            .data
            .as_ref()
            .and_then(|d| d.get("activity_timeout"))
            .and_then(|t| t.as_u64())
        {
            socket.activity_timeout = Duration::from_secs(timeout);
        }
        tracing::info!(
            "Handshake complete (activity timeout {}s)",
            socket.activity_timeout.as_secs()
        );

        Ok(socket)
    }

    /// Interval at which the client should ping when the connection is idle.
    pub fn activity_timeout(&self) -> Duration {
        self.activity_timeout
    }

    /// Subscribe to a public channel.
    pub async fn subscribe(&mut self, channel: &str) -> Result<()> {
        let frame = serde_json::json!({
            "event": "pusher:subscribe",
            "data": { "channel": channel },
        });
        self.send_text(&frame.to_string()).await
    }

    /// Send a protocol-level ping.
    pub async fn send_ping(&mut self) -> Result<()> {
        self.send_text(r#"{"event":"pusher:ping","data":{}}"#).await
    }

    async fn send_text(&mut self, msg: &str) -> Result<()> {
        tracing::debug!("WS send: {}", msg);
        self.stream
            .send(WsMessage::Text(msg.to_string()))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Receive the next channel event, answering pings and ignoring
    /// transport-level frames. Returns `None` on clean close.
    pub async fn recv_event(&mut self) -> Result<Option<ChannelEvent>> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);

                    let event = match parse_frame(&text) {
                        Some(event) => event,
                        None => {
                            tracing::warn!("Unparseable frame: {}", text);
                            continue;
                        }
                    };

                    if event.event == "pusher:ping" {
                        self.send_text(r#"{"event":"pusher:pong","data":{}}"#)
                            .await?;
                        continue;
                    }
                    if event.event == "pusher:pong" {
                        continue;
                    }

                    return Ok(Some(event));
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    self.stream
                        .send(WsMessage::Pong(data))
                        .await
                        .context("Failed to send pong")?;
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(e).context("WebSocket receive error");
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }
}

/// Parse one text frame into a `ChannelEvent`, decoding string-encoded
/// payloads into JSON values.
fn parse_frame(text: &str) -> Option<ChannelEvent> {
    let raw: RawFrame = serde_json::from_str(text).ok()?;

    let data = raw.data.map(|d| match d {
        serde_json::Value::String(s) => serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s)),
        other => other,
    });

    Some(ChannelEvent {
        event: raw.event,
        channel: raw.channel,
        data,
    })
}

/// True for the `MessageSent` broadcast, with or without its server-side
/// class namespace (`App\Events\MessageSent`).
pub fn is_message_sent(event: &str) -> bool {
    event == "MessageSent" || event.ends_with("\\MessageSent")
}

/// Extract the message payload from a `MessageSent` event.
pub fn parse_message_event(event: &ChannelEvent) -> Option<Message> {
    if !is_message_sent(&event.event) {
        return None;
    }
    let message = event.data.as_ref()?.get("message")?;
    match serde_json::from_value(message.clone()) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!("Malformed MessageSent payload: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_established_with_string_payload() {
        let event = parse_frame(
            r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"123.456\",\"activity_timeout\":120}"}"#,
        )
        .unwrap();
        assert_eq!(event.event, "pusher:connection_established");
        assert_eq!(
            event.data.unwrap().get("activity_timeout").unwrap().as_u64(),
            Some(120)
        );
    }

    #[test]
    fn parses_namespaced_message_sent_event() {
        let event = parse_frame(
            r#"{"event":"App\\Events\\MessageSent","channel":"chat","data":"{\"message\":{\"id\":5,\"sender_id\":7,\"recipient_id\":3,\"content\":\"hi\",\"created_at\":\"2024-05-01T10:00:00+08:00\"}}"}"#,
        )
        .unwrap();
        assert_eq!(event.channel.as_deref(), Some("chat"));

        let message = parse_message_event(&event).unwrap();
        assert_eq!(message.id, 5);
        assert_eq!(message.sender_id, 7);
        assert_eq!(message.recipient_id, 3);
    }

    #[test]
    fn bare_event_name_matches_too() {
        assert!(is_message_sent("MessageSent"));
        assert!(is_message_sent("App\\Events\\MessageSent"));
        assert!(!is_message_sent("OrderShipped"));
    }

    #[test]
    fn non_message_events_yield_no_message() {
        let event = parse_frame(
            r#"{"event":"pusher_internal:subscription_succeeded","channel":"chat","data":"{}"}"#,
        )
        .unwrap();
        assert!(parse_message_event(&event).is_none());
    }

    #[test]
    fn malformed_payload_is_dropped_not_fatal() {
        let event = parse_frame(
            r#"{"event":"MessageSent","channel":"chat","data":"{\"message\":{\"id\":\"not-a-number\"}}"}"#,
        )
        .unwrap();
        assert!(parse_message_event(&event).is_none());
    }

    #[test]
    fn unparseable_frame_is_none() {
        assert!(parse_frame("not json").is_none());
    }
}
