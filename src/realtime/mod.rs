//! Live-event subscription for the messaging views
//!
//! Connects to the broadcaster's public `chat` channel and delivers
//! `MessageSent` events. The channel carries all users' traffic; filtering
//! to the session user happens on the receiving side (`chat::Conversation`
//! or the `listen` command). That is the upstream contract, not a choice
//! this client makes.

pub mod socket;

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use crate::config::Config;
use crate::models::Message;
use socket::{parse_message_event, PusherSocket};

/// The single public channel the server broadcasts on.
pub const CHANNEL: &str = "chat";

/// Backoff cap between reconnect attempts.
const MAX_BACKOFF_SECS: u64 = 64;

/// A session older than this resets the backoff on disconnect.
const STABILITY_THRESHOLD: Duration = Duration::from_secs(60);

/// Reason the inner connection loop exited.
enum DisconnectReason {
    /// Clean shutdown (Ctrl+C). Do not reconnect.
    Shutdown,
    /// Error or server-initiated close. Should reconnect.
    Error(anyhow::Error),
}

/// Update pushed to a subscribed view.
#[derive(Debug)]
pub enum LiveUpdate {
    Connected,
    Disconnected(String),
    Message(Message),
}

/// Scoped handle on a live-event subscription.
///
/// Both chat views acquire their subscription through this type, so
/// teardown is uniform: dropping the handle aborts the listener task
/// unconditionally. Holders keep at most one alive per mounted view.
pub struct Subscription {
    handle: tokio::task::JoinHandle<()>,
}

impl Subscription {
    /// Spawn the background listener. Reconnects with exponential backoff
    /// until dropped; updates flow through `tx`.
    pub fn spawn(key: String, cluster: String, tx: mpsc::UnboundedSender<LiveUpdate>) -> Self {
        let handle = tokio::spawn(async move {
            let mut backoff = 1u64;

            loop {
                let connected_at = Instant::now();
                match run_session(&key, &cluster, &tx).await {
                    Ok(()) => {
                        let _ = tx.send(LiveUpdate::Disconnected("connection closed".into()));
                    }
                    Err(e) => {
                        tracing::warn!("Push channel error: {:#}", e);
                        let _ = tx.send(LiveUpdate::Disconnected(format!("{:#}", e)));
                    }
                }

                if connected_at.elapsed() >= STABILITY_THRESHOLD {
                    backoff = 1;
                }
                time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
            }
        });

        Self { handle }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One connected session feeding `tx` until the socket drops.
async fn run_session(
    key: &str,
    cluster: &str,
    tx: &mpsc::UnboundedSender<LiveUpdate>,
) -> Result<()> {
    let mut ws = PusherSocket::connect(key, cluster).await?;
    ws.subscribe(CHANNEL).await?;
    let _ = tx.send(LiveUpdate::Connected);

    let mut keepalive = time::interval(ws.activity_timeout());
    keepalive.tick().await; // skip first immediate tick

    loop {
        tokio::select! {
            event = ws.recv_event() => {
                match event? {
                    Some(event) => {
                        if let Some(message) = parse_message_event(&event) {
                            if tx.send(LiveUpdate::Message(message)).is_err() {
                                // Receiver dropped; subscription is gone.
                                return Ok(());
                            }
                        }
                    }
                    None => return Ok(()),
                }
            }
            _ = keepalive.tick() => {
                ws.send_ping().await?;
            }
        }
    }
}

/// Run the `listen` command: print the session user's live messages with
/// automatic reconnection (exponential backoff, reset after a stable
/// session). Ctrl+C exits cleanly.
pub async fn connect_and_run() -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let (key, cluster) = broadcaster_settings(&config)?;

    let session_user_id = {
        use crate::auth::SessionStore;
        config
            .get_user()
            .context("Not logged in. Run 'tindahan-cli login' first.")?
            .id
    };

    let mut backoff = 1u64;

    loop {
        let connected_at = Instant::now();
        match listen_session(&key, &cluster, session_user_id).await {
            Ok(DisconnectReason::Shutdown) => {
                return Ok(());
            }
            Ok(DisconnectReason::Error(e)) => {
                if connected_at.elapsed() >= STABILITY_THRESHOLD {
                    backoff = 1;
                }
                tracing::warn!("Disconnected: {:#}. Reconnecting in {}s...", e, backoff);

                tokio::select! {
                    _ = time::sleep(Duration::from_secs(backoff)) => {}
                    _ = tokio::signal::ctrl_c() => {
                        println!("Shutting down...");
                        return Ok(());
                    }
                }

                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
            }
            Err(e) => {
                tracing::warn!("Connect failed: {:#}. Retrying in {}s...", e, backoff);

                tokio::select! {
                    _ = time::sleep(Duration::from_secs(backoff)) => {}
                    _ = tokio::signal::ctrl_c() => {
                        println!("Shutting down...");
                        return Ok(());
                    }
                }

                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
            }
        }
    }
}

/// One full listen session: connect, subscribe, print events.
async fn listen_session(
    key: &str,
    cluster: &str,
    session_user_id: i64,
) -> Result<DisconnectReason> {
    let mut ws = PusherSocket::connect(key, cluster).await?;
    ws.subscribe(CHANNEL).await?;

    let mut keepalive = time::interval(ws.activity_timeout());
    keepalive.tick().await;

    println!("Listening on '{}'... (Ctrl-C to stop)", CHANNEL);

    loop {
        tokio::select! {
            event = ws.recv_event() => {
                match event {
                    Ok(Some(event)) => {
                        if let Some(message) = parse_message_event(&event) {
                            // Shared channel: only show our own traffic.
                            if message.involves(session_user_id) {
                                let direction = if message.sender_id == session_user_id {
                                    format!("to {}", message.recipient_id)
                                } else {
                                    format!("from {}", message.sender_id)
                                };
                                println!("[{}] {} {}", message.display_time(), direction, message.content);
                            }
                        } else if event.event.starts_with("pusher:error") {
                            tracing::warn!("Broadcaster error event: {:?}", event.data);
                        }
                    }
                    Ok(None) => {
                        return Ok(DisconnectReason::Error(anyhow::anyhow!(
                            "WebSocket closed by server"
                        )));
                    }
                    Err(e) => {
                        return Ok(DisconnectReason::Error(e.context("WebSocket recv error")));
                    }
                }
            }
            _ = keepalive.tick() => {
                if let Err(e) = ws.send_ping().await {
                    return Ok(DisconnectReason::Error(e.context("Keepalive ping failed")));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                return Ok(DisconnectReason::Shutdown);
            }
        }
    }
}

/// Broadcaster key + cluster from config, with a clear error when unset.
pub fn broadcaster_settings(config: &Config) -> Result<(String, String)> {
    let key = config
        .pusher_key
        .clone()
        .context("No broadcaster key configured. Set TINDAHAN_PUSHER_KEY or pusher_key in the config file.")?;
    Ok((key, config.pusher_cluster.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcaster_settings_requires_a_key() {
        let config = Config::default();
        assert!(broadcaster_settings(&config).is_err());

        let config = Config {
            pusher_key: Some("abc123".into()),
            ..Default::default()
        };
        let (key, cluster) = broadcaster_settings(&config).unwrap();
        assert_eq!(key, "abc123");
        assert_eq!(cluster, "ap1");
    }

    #[test]
    fn dropping_subscription_releases_the_listener() {
        tokio_test::block_on(async {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let subscription = Subscription::spawn("key".into(), "ap1".into(), tx);
            drop(subscription);

            // The aborted task drops its sender; the channel drains to close.
            while rx.recv().await.is_some() {}
        });
    }
}
