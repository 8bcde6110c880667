//! Direct messaging endpoints
//!
//! History is a single unpaginated fetch per peer; sends go through the
//! generic mutation envelope. The push channel delivers the live echo.

use anyhow::{Context, Result};

use super::client::{ApiClient, Envelope};
use crate::models::Message;

/// Fetch the full conversation backlog with `peer_id`.
///
/// The endpoint returns a bare array, not the `{data}` envelope.
pub async fn get_messages(client: &ApiClient, peer_id: i64) -> Result<Vec<Message>> {
    let resp = client
        .get("/api/messages", &[("recipient_id", peer_id.to_string())])
        .await?;
    let messages: Vec<Message> = resp
        .json()
        .await
        .context("Failed to parse messages response")?;
    Ok(messages)
}

/// Send a message to `recipient_id`. Content is expected to be validated
/// (non-empty) by the caller; see `chat::validate_content`.
pub async fn send_message_with_client(
    client: &ApiClient,
    recipient_id: i64,
    content: &str,
) -> Result<Envelope> {
    let body = serde_json::json!({
        "recipient_id": recipient_id,
        "content": content,
    });

    let resp = client.post("/api/messages/send-message", &body).await?;
    let envelope: Envelope = resp
        .json()
        .await
        .context("Failed to parse send response")?;
    Ok(envelope)
}

/// Read the conversation with a peer (prints to stdout).
pub async fn read_messages(peer_id: i64) -> Result<()> {
    let client = ApiClient::new()?;
    let own_id = client.session_user().map(|u| u.id).unwrap_or_default();
    let messages = get_messages(&client, peer_id).await?;

    if messages.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &messages {
        let direction = if msg.sender_id == own_id { ">" } else { "<" };
        println!("[{}] {} {}", msg.display_time(), direction, msg.content);
    }

    Ok(())
}

/// Send a message from the command line.
pub async fn send_message(recipient_id: i64, content: &str) -> Result<()> {
    let content = crate::chat::validate_content(content)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let client = ApiClient::new()?;
    let envelope = send_message_with_client(&client, recipient_id, &content).await?;

    println!("{}", envelope.message.as_deref().unwrap_or("Message sent."));
    Ok(())
}
