//! Message-related models

use serde::{Deserialize, Serialize};

use super::User;

/// A direct message between two users.
///
/// Directional: there is no read/delivery state on the wire. The optional
/// embedded `recipient` is only populated by some history responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    /// RFC 3339 timestamp as returned by the server.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<User>,
}

impl Message {
    /// Whether this message belongs to `user_id`'s traffic, as sender or
    /// recipient. The push channel is public, so this is the only filter
    /// between the wire and the visible list.
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }

    /// Local-time display timestamp, falling back to the raw string when
    /// the server value does not parse.
    pub fn display_time(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|_| self.created_at.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender_id: i64, recipient_id: i64) -> Message {
        Message {
            id: 1,
            sender_id,
            recipient_id,
            content: "hi".into(),
            created_at: "2024-05-01T10:00:00+08:00".into(),
            recipient: None,
        }
    }

    #[test]
    fn involves_matches_either_side() {
        assert!(msg(7, 3).involves(7));
        assert!(msg(3, 7).involves(7));
        assert!(!msg(9, 2).involves(7));
    }

    #[test]
    fn display_time_falls_back_to_raw() {
        let mut m = msg(1, 2);
        m.created_at = "not-a-date".into();
        assert_eq!(m.display_time(), "not-a-date");
    }
}
