//! Conversation state for the direct-messaging views
//!
//! A `Conversation` owns the visible message list for the currently
//! selected peer. It is built from two sources: a history snapshot fetched
//! when the peer is selected, and live events pushed over the public
//! channel afterwards. Because the channel carries every user's traffic
//! and history fetches can resolve out of order, the struct enforces:
//!
//! - a fetch-generation guard: history results are only applied when their
//!   token still matches the current selection;
//! - client-side filtering: a live event is appended only when the session
//!   user is its sender or recipient;
//! - id-based de-duplication between the live echo and a refreshed
//!   snapshot of the same message.

use thiserror::Error;

use crate::models::{Message, User};

/// Ticket for one history fetch. Results presented with a stale token
/// (issued before a later peer switch) are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryToken {
    generation: u64,
}

/// Composer validation failure; surfaced inline, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("This field is required")]
    Required,
}

/// Validate composer input: trims whitespace, rejects empty content.
pub fn validate_content(input: &str) -> Result<String, ComposeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ComposeError::Required);
    }
    Ok(trimmed.to_string())
}

/// Message-list state for a single mounted chat view.
pub struct Conversation {
    session_user_id: i64,
    peer: Option<User>,
    messages: Vec<Message>,
    generation: u64,
    /// True while a history snapshot for the current peer is in flight.
    loading: bool,
    /// Set when a send settles; consumed by the next refresh.
    history_invalidated: bool,
}

impl Conversation {
    pub fn new(session_user_id: i64) -> Self {
        Self {
            session_user_id,
            peer: None,
            messages: Vec::new(),
            generation: 0,
            loading: false,
            history_invalidated: false,
        }
    }

    pub fn session_user_id(&self) -> i64 {
        self.session_user_id
    }

    pub fn peer(&self) -> Option<&User> {
        self.peer.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Select a peer. The visible list resets immediately so no stale
    /// transcript flashes while the new history loads; the returned token
    /// must accompany the history result.
    pub fn select_peer(&mut self, peer: User) -> HistoryToken {
        self.peer = Some(peer);
        self.messages.clear();
        self.generation += 1;
        self.loading = true;
        self.history_invalidated = false;
        HistoryToken {
            generation: self.generation,
        }
    }

    /// Issue a token for re-fetching the current peer's history without
    /// clearing the visible list (used after send-settle invalidation).
    /// Returns `None` when no peer is selected.
    pub fn refresh_token(&mut self) -> Option<HistoryToken> {
        self.peer.as_ref()?;
        self.generation += 1;
        self.loading = true;
        Some(HistoryToken {
            generation: self.generation,
        })
    }

    /// Deselect the peer and discard all view state.
    pub fn clear_peer(&mut self) {
        self.peer = None;
        self.messages.clear();
        self.generation += 1;
        self.loading = false;
        self.history_invalidated = false;
    }

    /// Apply a history snapshot. Returns false (and changes nothing) when
    /// the token is stale, i.e. the selection moved on while the fetch was
    /// in flight.
    ///
    /// Messages already visible (live events that raced the fetch) are kept,
    /// appended after the snapshot, minus ids the snapshot already carries.
    pub fn apply_history(&mut self, token: HistoryToken, messages: Vec<Message>) -> bool {
        if token.generation != self.generation {
            tracing::debug!(
                "Discarding stale history result (token gen {}, current {})",
                token.generation,
                self.generation
            );
            return false;
        }

        let mut merged = messages;
        for message in std::mem::take(&mut self.messages) {
            if !merged.iter().any(|m| m.id == message.id) {
                merged.push(message);
            }
        }
        self.messages = merged;
        self.loading = false;
        true
    }

    /// Mark a history fetch as failed so the loading state clears. The
    /// stale-token rule applies here too.
    pub fn history_failed(&mut self, token: HistoryToken) {
        if token.generation == self.generation {
            self.loading = false;
        }
    }

    /// Apply a live event from the push channel. Appends only when the
    /// session user is involved and the message id is not already shown.
    /// Returns true when the visible list changed.
    pub fn apply_live_event(&mut self, message: &Message) -> bool {
        if self.peer.is_none() {
            return false;
        }
        if !message.involves(self.session_user_id) {
            return false;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            tracing::debug!("Ignoring duplicate live event for message {}", message.id);
            return false;
        }
        self.messages.push(message.clone());
        true
    }

    /// Settle hook: mark the cached history stale. Called on send success
    /// and failure alike.
    pub fn invalidate_history(&mut self) {
        self.history_invalidated = true;
    }

    /// Consume the invalidation flag. The caller re-fetches when true.
    pub fn take_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.history_invalidated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> User {
        User {
            id,
            first_name: format!("User{}", id),
            last_name: "Test".into(),
            ..Default::default()
        }
    }

    fn message(id: i64, sender_id: i64, recipient_id: i64) -> Message {
        Message {
            id,
            sender_id,
            recipient_id,
            content: "hi".into(),
            created_at: "2024-05-01T10:00:00+08:00".into(),
            recipient: None,
        }
    }

    #[test]
    fn validate_content_trims_and_rejects_blank() {
        assert_eq!(validate_content("  hello  ").unwrap(), "hello");
        assert_eq!(validate_content(""), Err(ComposeError::Required));
        assert_eq!(validate_content("   \t\n"), Err(ComposeError::Required));
    }

    #[test]
    fn select_peer_resets_list_before_history_arrives() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        assert!(conv.apply_history(token, vec![message(1, 7, 3), message(2, 3, 7)]));
        assert_eq!(conv.messages().len(), 2);

        // Switching peers empties the visible list immediately.
        conv.select_peer(user(5));
        assert!(conv.messages().is_empty());
        assert!(conv.is_loading());
    }

    #[test]
    fn stale_history_result_is_discarded() {
        let mut conv = Conversation::new(7);
        let token_a = conv.select_peer(user(3));
        let token_b = conv.select_peer(user(5));

        // Slow fetch for peer 3 resolves after the switch to peer 5.
        assert!(!conv.apply_history(token_a, vec![message(1, 7, 3)]));
        assert!(conv.messages().is_empty());

        assert!(conv.apply_history(token_b, vec![message(9, 5, 7)]));
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].id, 9);
    }

    #[test]
    fn empty_history_is_not_an_error() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        assert!(conv.apply_history(token, vec![]));
        assert!(conv.messages().is_empty());
        assert!(!conv.is_loading());
    }

    #[test]
    fn live_event_filtered_to_session_user() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        conv.apply_history(token, vec![]);

        // sender 7 -> recipient 3: session user is the sender, appended.
        assert!(conv.apply_live_event(&message(10, 7, 3)));
        // sender 3 -> recipient 7: session user is the recipient, appended.
        assert!(conv.apply_live_event(&message(11, 3, 7)));
        // Unrelated traffic on the shared channel: ignored.
        assert!(!conv.apply_live_event(&message(12, 9, 2)));

        let ids: Vec<i64> = conv.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn live_event_without_selected_peer_is_dropped() {
        let mut conv = Conversation::new(7);
        assert!(!conv.apply_live_event(&message(1, 7, 3)));

        let token = conv.select_peer(user(3));
        conv.apply_history(token, vec![]);
        conv.clear_peer();
        assert!(!conv.apply_live_event(&message(2, 3, 7)));
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn live_event_during_history_fetch_survives_the_snapshot() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));

        // Event lands while the backlog fetch is still in flight.
        assert!(conv.apply_live_event(&message(5, 3, 7)));
        assert!(conv.apply_history(token, vec![message(1, 7, 3)]));

        let ids: Vec<i64> = conv.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert!(!conv.is_loading());
    }

    #[test]
    fn snapshot_containing_the_live_echo_does_not_duplicate_it() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        conv.apply_live_event(&message(5, 3, 7));

        // The snapshot already includes the raced event.
        assert!(conv.apply_history(token, vec![message(1, 7, 3), message(5, 3, 7)]));
        let ids: Vec<i64> = conv.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn duplicate_live_echo_is_deduplicated_by_id() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        conv.apply_history(token, vec![message(1, 7, 3)]);

        // The refetch after settle already delivered id 1; the late echo
        // of the same message must not double-insert.
        assert!(!conv.apply_live_event(&message(1, 7, 3)));
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn settle_invalidation_fires_on_both_paths() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        conv.apply_history(token, vec![]);

        // Success path.
        conv.invalidate_history();
        assert!(conv.take_invalidated());
        assert!(!conv.take_invalidated());

        // Failure path settles the same way.
        conv.invalidate_history();
        assert!(conv.take_invalidated());
    }

    #[test]
    fn refresh_keeps_transcript_until_new_snapshot_lands() {
        let mut conv = Conversation::new(7);
        let token = conv.select_peer(user(3));
        conv.apply_history(token, vec![message(1, 7, 3)]);

        let refresh = conv.refresh_token().unwrap();
        // Old messages stay visible while the refresh is in flight.
        assert_eq!(conv.messages().len(), 1);
        assert!(conv.is_loading());

        // The old token is now stale.
        assert!(!conv.apply_history(token, vec![]));
        assert!(conv.apply_history(refresh, vec![message(1, 7, 3), message(2, 3, 7)]));
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn refresh_without_peer_returns_none() {
        let mut conv = Conversation::new(7);
        assert!(conv.refresh_token().is_none());
    }

    #[test]
    fn failed_history_clears_loading_only_for_current_generation() {
        let mut conv = Conversation::new(7);
        let token_a = conv.select_peer(user(3));
        let token_b = conv.select_peer(user(5));

        conv.history_failed(token_a);
        assert!(conv.is_loading());

        conv.history_failed(token_b);
        assert!(!conv.is_loading());
    }
}
