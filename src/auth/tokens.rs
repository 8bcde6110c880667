//! Token storage and management

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::User;

/// Stored API bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + secs
        });

        Self { token, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs();
                // Consider expired if less than 5 minutes remaining
                now + 300 >= exp
            }
            None => false,
        }
    }
}

/// Session storage backend: the bearer token plus the cached profile of the
/// user it belongs to.
pub trait SessionStore {
    fn get_auth_token(&self) -> Option<StoredToken>;
    fn get_user(&self) -> Option<User>;
    fn set_session(&mut self, token: StoredToken, user: User);
    fn update_user(&mut self, user: User);
    fn clear_session(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_expires() {
        let token = StoredToken::new("t".into(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn token_expiring_soon_counts_as_expired() {
        // 60s remaining is inside the 5 minute margin.
        let token = StoredToken::new("t".into(), Some(60));
        assert!(token.is_expired());

        let token = StoredToken::new("t".into(), Some(3600));
        assert!(!token.is_expired());
    }
}
