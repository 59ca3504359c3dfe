//! Token storage and management

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stored access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| now_unix() + secs);
        Self { token, expires_at }
    }

    /// Treats a token with less than a minute remaining as expired, so an
    /// in-flight request does not outlive it.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_unix() + 60 >= exp,
            None => false,
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_access_token(&self) -> Option<StoredToken>;
    fn set_access_token(&mut self, token: String, expires_in: Option<u64>);
    fn get_refresh_token(&self) -> Option<String>;
    fn set_refresh_token(&mut self, token: String);
    fn clear_tokens(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = StoredToken {
            token: "t".to_string(),
            expires_at: None,
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_expiry_slack() {
        // Expires in 30s: within the one-minute slack, counts as expired.
        let token = StoredToken::new("t".to_string(), Some(30));
        assert!(token.is_expired());

        let token = StoredToken::new("t".to_string(), Some(3600));
        assert!(!token.is_expired());
    }
}
