//! User / viewer identity models

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the backend auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// The identity the sync layer operates on behalf of.
///
/// Passed explicitly to the aggregator, live channel, and poller instead
/// of being read from ambient auth state.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Viewer {
    /// Name used on outgoing messages, falling back to the email.
    pub fn sender_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.email.clone())
    }
}
