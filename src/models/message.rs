//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message between an employer and an applicant about one job.
///
/// The id is generated client-side (UUID v4) before insert so that the
/// optimistic local copy and the server echo can be deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub job_id: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub receiver_email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// The party in this message that is not `viewer_email`.
    ///
    /// When the viewer sent the message this is the receiver, otherwise
    /// the sender. Messages the viewer sent to themselves resolve to the
    /// viewer (degenerate, but stable).
    pub fn counterpart_of(&self, viewer_email: &str) -> &str {
        if self.sender_email == viewer_email {
            &self.receiver_email
        } else {
            &self.sender_email
        }
    }
}
