//! Conversation aggregation
//!
//! A conversation is not a persisted entity: it is derived on every fetch
//! by partitioning the viewer's messages on (job, counterpart). The same
//! pair of parties talking about two different jobs is two conversations;
//! both directions of one pair on one job are a single conversation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::Message;

/// Identity of a conversation from the viewer's side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub job_id: String,
    pub counterpart_email: String,
}

/// A derived conversation thread.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub key: ConversationKey,
    /// Best known display name for the counterpart (from a message they
    /// sent), falling back to their email at display time.
    pub counterpart_name: Option<String>,
    /// All messages of the thread, oldest first.
    pub messages: Vec<Message>,
    pub last_activity: DateTime<Utc>,
    /// Messages addressed to the viewer with read == false.
    pub unread: usize,
}

impl Conversation {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Partition `messages` into conversations for `viewer_email`, sorted by
/// most recent activity first.
pub fn aggregate(viewer_email: &str, messages: Vec<Message>) -> Vec<Conversation> {
    let mut map: HashMap<ConversationKey, Conversation> = HashMap::new();

    for msg in messages {
        let counterpart = msg.counterpart_of(viewer_email).to_string();
        let key = ConversationKey {
            job_id: msg.job_id.clone(),
            counterpart_email: counterpart.clone(),
        };

        let conv = map.entry(key.clone()).or_insert_with(|| Conversation {
            key,
            counterpart_name: None,
            messages: Vec::new(),
            last_activity: msg.created_at,
            unread: 0,
        });

        if conv.last_activity < msg.created_at {
            conv.last_activity = msg.created_at;
        }
        if msg.receiver_email == viewer_email && !msg.read {
            conv.unread += 1;
        }
        if conv.counterpart_name.is_none() && msg.sender_email == counterpart {
            conv.counterpart_name = msg.sender_name.clone();
        }
        conv.messages.push(msg);
    }

    let mut convs: Vec<Conversation> = map.into_values().collect();
    for conv in &mut convs {
        conv.messages.sort_by_key(|m| m.created_at);
    }
    convs.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    convs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(
        id: &str,
        job: &str,
        from: &str,
        to: &str,
        minute: u32,
        read: bool,
    ) -> Message {
        Message {
            id: id.to_string(),
            job_id: job.to_string(),
            sender_email: from.to_string(),
            sender_name: Some(format!("{} name", from)),
            receiver_email: to.to_string(),
            message: format!("msg {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            read,
        }
    }

    #[test]
    fn test_both_directions_collapse_into_one_conversation() {
        let messages = vec![
            msg("m1", "42", "alice@x", "bob@x", 0, true),
            msg("m2", "42", "bob@x", "alice@x", 1, false),
            msg("m3", "42", "alice@x", "bob@x", 2, true),
        ];

        let convs = aggregate("alice@x", messages);
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].key.job_id, "42");
        assert_eq!(convs[0].key.counterpart_email, "bob@x");
        assert_eq!(convs[0].messages.len(), 3);
    }

    #[test]
    fn test_each_message_lands_in_exactly_one_conversation() {
        let messages = vec![
            msg("m1", "42", "alice@x", "bob@x", 0, true),
            msg("m2", "42", "carol@x", "alice@x", 1, false),
            msg("m3", "7", "bob@x", "alice@x", 2, false),
        ];

        let convs = aggregate("alice@x", messages.clone());
        assert_eq!(convs.len(), 3);
        for m in &messages {
            let holders: Vec<_> = convs
                .iter()
                .filter(|c| c.messages.iter().any(|cm| cm.id == m.id))
                .collect();
            assert_eq!(holders.len(), 1, "message {} in one conversation", m.id);
        }
    }

    #[test]
    fn test_key_pair_invariant_under_swapping_viewer() {
        let messages = vec![msg("m1", "42", "alice@x", "bob@x", 0, false)];

        let from_alice = aggregate("alice@x", messages.clone());
        let from_bob = aggregate("bob@x", messages);

        // Same underlying pair: each side sees the other as counterpart.
        assert_eq!(from_alice[0].key.counterpart_email, "bob@x");
        assert_eq!(from_bob[0].key.counterpart_email, "alice@x");
        assert_eq!(from_alice[0].key.job_id, from_bob[0].key.job_id);
    }

    #[test]
    fn test_unread_counts_only_messages_to_viewer() {
        let messages = vec![
            msg("m1", "42", "bob@x", "alice@x", 0, false),
            msg("m2", "42", "bob@x", "alice@x", 1, true),
            // Viewer's own unacknowledged message never counts.
            msg("m3", "42", "alice@x", "bob@x", 2, false),
        ];

        let convs = aggregate("alice@x", messages);
        assert_eq!(convs[0].unread, 1);
    }

    #[test]
    fn test_marking_read_zeroes_one_conversation_only() {
        let mut messages = vec![
            msg("m1", "42", "bob@x", "alice@x", 0, false),
            msg("m2", "7", "carol@x", "alice@x", 1, false),
        ];

        let before = aggregate("alice@x", messages.clone());
        assert!(before.iter().all(|c| c.unread == 1));

        // Selecting the (42, bob) conversation flips its read flags; the
        // recomputed aggregation must reflect that and nothing else.
        for m in &mut messages {
            if m.job_id == "42" && m.receiver_email == "alice@x" {
                m.read = true;
            }
        }

        let after = aggregate("alice@x", messages);
        let bob = after
            .iter()
            .find(|c| c.key.counterpart_email == "bob@x")
            .unwrap();
        let carol = after
            .iter()
            .find(|c| c.key.counterpart_email == "carol@x")
            .unwrap();
        assert_eq!(bob.unread, 0);
        assert_eq!(carol.unread, 1);
    }

    #[test]
    fn test_sorted_by_last_activity_descending() {
        let messages = vec![
            msg("m1", "42", "bob@x", "alice@x", 0, true),
            msg("m2", "7", "carol@x", "alice@x", 5, true),
            msg("m3", "42", "alice@x", "bob@x", 9, true),
        ];

        let convs = aggregate("alice@x", messages);
        assert_eq!(convs[0].key.counterpart_email, "bob@x");
        assert_eq!(convs[1].key.counterpart_email, "carol@x");
    }

    #[test]
    fn test_messages_within_conversation_are_chronological() {
        // Input arrives newest first (the fetch orders descending).
        let messages = vec![
            msg("m3", "42", "alice@x", "bob@x", 9, true),
            msg("m1", "42", "bob@x", "alice@x", 0, true),
            msg("m2", "42", "bob@x", "alice@x", 4, true),
        ];

        let convs = aggregate("alice@x", messages);
        let ids: Vec<&str> = convs[0].messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_counterpart_name_taken_from_their_messages() {
        let messages = vec![
            msg("m1", "42", "alice@x", "bob@x", 0, true),
            msg("m2", "42", "bob@x", "alice@x", 1, true),
        ];

        let convs = aggregate("alice@x", messages);
        assert_eq!(convs[0].counterpart_name.as_deref(), Some("bob@x name"));
    }
}
