//! Live message channel for one active conversation
//!
//! Holds the (job, viewer, counterpart) triple's message list in sync
//! with backend inserts. The push subscription is scoped server-side only
//! by job_id, so every incoming event is re-checked against the triple's
//! two directions here. Dedup is by message id: the optimistic local copy
//! of a send and its server echo collapse to one entry regardless of
//! which lands first.

use std::collections::HashSet;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{self, client::BoardClient};
use crate::models::{Message, Viewer};
use crate::realtime::Subscription;

/// Pure synchronization state for one conversation. No I/O, so the
/// dedup, relevance, and ordering rules are testable in isolation.
pub struct ChatState {
    job_id: String,
    viewer_email: String,
    counterpart_email: String,
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl ChatState {
    pub fn new(job_id: &str, viewer_email: &str, counterpart_email: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            viewer_email: viewer_email.to_string(),
            counterpart_email: counterpart_email.to_string(),
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Replace the list with fetched history (oldest first), seeding the
    /// seen-id set so later echoes of these messages are dropped.
    pub fn load_history(&mut self, history: Vec<Message>) {
        self.messages.clear();
        self.seen.clear();
        for msg in history {
            if self.seen.insert(msg.id.clone()) {
                self.messages.push(msg);
            }
        }
    }

    /// Does this message belong to the active triple? An event for the
    /// wrong job or the wrong pair is someone else's conversation.
    pub fn is_relevant(&self, msg: &Message) -> bool {
        msg.job_id == self.job_id
            && ((msg.sender_email == self.viewer_email
                && msg.receiver_email == self.counterpart_email)
                || (msg.sender_email == self.counterpart_email
                    && msg.receiver_email == self.viewer_email))
    }

    /// Merge an incoming insert event. Returns true if the message was
    /// appended, false if it was irrelevant or already present.
    pub fn apply_insert(&mut self, msg: Message) -> bool {
        if !self.is_relevant(&msg) {
            return false;
        }
        if !self.seen.insert(msg.id.clone()) {
            return false;
        }

        // Events usually arrive in order; walk back only when one is late.
        let pos = self
            .messages
            .iter()
            .rposition(|m| m.created_at <= msg.created_at)
            .map(|p| p + 1)
            .unwrap_or(0);
        self.messages.insert(pos, msg);
        true
    }

    /// Append an optimistic local send before the backend acknowledges.
    pub fn append_local(&mut self, msg: Message) {
        if self.seen.insert(msg.id.clone()) {
            self.messages.push(msg);
        }
    }

    /// Remove a message whose backend write failed.
    pub fn rollback(&mut self, id: &str) {
        self.messages.retain(|m| m.id != id);
        self.seen.remove(id);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// The live channel: history + push subscription + optimistic sends for
/// one active triple.
pub struct LiveChat {
    state: ChatState,
}

impl LiveChat {
    /// Fetch the conversation history and open the job-scoped insert
    /// subscription. The subscription is returned alongside so the caller
    /// can poll it without borrowing the chat state; the caller must
    /// `release()` it on teardown, and before opening another triple.
    pub async fn open(
        client: &BoardClient,
        viewer: &Viewer,
        job_id: &str,
        counterpart: &str,
    ) -> Result<(Self, Subscription)> {
        let history =
            api::messages::fetch_history(client, job_id, &viewer.email, counterpart).await?;

        let subscription = Subscription::insert_events(
            &client.realtime_url()?,
            "messages",
            &format!("job_id=eq.{}", job_id),
        )
        .await
        .context("Failed to open message subscription")?;

        let mut state = ChatState::new(job_id, &viewer.email, counterpart);
        state.load_history(history);

        Ok((Self { state }, subscription))
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    /// Merge one raw insert event from the subscription. Returns the
    /// message if it belonged to this conversation and was new; echoes of
    /// already-seen messages, events for other pairs on the same job, and
    /// partial records all come back as None.
    pub fn apply_event(&mut self, record: serde_json::Value) -> Option<Message> {
        let msg: Message = match serde_json::from_value(record) {
            Ok(msg) => msg,
            Err(e) => {
                // Partial event: cannot be matched to the triple.
                tracing::debug!("Discarding malformed insert event: {}", e);
                return None;
            }
        };

        if self.state.apply_insert(msg.clone()) {
            Some(msg)
        } else {
            None
        }
    }

    /// Optimistically append and send a message. On backend failure the
    /// local copy is removed and the error returned; the caller decides
    /// whether to retry (nothing here does, to avoid duplicate sends).
    pub async fn send(
        &mut self,
        client: &BoardClient,
        viewer: &Viewer,
        text: &str,
    ) -> Result<Message> {
        let msg = super::new_outgoing(viewer, &self.state.job_id, &self.state.counterpart_email, text);
        self.state.append_local(msg.clone());

        if let Err(e) = api::messages::insert(client, &msg).await {
            self.state.rollback(&msg.id);
            return Err(e).context("Failed to send message");
        }

        Ok(msg)
    }
}

/// Interactive follow mode: print the history, then stream incoming
/// messages while reading outgoing lines from stdin. Ctrl-C (or EOF on
/// stdin) releases the subscription and exits.
pub async fn run(job_id: &str, counterpart: &str) -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;
    let (mut chat, mut subscription) =
        LiveChat::open(&client, &viewer, job_id, counterpart).await?;

    for msg in chat.messages() {
        super::print_message(msg, &viewer);
    }

    // Opening the conversation counts as reading it.
    if let Err(e) =
        api::messages::mark_conversation_read(&client, job_id, &viewer.email, counterpart).await
    {
        tracing::warn!("Failed to mark conversation read: {:#}", e);
    }

    println!("-- live, type to send, Ctrl-C to quit --");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            incoming = subscription.next_insert() => {
                match incoming {
                    Ok(Some(record)) => {
                        if let Some(msg) = chat.apply_event(record) {
                            super::print_message(&msg, &viewer);
                        }
                    }
                    Ok(None) => {
                        println!("-- connection closed by server --");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Live channel error: {:#}", e);
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) if !text.trim().is_empty() => {
                        match chat.send(&client, &viewer, &text).await {
                            // The push echo of this send is deduped away,
                            // so the returned copy is the one rendering.
                            Ok(msg) => super::print_message(&msg, &viewer),
                            Err(e) => eprintln!("send failed: {:#}", e),
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("stdin error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    subscription
        .release()
        .await
        .context("Failed to release subscription")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, job: &str, from: &str, to: &str, minute: u32) -> Message {
        Message {
            id: id.to_string(),
            job_id: job.to_string(),
            sender_email: from.to_string(),
            sender_name: None,
            receiver_email: to.to_string(),
            message: "hello".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            read: false,
        }
    }

    #[test]
    fn test_optimistic_send_then_echo_appears_once() {
        // Viewer sends m1 on job 42; the backend later echoes the same
        // insert through the push channel.
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        state.load_history(vec![]);

        let sent = msg("m1", "42", "alice@x", "bob@x", 0);
        state.append_local(sent.clone());
        assert_eq!(state.messages().len(), 1);

        let echoed = state.apply_insert(sent);
        assert!(!echoed);
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_echo_before_history_is_also_deduped() {
        // Order between the optimistic copy and the echo is not
        // guaranteed; dedup must be id-based, not order-based.
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        let m = msg("m1", "42", "bob@x", "alice@x", 0);
        assert!(state.apply_insert(m.clone()));
        assert!(!state.apply_insert(m));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_event_for_other_pair_on_same_job_discarded() {
        // Subscription is job-scoped; a message between the employer and
        // a different applicant arrives here too and must be dropped.
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        let other = msg("m9", "42", "carol@x", "bob@x", 0);
        assert!(!state.apply_insert(other));
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_event_for_previous_conversation_not_appended_after_switch() {
        // Switched from (jobA, alice) to (jobB, bob): a late event from
        // the old scope must not land in the new list.
        let state_before = ChatState::new("jobA", "me@x", "alice@x");
        drop(state_before);
        let mut state = ChatState::new("jobB", "me@x", "bob@x");

        let late = msg("m5", "jobA", "alice@x", "me@x", 3);
        assert!(!state.apply_insert(late));
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_rollback_removes_failed_send_and_allows_reinsert() {
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        let m = msg("m1", "42", "alice@x", "bob@x", 0);

        state.append_local(m.clone());
        state.rollback("m1");
        assert!(state.messages().is_empty());

        // If the write actually landed server-side the echo (or the next
        // fetch) brings the message back.
        assert!(state.apply_insert(m));
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_late_event_inserted_in_time_order() {
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        state.load_history(vec![
            msg("m1", "42", "bob@x", "alice@x", 0),
            msg("m3", "42", "bob@x", "alice@x", 4),
        ]);

        assert!(state.apply_insert(msg("m2", "42", "alice@x", "bob@x", 2)));
        let ids: Vec<&str> = state.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_history_reload_resets_seen_set() {
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        state.load_history(vec![msg("m1", "42", "bob@x", "alice@x", 0)]);
        state.load_history(vec![msg("m2", "42", "bob@x", "alice@x", 1)]);

        // m1 is gone from the seen set after reload, so it may reappear.
        assert!(state.apply_insert(msg("m1", "42", "bob@x", "alice@x", 0)));
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_sent_message_rendered_from_send_result_not_echo() {
        // The send path displays the returned message; the push echo of
        // the same insert must come back None so it is not shown twice.
        let mut chat = LiveChat {
            state: ChatState::new("42", "alice@x", "bob@x"),
        };
        let sent = msg("m1", "42", "alice@x", "bob@x", 0);
        chat.state.append_local(sent.clone());

        let record = serde_json::to_value(&sent).unwrap();
        assert!(chat.apply_event(record).is_none());
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn test_send_grows_list_by_exactly_one() {
        // Scenario: "Hello" with client id m1 on job 42, then the echo.
        let mut state = ChatState::new("42", "alice@x", "bob@x");
        state.load_history(vec![msg("m0", "42", "bob@x", "alice@x", 0)]);
        let before = state.messages().len();

        let hello = msg("m1", "42", "alice@x", "bob@x", 1);
        state.append_local(hello.clone());
        state.apply_insert(hello);

        assert_eq!(state.messages().len(), before + 1);
    }
}
