//! Insert-event subscription with an explicit acquire/release lifecycle
//!
//! One subscription per active conversation. The holder must call
//! `release()` before opening a subscription for a different scope, so a
//! stale channel cannot deliver events into the new scope's buffer.

use std::time::Duration;

use tokio::time;

use super::socket::{ChannelMessage, RealtimeSocket};
use super::RealtimeError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A live feed of INSERT events for one table, scoped by one column
/// filter.
pub struct Subscription {
    socket: RealtimeSocket,
    topic: String,
    next_ref: u64,
    heartbeat: time::Interval,
    released: bool,
}

impl Subscription {
    /// Open the websocket, join the channel for `table` restricted by
    /// `filter` (e.g. `job_id=eq.42`), and wait for the join reply.
    pub async fn insert_events(
        realtime_url: &str,
        table: &str,
        filter: &str,
    ) -> Result<Self, RealtimeError> {
        let topic = format!("realtime:public:{}:{}", table, filter);
        let mut socket = RealtimeSocket::connect(realtime_url).await?;

        let join = ChannelMessage {
            topic: topic.clone(),
            event: "phx_join".to_string(),
            payload: serde_json::json!({}),
            reference: Some("1".to_string()),
        };
        socket.send(&join).await?;

        // The join reply arrives before any event on this channel.
        loop {
            match socket.recv().await? {
                Some(msg) if msg.topic == topic && msg.event == "phx_reply" => {
                    let status = msg.payload["status"].as_str().unwrap_or("");
                    if status != "ok" {
                        return Err(RealtimeError::JoinRejected(msg.payload.to_string()));
                    }
                    tracing::info!("Subscribed to {}", topic);
                    break;
                }
                Some(other) => {
                    tracing::debug!("Frame before join reply (ignored): {}", other.event);
                }
                None => return Err(RealtimeError::Closed),
            }
        }

        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // skip first immediate tick

        Ok(Self {
            socket,
            topic,
            next_ref: 2,
            heartbeat,
            released: false,
        })
    }

    /// Wait for the next INSERT event on this channel and return its
    /// `record` payload. Returns Ok(None) when the server closes the
    /// connection. Heartbeats are sent from inside this wait, so the
    /// holder should keep polling even when idle.
    pub async fn next_insert(&mut self) -> Result<Option<serde_json::Value>, RealtimeError> {
        loop {
            tokio::select! {
                msg = self.socket.recv() => {
                    match msg? {
                        Some(msg) if msg.topic == self.topic && msg.event == "INSERT" => {
                            let mut payload = msg.payload;
                            let record = payload
                                .get_mut("record")
                                .map(serde_json::Value::take)
                                .unwrap_or(serde_json::Value::Null);
                            if record.is_object() {
                                return Ok(Some(record));
                            }
                            tracing::debug!("INSERT event without record (discarded)");
                        }
                        Some(msg) if msg.event == "phx_error" => {
                            return Err(RealtimeError::Protocol(format!(
                                "channel error on {}: {}",
                                msg.topic, msg.payload
                            )));
                        }
                        Some(other) => {
                            // Heartbeat replies and events for other scopes.
                            tracing::debug!("Realtime frame (ignored): {}", other.event);
                        }
                        None => return Ok(None),
                    }
                }
                _ = self.heartbeat.tick() => {
                    let beat = self.heartbeat_message();
                    self.socket.send(&beat).await?;
                }
            }
        }
    }

    /// Leave the channel and close the socket. Consumes the subscription;
    /// a new scope requires a new `insert_events` call.
    pub async fn release(mut self) -> Result<(), RealtimeError> {
        let leave = ChannelMessage {
            topic: self.topic.clone(),
            event: "phx_leave".to_string(),
            payload: serde_json::json!({}),
            reference: Some(self.take_ref()),
        };
        if let Err(e) = self.socket.send(&leave).await {
            tracing::debug!("phx_leave send failed: {}", e);
        }
        self.socket.close().await;
        self.released = true;
        tracing::info!("Released subscription {}", self.topic);
        Ok(())
    }

    fn heartbeat_message(&mut self) -> ChannelMessage {
        ChannelMessage {
            topic: "phoenix".to_string(),
            event: "heartbeat".to_string(),
            payload: serde_json::json!({}),
            reference: Some(self.take_ref()),
        }
    }

    fn take_ref(&mut self) -> String {
        let r = self.next_ref.to_string();
        self.next_ref += 1;
        r
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.released {
            // The TCP close on drop stops delivery; this only flags the
            // missing explicit release.
            tracing::warn!("Subscription {} dropped without release()", self.topic);
        }
    }
}
