//! Realtime push channel client
//!
//! Connects to the backend's websocket endpoint to receive change events
//! for a table. The server can only scope a subscription by a single
//! column filter (e.g. `job_id=eq.42`); finer relevance checks are the
//! caller's job.

pub mod socket;
pub mod subscription;

pub use subscription::Subscription;

use thiserror::Error;

/// Failures of the push channel. Callers branch on these: a closed
/// channel ends a live session, a rejected join is a setup error.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("websocket closed by server")]
    Closed,

    #[error("channel join rejected: {0}")]
    JoinRejected(String),

    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("realtime protocol violation: {0}")]
    Protocol(String),
}
