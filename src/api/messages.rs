//! Message queries and commands
//!
//! The backend has no compound direction filter for a conversation, so
//! history is fetched with an `or=(and(...),and(...))` expression covering
//! both directions; the live channel re-checks direction client-side.

use anyhow::{Context, Result};

use super::client::{enc, BoardClient};
use crate::models::Message;

/// Full history for one (job, a, b) conversation, both directions,
/// oldest first.
pub async fn fetch_history(
    client: &BoardClient,
    job_id: &str,
    a_email: &str,
    b_email: &str,
) -> Result<Vec<Message>> {
    let a = enc(a_email);
    let b = enc(b_email);
    let query = format!(
        "messages?select=*&job_id=eq.{}&or=(and(sender_email.eq.{},receiver_email.eq.{}),and(sender_email.eq.{},receiver_email.eq.{}))&order=created_at.asc",
        enc(job_id),
        a, b, b, a,
    );

    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse message history")
}

/// Every message the viewer sent or received, newest first. Input to the
/// conversation aggregator.
pub async fn fetch_involving(client: &BoardClient, email: &str) -> Result<Vec<Message>> {
    let e = enc(email);
    let query = format!(
        "messages?select=*&or=(sender_email.eq.{},receiver_email.eq.{})&order=created_at.desc",
        e, e,
    );

    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse messages")
}

/// Unread messages addressed to the viewer, newest first.
pub async fn fetch_unread(client: &BoardClient, email: &str) -> Result<Vec<Message>> {
    let query = format!(
        "messages?select=*&receiver_email=eq.{}&read=eq.false&order=created_at.desc",
        enc(email),
    );

    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse unread messages")
}

/// Insert a message with its client-generated id.
pub async fn insert(client: &BoardClient, message: &Message) -> Result<()> {
    let body = serde_json::to_value(message).context("Failed to serialize message")?;
    client.rest_post("messages", &body).await?;
    Ok(())
}

/// Mark every unread message from `counterpart_email` to `viewer_email`
/// in one conversation as read.
pub async fn mark_conversation_read(
    client: &BoardClient,
    job_id: &str,
    viewer_email: &str,
    counterpart_email: &str,
) -> Result<()> {
    let query = format!(
        "messages?job_id=eq.{}&sender_email=eq.{}&receiver_email=eq.{}&read=eq.false",
        enc(job_id),
        enc(counterpart_email),
        enc(viewer_email),
    );

    client
        .rest_patch(&query, &serde_json::json!({ "read": true }))
        .await?;
    Ok(())
}
