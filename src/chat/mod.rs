//! Chat: conversation aggregation, live messaging, CLI commands

pub mod conversations;
pub mod live;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::api;
use crate::models::{Message, Viewer};

/// List the viewer's conversations with unread counts (prints to stdout).
pub async fn list_chats() -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;
    let messages = api::messages::fetch_involving(&client, &viewer.email).await?;
    let convs = conversations::aggregate(&viewer.email, messages);

    println!("\nConversations:");
    println!("{:-<60}", "");

    if convs.is_empty() {
        println!("  (no messages yet)");
        return Ok(());
    }

    for conv in &convs {
        let name = conv
            .counterpart_name
            .as_deref()
            .unwrap_or(&conv.key.counterpart_email);
        if conv.unread > 0 {
            println!("{} ({} unread)", name, conv.unread);
        } else {
            println!("{}", name);
        }
        println!("  Job: {}", conv.key.job_id);
        println!("  With: {}", conv.key.counterpart_email);
        if let Some(last) = conv.last_message() {
            let preview: String = last.message.chars().take(60).collect();
            println!("  [{}]: {}", last.created_at.format("%m-%d %H:%M"), preview);
        }
        println!();
    }

    Ok(())
}

/// Print the history of one conversation and mark it read.
pub async fn read_conversation(job_id: &str, with: &str) -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;
    let history = api::messages::fetch_history(&client, job_id, &viewer.email, with).await?;

    if history.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &history {
        print_message(msg, &viewer);
    }

    // Reading the conversation marks it read. Fire-and-forget: a failure
    // here leaves the flags stale until the next read.
    if let Err(e) = api::messages::mark_conversation_read(&client, job_id, &viewer.email, with).await
    {
        tracing::warn!("Failed to mark conversation read: {:#}", e);
    }

    Ok(())
}

/// One-shot send to a counterpart about a job.
pub async fn send_message(job_id: &str, to: &str, text: &str) -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;
    let message = new_outgoing(&viewer, job_id, to, text);
    api::messages::insert(&client, &message)
        .await
        .context("Failed to send message")?;
    println!("Message sent.");
    Ok(())
}

/// Build an outgoing message with a client-generated id.
///
/// Generating the id here (not server-side) is what lets the live channel
/// recognize the server echo of our own insert.
pub fn new_outgoing(viewer: &Viewer, job_id: &str, to: &str, text: &str) -> Message {
    Message {
        id: Uuid::new_v4().to_string(),
        job_id: job_id.to_string(),
        sender_email: viewer.email.clone(),
        sender_name: Some(viewer.sender_name()),
        receiver_email: to.to_string(),
        message: text.trim().to_string(),
        created_at: Utc::now(),
        read: false,
    }
}

pub(crate) fn print_message(msg: &Message, viewer: &Viewer) {
    let who = if msg.sender_email == viewer.email {
        "me"
    } else {
        msg.sender_name.as_deref().unwrap_or(&msg.sender_email)
    };
    println!(
        "[{}] {}: {}",
        msg.created_at.format("%m-%d %H:%M"),
        who,
        msg.message
    );
}
