//! Current user endpoint (/auth/v1/user)

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::BoardClient;
use crate::models::User;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    user_metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    full_name: Option<String>,
}

/// Fetch the current user from the auth endpoint.
pub async fn whoami_data(client: &BoardClient) -> Result<User> {
    let resp = client.auth_get("/auth/v1/user").await?;
    let user: UserResponse = resp.json().await.context("Failed to parse user response")?;

    Ok(User {
        id: user.id,
        email: user.email.unwrap_or_default(),
        full_name: user.user_metadata.and_then(|m| m.full_name),
    })
}

/// Fetch and display current user info.
pub async fn whoami() -> Result<()> {
    let client = BoardClient::new().await?;
    let user = whoami_data(&client).await?;

    println!();
    println!("Name:  {}", user.full_name.as_deref().unwrap_or("(none)"));
    println!("Email: {}", user.email);
    println!("ID:    {}", user.id);

    Ok(())
}
