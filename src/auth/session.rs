//! Password and refresh-token grants against the backend auth endpoint

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::TokenStore;
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
}

/// Refresh the access token using the stored refresh token.
///
/// Returns Ok(true) if refresh succeeded, Ok(false) if no refresh token
/// is stored.
pub async fn refresh() -> Result<bool> {
    let mut config = Config::load()?;
    let refresh_token = match config.get_refresh_token() {
        Some(rt) => rt,
        None => return Ok(false),
    };
    let (base, api_key) = backend_settings(&config)?;

    tracing::info!("Refreshing access token...");

    let http = reqwest::Client::new();
    let resp = http
        .post(format!("{}/auth/v1/token?grant_type=refresh_token", base))
        .header("apikey", &api_key)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .context("Token refresh request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Token refresh failed: {} — {}", status, body);
    }

    let tokens: TokenResponse = resp
        .json()
        .await
        .context("Failed to parse token refresh response")?;

    store_session(&mut config, tokens)?;
    Ok(true)
}

/// Authenticate with email and password and cache the session.
///
/// `backend_url` and `api_key` are persisted on first login and reused
/// afterwards. If a valid token is already cached, does nothing unless
/// `force` is set.
pub async fn login(
    email: &str,
    password: Option<String>,
    backend_url: Option<String>,
    api_key: Option<String>,
    force: bool,
) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(url) = backend_url {
        config.backend_url = Some(url);
    }
    if let Some(key) = api_key {
        config.api_key = Some(key);
    }

    if !force {
        if let Some(token) = config.get_access_token() {
            if !token.is_expired() {
                println!("Already logged in (token valid). Use --force to re-authenticate.");
                config.save()?;
                return Ok(());
            }
            // Try refresh before falling through to the password grant
            if config.get_refresh_token().is_some() {
                config.save()?;
                tracing::info!("Token expired, attempting refresh...");
                match refresh().await {
                    Ok(true) => {
                        println!("Token refreshed successfully.");
                        return Ok(());
                    }
                    Ok(false) => config = Config::load()?,
                    Err(e) => {
                        tracing::warn!("Refresh failed, falling back to password grant: {:#}", e);
                        config = Config::load()?;
                    }
                }
            }
        }
    }

    let (base, key) = backend_settings(&config)?;

    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };

    tracing::info!("Authenticating {} against {}", email, base);

    let http = reqwest::Client::new();
    let resp = http
        .post(format!("{}/auth/v1/token?grant_type=password", base))
        .header("apikey", &key)
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .context("Login request failed")?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("Login failed: {} — {}", status, body);
    }

    let tokens: TokenResponse = resp
        .json()
        .await
        .context("Failed to parse login response")?;

    store_session(&mut config, tokens)?;
    println!("Logged in as {}.", email);
    Ok(())
}

/// Clear stored credentials
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_tokens();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display current auth status
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    match config.backend_url() {
        Some(url) => println!("Backend:     {}", url),
        None => println!("Backend:     not configured"),
    }

    match config.get_access_token() {
        Some(token) if !token.is_expired() => {
            println!("Token:       valid");
            if let Some(exp) = token.expires_at {
                println!("  expires_at: {}", exp);
            }
        }
        Some(_) => println!("Token:       expired"),
        None => println!("Token:       none"),
    }

    match config.get_refresh_token() {
        Some(_) => println!("Refresh tok: present"),
        None => println!("Refresh tok: none"),
    }

    match config.user_email.as_deref() {
        Some(email) => println!("User:        {}", email),
        None => println!("User:        unknown"),
    }

    Ok(())
}

/// Persist tokens and the viewer identity from a token response.
fn store_session(config: &mut Config, tokens: TokenResponse) -> Result<()> {
    config.set_access_token(tokens.access_token, tokens.expires_in);
    if let Some(rt) = tokens.refresh_token {
        config.set_refresh_token(rt);
    }
    if let Some(user) = tokens.user {
        config.user_id = Some(user.id);
        if let Some(email) = user.email {
            config.user_email = Some(email);
        }
        if let Some(name) = user.user_metadata.and_then(|m| m.full_name) {
            config.user_name = Some(name);
        }
    }
    config.save()
}

fn backend_settings(config: &Config) -> Result<(String, String)> {
    let base = config
        .backend_url()
        .context("No backend URL configured. Pass --url on first login.")?;
    let key = config
        .api_key
        .clone()
        .context("No API key configured. Pass --key on first login.")?;
    Ok((base, key))
}

/// Read a password from stdin (used when --password is not given).
fn prompt_password() -> Result<String> {
    use std::io::{BufRead, Write};

    print!("Password: ");
    std::io::stdout().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Empty password");
    }
    Ok(password)
}
