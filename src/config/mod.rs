//! Configuration and credential storage

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::auth::{StoredToken, TokenStore};

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hosted backend (REST, auth, and realtime share it)
    pub backend_url: Option<String>,
    /// Publishable API key sent as the `apikey` header on every request
    pub api_key: Option<String>,
    /// Stored access token from the auth endpoint
    pub access_token: Option<StoredToken>,
    /// Stored refresh token
    pub refresh_token: Option<String>,
    /// Authenticated user's id (from last login)
    pub user_id: Option<String>,
    /// Authenticated user's email
    pub user_email: Option<String>,
    /// Authenticated user's display name
    pub user_name: Option<String>,
    /// Local watermark for the notification badge: messages created after
    /// this are "new". Per machine, never synced to the backend.
    pub last_message_check: Option<DateTime<Utc>>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "trades-cli", "trades-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains tokens)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Backend base URL, trailing slash stripped.
    pub fn backend_url(&self) -> Option<String> {
        self.backend_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
    }

    pub fn last_message_check(&self) -> DateTime<Utc> {
        self.last_message_check
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn set_last_message_check(&mut self, when: DateTime<Utc>) {
        self.last_message_check = Some(when);
    }
}

impl TokenStore for Config {
    fn get_access_token(&self) -> Option<StoredToken> {
        self.access_token.clone()
    }

    fn set_access_token(&mut self, token: String, expires_in: Option<u64>) {
        self.access_token = Some(StoredToken::new(token, expires_in));
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
    }

    fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.user_id = None;
        self.user_email = None;
        self.user_name = None;
    }
}
