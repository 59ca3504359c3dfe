//! Authenticated HTTP client for the job board backend
//!
//! Wraps reqwest::Client with apikey/bearer injection and automatic token
//! refresh. The REST surface is PostgREST-style: tables under /rest/v1 with
//! filter expressions in the query string.

use anyhow::{bail, Context, Result};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::Viewer;

/// Authenticated client for the board's REST and auth endpoints.
pub struct BoardClient {
    http: reqwest::Client,
    config: Config,
}

impl BoardClient {
    /// Load config and build client. Attempts token refresh if the access
    /// token is expired.
    pub async fn new() -> Result<Self> {
        let mut config = Config::load()?;

        let needs_refresh = config.get_access_token().map_or(true, |t| t.is_expired());
        if needs_refresh {
            if config.get_refresh_token().is_some() {
                tracing::info!("Token missing or expired, refreshing...");
                match crate::auth::session::refresh().await {
                    Ok(true) => {
                        config = Config::load()?;
                        tracing::info!("Token refreshed");
                    }
                    Ok(false) => {
                        bail!("No refresh token available. Run 'trades-cli login'.");
                    }
                    Err(e) => {
                        bail!("Token refresh failed: {:#}. Run 'trades-cli login'.", e);
                    }
                }
            } else {
                bail!("Token expired and no refresh token. Run 'trades-cli login'.");
            }
        }

        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    /// The identity this session acts as, from the cached login.
    pub fn viewer(&self) -> Result<Viewer> {
        let user_id = self
            .config
            .user_id
            .clone()
            .context("No user id cached. Run 'trades-cli login'.")?;
        let email = self
            .config
            .user_email
            .clone()
            .context("No user email cached. Run 'trades-cli login'.")?;
        Ok(Viewer {
            user_id,
            email,
            display_name: self.config.user_name.clone(),
        })
    }

    fn base_url(&self) -> Result<String> {
        self.config
            .backend_url()
            .context("No backend URL configured. Run 'trades-cli login'.")
    }

    fn api_key(&self) -> Result<String> {
        self.config
            .api_key
            .clone()
            .context("No API key configured. Run 'trades-cli login'.")
    }

    fn access_token(&self) -> Result<String> {
        let token = self
            .config
            .get_access_token()
            .context("No access token. Run 'trades-cli login' first.")?;
        if token.is_expired() {
            bail!("Access token expired. Run 'trades-cli login'.");
        }
        Ok(token.token)
    }

    /// GET a REST table. `path_and_query` is e.g.
    /// `messages?select=*&job_id=eq.42&order=created_at.asc`.
    pub async fn rest_get(&self, path_and_query: &str) -> Result<reqwest::Response> {
        let url = format!("{}/rest/v1/{}", self.base_url()?, path_and_query);
        tracing::debug!("REST GET {}", url);

        let resp = self
            .http
            .get(&url)
            .header("apikey", self.api_key()?)
            .bearer_auth(self.access_token()?)
            .send()
            .await
            .with_context(|| format!("REST GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST (insert) one row into a REST table.
    pub async fn rest_post(&self, table: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/rest/v1/{}", self.base_url()?, table);
        tracing::debug!("REST POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("apikey", self.api_key()?)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.access_token()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("REST POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// PATCH (update) rows selected by the query part of `path_and_query`.
    pub async fn rest_patch(
        &self,
        path_and_query: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/rest/v1/{}", self.base_url()?, path_and_query);
        tracing::debug!("REST PATCH {}", url);

        let resp = self
            .http
            .patch(&url)
            .header("apikey", self.api_key()?)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.access_token()?)
            .json(body)
            .send()
            .await
            .with_context(|| format!("REST PATCH {} failed", url))?;

        check_response(resp, &url).await
    }

    /// GET against the auth endpoint (e.g. `/auth/v1/user`).
    pub async fn auth_get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url()?, path);
        tracing::debug!("Auth GET {}", url);

        let resp = self
            .http
            .get(&url)
            .header("apikey", self.api_key()?)
            .bearer_auth(self.access_token()?)
            .send()
            .await
            .with_context(|| format!("Auth GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// Websocket URL for the realtime push endpoint, apikey in the query.
    pub fn realtime_url(&self) -> Result<String> {
        let base = self.base_url()?;
        let ws_base = base
            .replace("https://", "wss://")
            .replace("http://", "ws://");
        Ok(format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base,
            enc(&self.api_key()?)
        ))
    }
}

/// Percent-encode a value for use inside a REST filter expression.
pub fn enc(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'trades-cli login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
