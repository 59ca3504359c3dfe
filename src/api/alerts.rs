//! Saved-search alert queries and commands

use anyhow::{Context, Result};
use chrono::Utc;

use super::client::{enc, BoardClient};
use crate::models::JobAlert;

/// Active alerts for one user.
pub async fn list_active(client: &BoardClient, user_id: &str) -> Result<Vec<JobAlert>> {
    let query = format!(
        "job_alerts?select=*&user_id=eq.{}&active=eq.true",
        enc(user_id),
    );
    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse job alerts")
}

/// All alerts for one user, including inactive.
pub async fn list_all(client: &BoardClient, user_id: &str) -> Result<Vec<JobAlert>> {
    let query = format!("job_alerts?select=*&user_id=eq.{}", enc(user_id));
    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse job alerts")
}

/// Create an alert from saved search criteria.
pub async fn create(client: &BoardClient, alert: &JobAlert) -> Result<()> {
    let body = serde_json::to_value(alert).context("Failed to serialize alert")?;
    client.rest_post("job_alerts", &body).await?;
    Ok(())
}

/// Advance last_checked to now on all of the user's active alerts.
/// Invalidates the "new jobs" result: the badge clears even though the
/// jobs remain in the system.
pub async fn touch_all(client: &BoardClient, user_id: &str) -> Result<()> {
    let query = format!("job_alerts?user_id=eq.{}&active=eq.true", enc(user_id));
    client
        .rest_patch(
            &query,
            &serde_json::json!({ "last_checked": Utc::now().to_rfc3339() }),
        )
        .await?;
    Ok(())
}

/// Deactivate one alert.
pub async fn deactivate(client: &BoardClient, alert_id: &str) -> Result<()> {
    let query = format!("job_alerts?id=eq.{}", enc(alert_id));
    client
        .rest_patch(&query, &serde_json::json!({ "active": false }))
        .await?;
    Ok(())
}
