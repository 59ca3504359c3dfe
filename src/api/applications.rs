//! Job application queries and commands

use anyhow::{Context, Result};

use super::client::{enc, BoardClient};
use crate::models::{Application, Viewer};

/// File an application for a job on behalf of the viewer.
pub async fn apply(
    client: &BoardClient,
    viewer: &Viewer,
    job_id: &str,
    cover_note: Option<String>,
) -> Result<()> {
    let application = Application {
        id: None,
        job_id: job_id.to_string(),
        applicant_email: viewer.email.clone(),
        applicant_name: Some(viewer.sender_name()),
        cover_note,
        created_at: None,
    };

    let body = serde_json::to_value(&application).context("Failed to serialize application")?;
    client.rest_post("applications", &body).await?;
    Ok(())
}

/// Applicants for one job, newest first. Feeds the employer-side choice
/// of chat counterpart.
pub async fn list_for_job(client: &BoardClient, job_id: &str) -> Result<Vec<Application>> {
    let query = format!(
        "applications?select=*&job_id=eq.{}&order=created_at.desc",
        enc(job_id),
    );
    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse applications")
}
