//! Job posting queries and commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::client::{enc, BoardClient};
use crate::models::{Job, JobStatus};

/// Server-side filters for listing open jobs. Keyword search is applied
/// client-side over title/company/description.
#[derive(Debug, Default, Clone)]
pub struct JobQuery {
    pub region: Option<String>,
    pub city: Option<String>,
    pub job_type: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
}

/// List open jobs matching the query, newest first.
pub async fn list_open(client: &BoardClient, query: &JobQuery) -> Result<Vec<Job>> {
    let mut q = String::from("jobs?select=*&status=eq.open&order=created_at.desc");

    if let Some(ref region) = query.region {
        q.push_str(&format!("&region=eq.{}", enc(region)));
    }
    if let Some(ref city) = query.city {
        q.push_str(&format!("&city=eq.{}", enc(city)));
    }
    if let Some(ref job_type) = query.job_type {
        q.push_str(&format!("&job_type=eq.{}", enc(job_type)));
    }
    if let Some(ref category) = query.category {
        // Array containment: categories @> {category}
        q.push_str(&format!("&categories=cs.{{{}}}", enc(category)));
    }
    if query.limit > 0 {
        q.push_str(&format!("&limit={}", query.limit));
    }

    let resp = client.rest_get(&q).await?;
    let mut jobs: Vec<Job> = resp.json().await.context("Failed to parse jobs")?;

    if let Some(ref needle) = query.search {
        let needle = needle.to_lowercase();
        jobs.retain(|job| {
            job.title.to_lowercase().contains(&needle)
                || job
                    .company
                    .as_deref()
                    .map_or(false, |c| c.to_lowercase().contains(&needle))
                || job
                    .description
                    .as_deref()
                    .map_or(false, |d| d.to_lowercase().contains(&needle))
        });
    }

    Ok(jobs)
}

/// Fetch one job by id.
pub async fn fetch(client: &BoardClient, job_id: &str) -> Result<Job> {
    let query = format!("jobs?select=*&id=eq.{}", enc(job_id));
    let resp = client.rest_get(&query).await?;
    let jobs: Vec<Job> = resp.json().await.context("Failed to parse job")?;
    jobs.into_iter()
        .next()
        .with_context(|| format!("Job {} not found", job_id))
}

/// Open jobs created strictly after `bound`, newest first. The poller's
/// candidate window for alert matching.
pub async fn created_after(client: &BoardClient, bound: DateTime<Utc>) -> Result<Vec<Job>> {
    let query = format!(
        "jobs?select=*&status=eq.open&created_at=gt.{}&order=created_at.desc",
        enc(&bound.to_rfc3339()),
    );

    let resp = client.rest_get(&query).await?;
    resp.json().await.context("Failed to parse new jobs")
}

/// Insert a new posting. The id and created_at are assigned server-side.
pub async fn insert(client: &BoardClient, body: &serde_json::Value) -> Result<()> {
    client.rest_post("jobs", body).await?;
    Ok(())
}

/// Set a job's status (close / reopen / mark filled).
pub async fn set_status(client: &BoardClient, job_id: &str, status: JobStatus) -> Result<()> {
    let query = format!("jobs?id=eq.{}", enc(job_id));
    let status = serde_json::to_value(status).context("Failed to serialize status")?;
    client
        .rest_patch(&query, &serde_json::json!({ "status": status }))
        .await?;
    Ok(())
}
