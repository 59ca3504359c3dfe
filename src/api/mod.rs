//! API client module for the job board backend

pub mod alerts;
pub mod applications;
pub mod client;
pub mod jobs;
pub mod me;
pub mod messages;

use anyhow::Result;
use chrono::Utc;

use crate::models::{JobAlert, Viewer};
use client::BoardClient;

/// List open jobs matching the query (prints to stdout).
pub async fn list_jobs(query: &jobs::JobQuery) -> Result<()> {
    let client = BoardClient::new().await?;
    let found = jobs::list_open(&client, query).await?;

    println!("\nOpen Jobs:");
    println!("{:-<60}", "");

    if found.is_empty() {
        println!("  (no jobs found)");
        return Ok(());
    }

    for job in &found {
        println!("{}", job.title);
        println!("  ID: {}", job.id);
        if let Some(ref company) = job.company {
            println!("  Company: {}", company);
        }
        let place = match (job.region.as_deref(), job.city.as_deref()) {
            (Some(r), Some(c)) => format!("{}, {}", c, r),
            (Some(r), None) => r.to_string(),
            (None, Some(c)) => c.to_string(),
            (None, None) => String::new(),
        };
        if !place.is_empty() {
            println!("  Location: {}", place);
        }
        if let Some(ref jt) = job.job_type {
            println!("  Type: {}", jt);
        }
        if let (Some(min), Some(max)) = (job.salary_min, job.salary_max) {
            println!(
                "  Salary: {}-{} {}",
                min,
                max,
                job.salary_period.as_deref().unwrap_or("")
            );
        }
        println!("  Posted: {}", job.created_at.format("%Y-%m-%d %H:%M"));
        println!();
    }

    Ok(())
}

/// Show one job in full (prints to stdout).
pub async fn show_job(job_id: &str) -> Result<()> {
    let client = BoardClient::new().await?;
    let job = jobs::fetch(&client, job_id).await?;

    println!("\n{}", job.title);
    println!("{:-<60}", "");
    if let Some(ref company) = job.company {
        println!("Company:  {}", company);
    }
    if let Some(ref region) = job.region {
        println!("Region:   {}", region);
    }
    if let Some(ref city) = job.city {
        println!("City:     {}", city);
    }
    if let Some(ref jt) = job.job_type {
        println!("Type:     {}", jt);
    }
    if !job.categories.is_empty() {
        println!("Category: {}", job.categories.join(", "));
    }
    println!("Status:   {:?}", job.status);
    println!("Posted:   {}", job.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(ref desc) = job.description {
        println!("\n{}", desc);
    }

    Ok(())
}

/// Post a new job (prints confirmation).
pub async fn post_job(body: serde_json::Value) -> Result<()> {
    let client = BoardClient::new().await?;
    jobs::insert(&client, &body).await?;
    println!("Job posted.");
    Ok(())
}

/// Close a job posting.
pub async fn close_job(job_id: &str) -> Result<()> {
    let client = BoardClient::new().await?;
    jobs::set_status(&client, job_id, crate::models::JobStatus::Closed).await?;
    println!("Job {} closed.", job_id);
    Ok(())
}

/// Apply to a job as the current user.
pub async fn apply_to_job(job_id: &str, cover_note: Option<String>) -> Result<()> {
    let client = BoardClient::new().await?;
    let viewer = client.viewer()?;
    applications::apply(&client, &viewer, job_id, cover_note).await?;
    println!("Application sent.");
    Ok(())
}

/// List applicants for a job the current user posted.
pub async fn list_applicants(job_id: &str) -> Result<()> {
    let client = BoardClient::new().await?;
    let apps = applications::list_for_job(&client, job_id).await?;

    println!("\nApplicants:");
    println!("{:-<60}", "");

    if apps.is_empty() {
        println!("  (no applications yet)");
        return Ok(());
    }

    for app in &apps {
        println!(
            "{} <{}>",
            app.applicant_name.as_deref().unwrap_or("?"),
            app.applicant_email
        );
        if let Some(ref note) = app.cover_note {
            println!("  {}", note);
        }
        if let Some(at) = app.created_at {
            println!("  Applied: {}", at.format("%Y-%m-%d %H:%M"));
        }
        println!();
    }

    Ok(())
}

/// List the current user's saved-search alerts.
pub async fn list_alerts() -> Result<()> {
    let client = BoardClient::new().await?;
    let viewer = client.viewer()?;
    let found = alerts::list_all(&client, &viewer.user_id).await?;

    println!("\nJob Alerts:");
    println!("{:-<60}", "");

    if found.is_empty() {
        println!("  (no alerts)");
        return Ok(());
    }

    for alert in &found {
        let name = alert.alert_name.as_deref().unwrap_or("(unnamed)");
        let state = if alert.active { "active" } else { "inactive" };
        println!("{} [{}]", name, state);
        if let Some(ref id) = alert.id {
            println!("  ID: {}", id);
        }
        println!(
            "  Filters: region={} city={} type={}",
            alert.region.as_deref().unwrap_or("all"),
            alert.city.as_deref().unwrap_or("all"),
            alert.job_type.as_deref().unwrap_or("all"),
        );
        if let Some(checked) = alert.last_checked {
            println!("  Last checked: {}", checked.format("%Y-%m-%d %H:%M"));
        }
        println!();
    }

    Ok(())
}

/// Save the given search criteria as an alert for the current user.
pub async fn save_alert(
    name: String,
    region: Option<String>,
    city: Option<String>,
    job_type: Option<String>,
    category: Option<String>,
    keywords: Option<String>,
) -> Result<()> {
    let client = BoardClient::new().await?;
    let viewer = client.viewer()?;

    let alert = JobAlert {
        id: None,
        user_id: viewer.user_id.clone(),
        alert_name: Some(name),
        region: none_if_all(region),
        city: none_if_all(city),
        job_type: none_if_all(job_type),
        categories: category.into_iter().collect(),
        keywords,
        active: true,
        last_checked: Some(Utc::now()),
    };

    alerts::create(&client, &alert).await?;
    println!("Job alert created.");
    Ok(())
}

/// Deactivate an alert by id.
pub async fn remove_alert(alert_id: &str) -> Result<()> {
    let client = BoardClient::new().await?;
    alerts::deactivate(&client, alert_id).await?;
    println!("Alert {} deactivated.", alert_id);
    Ok(())
}

/// Show current user info
pub async fn whoami() -> Result<()> {
    me::whoami().await
}

/// Resolve the viewer for modules that need an explicit identity.
pub async fn client_and_viewer() -> Result<(BoardClient, Viewer)> {
    let client = BoardClient::new().await?;
    let viewer = client.viewer()?;
    Ok((client, viewer))
}

fn none_if_all(value: Option<String>) -> Option<String> {
    value.filter(|v| v != "all")
}
