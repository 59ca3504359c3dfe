//! Notification poller
//!
//! Computes a combined badge from two sources: unread messages newer than
//! a locally stored check marker, and open jobs matching the viewer's
//! active saved-search alerts, newer than each alert's own last_checked
//! watermark. Everything is recomputed from the backend on each check;
//! nothing here caches unread state across acknowledgments.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time;

use crate::api::{self, client::BoardClient};
use crate::config::Config;
use crate::models::{Job, JobAlert, Message, Viewer};

const MESSAGE_POLL_INTERVAL: Duration = Duration::from_secs(30);
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// One computed snapshot of the notification surface.
#[derive(Debug, Default)]
pub struct NotificationSummary {
    /// Unread messages newer than the local check marker.
    pub new_messages: Vec<Message>,
    /// Open jobs matching at least one active alert, deduplicated.
    pub new_jobs: Vec<Job>,
}

impl NotificationSummary {
    pub fn badge(&self) -> usize {
        self.new_messages.len() + self.new_jobs.len()
    }
}

/// Does `job` satisfy `alert`?
///
/// The job must be newer than this alert's own last_checked (not just the
/// shared fetch window), and each filled-in criterion must match exactly;
/// absent or `"all"` criteria are wildcards.
pub fn alert_matches(alert: &JobAlert, job: &Job) -> bool {
    let watermark = alert.last_checked.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    if job.created_at <= watermark {
        return false;
    }

    criterion_matches(alert.region.as_deref(), job.region.as_deref())
        && criterion_matches(alert.city.as_deref(), job.city.as_deref())
        && criterion_matches(alert.job_type.as_deref(), job.job_type.as_deref())
}

fn criterion_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None | Some("all") => true,
        Some(w) => actual == Some(w),
    }
}

/// Jobs from `candidates` matching any alert. A job counts once even when
/// several alerts match it.
pub fn match_new_jobs(alerts: &[JobAlert], candidates: &[Job]) -> Vec<Job> {
    candidates
        .iter()
        .filter(|job| alerts.iter().any(|alert| alert_matches(alert, job)))
        .cloned()
        .collect()
}

/// The oldest last_checked across the alerts, bounding a single fetch
/// window that covers all of them.
pub fn oldest_watermark(alerts: &[JobAlert]) -> DateTime<Utc> {
    alerts
        .iter()
        .map(|a| a.last_checked.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
        .min()
        .unwrap_or_else(Utc::now)
}

/// Unread messages created after the local check marker. Older unread
/// messages stay unread in the backend but no longer raise the badge.
pub fn filter_new_messages(unread: Vec<Message>, last_check: DateTime<Utc>) -> Vec<Message> {
    unread
        .into_iter()
        .filter(|m| m.created_at > last_check)
        .collect()
}

/// Compute the current notification snapshot for the viewer.
pub async fn check(client: &BoardClient, viewer: &Viewer) -> Result<NotificationSummary> {
    let unread = api::messages::fetch_unread(client, &viewer.email).await?;
    let last_check = Config::load()?.last_message_check();
    let new_messages = filter_new_messages(unread, last_check);

    let alerts = api::alerts::list_active(client, &viewer.user_id).await?;
    let new_jobs = if alerts.is_empty() {
        Vec::new()
    } else {
        let candidates = api::jobs::created_after(client, oldest_watermark(&alerts)).await?;
        match_new_jobs(&alerts, &candidates)
    };

    Ok(NotificationSummary {
        new_messages,
        new_jobs,
    })
}

/// Acknowledge the notification surface. The local message marker always
/// advances to now; last_checked on the viewer's active alerts is pushed
/// only when the jobs side actually raised the badge.
pub async fn acknowledge(client: &BoardClient, viewer: &Viewer, had_new_jobs: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.set_last_message_check(Utc::now());
    config.save()?;

    // Fire-and-forget on the alert side: a failure leaves the badge
    // raised until the next successful acknowledgment.
    if had_new_jobs {
        if let Err(e) = api::alerts::touch_all(client, &viewer.user_id).await {
            tracing::warn!("Failed to update alert watermarks: {:#}", e);
        }
    }

    Ok(())
}

/// One-shot: show the notification surface and acknowledge it, the
/// equivalent of opening the bell.
pub async fn show() -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;
    let summary = check(&client, &viewer).await?;

    print_summary(&summary);

    // Opening the surface acknowledges it even when it is empty.
    acknowledge(&client, &viewer, !summary.new_jobs.is_empty()).await?;

    Ok(())
}

/// Polling mode: recheck messages every 30s and job alerts every 60s,
/// both once at start, printing badge changes. Does not acknowledge.
pub async fn watch() -> Result<()> {
    let (client, viewer) = api::client_and_viewer().await?;

    let mut message_tick = time::interval(MESSAGE_POLL_INTERVAL);
    let mut job_tick = time::interval(JOB_POLL_INTERVAL);

    let mut summary = NotificationSummary::default();
    let mut last_badge: Option<usize> = None;
    let last_check = Config::load()?.last_message_check();

    println!("Watching notifications... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            _ = message_tick.tick() => {
                match api::messages::fetch_unread(&client, &viewer.email).await {
                    Ok(unread) => {
                        summary.new_messages = filter_new_messages(unread, last_check);
                    }
                    Err(e) => tracing::warn!("Unread message check failed: {:#}", e),
                }
            }
            _ = job_tick.tick() => {
                match check_jobs(&client, &viewer).await {
                    Ok(jobs) => summary.new_jobs = jobs,
                    Err(e) => tracing::warn!("Job alert check failed: {:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped.");
                return Ok(());
            }
        }

        let badge = summary.badge();
        if last_badge != Some(badge) {
            println!(
                "[{}] {} notification(s): {} message(s), {} job(s)",
                Utc::now().format("%H:%M:%S"),
                badge,
                summary.new_messages.len(),
                summary.new_jobs.len(),
            );
            last_badge = Some(badge);
        }
    }
}

async fn check_jobs(client: &BoardClient, viewer: &Viewer) -> Result<Vec<Job>> {
    let alerts = api::alerts::list_active(client, &viewer.user_id)
        .await
        .context("Failed to fetch alerts")?;
    if alerts.is_empty() {
        return Ok(Vec::new());
    }
    let candidates = api::jobs::created_after(client, oldest_watermark(&alerts)).await?;
    Ok(match_new_jobs(&alerts, &candidates))
}

fn print_summary(summary: &NotificationSummary) {
    if summary.badge() == 0 {
        println!("No new notifications.");
        return;
    }

    if !summary.new_messages.is_empty() {
        println!("\nMessages:");
        for msg in &summary.new_messages {
            let preview: String = msg.message.chars().take(60).collect();
            println!(
                "  [{}] {} (job {}): {}",
                msg.created_at.format("%m-%d %H:%M"),
                msg.sender_name.as_deref().unwrap_or(&msg.sender_email),
                msg.job_id,
                preview,
            );
        }
    }

    if !summary.new_jobs.is_empty() {
        println!("\nNew Jobs:");
        for job in &summary.new_jobs {
            println!(
                "  [{}] {} — {} (id {})",
                job.created_at.format("%m-%d %H:%M"),
                job.title,
                job.company.as_deref().unwrap_or("?"),
                job.id,
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn alert(region: Option<&str>, city: Option<&str>, job_type: Option<&str>, checked: u32) -> JobAlert {
        JobAlert {
            id: None,
            user_id: "u1".to_string(),
            alert_name: None,
            region: region.map(String::from),
            city: city.map(String::from),
            job_type: job_type.map(String::from),
            categories: Vec::new(),
            keywords: None,
            active: true,
            last_checked: Some(at(checked)),
        }
    }

    fn job(id: &str, region: &str, city: &str, job_type: &str, minute: u32) -> Job {
        Job {
            id: id.to_string(),
            title: format!("job {}", id),
            company: None,
            description: None,
            region: Some(region.to_string()),
            city: Some(city.to_string()),
            job_type: Some(job_type.to_string()),
            categories: Vec::new(),
            salary_min: None,
            salary_max: None,
            salary_period: None,
            status: crate::models::JobStatus::Open,
            created_at: at(minute),
            created_by: None,
        }
    }

    #[test]
    fn test_job_older_than_alert_watermark_never_matches() {
        let a = alert(Some("tashkent"), None, None, 10);
        // Matches every criterion but predates the watermark.
        let j = job("j1", "tashkent", "center", "full_time", 5);
        assert!(!alert_matches(&a, &j));

        let j = job("j2", "tashkent", "center", "full_time", 15);
        assert!(alert_matches(&a, &j));
    }

    #[test]
    fn test_wildcard_criteria_match_anything() {
        let a = alert(None, Some("all"), None, 0);
        let j = job("j1", "fergana", "kokand", "part_time", 5);
        assert!(alert_matches(&a, &j));
    }

    #[test]
    fn test_filled_criterion_must_match_exactly() {
        let a = alert(Some("tashkent"), None, Some("full_time"), 0);
        assert!(!alert_matches(&a, &job("j1", "fergana", "x", "full_time", 5)));
        assert!(!alert_matches(&a, &job("j2", "tashkent", "x", "part_time", 5)));
        assert!(alert_matches(&a, &job("j3", "tashkent", "x", "full_time", 5)));
    }

    #[test]
    fn test_job_counts_once_across_multiple_alerts() {
        let alerts = vec![
            alert(Some("tashkent"), None, None, 0),
            alert(None, None, Some("full_time"), 0),
        ];
        let candidates = vec![job("j1", "tashkent", "center", "full_time", 5)];

        let matched = match_new_jobs(&alerts, &candidates);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_fetch_window_bounded_by_oldest_watermark() {
        let alerts = vec![
            alert(None, None, None, 30),
            alert(None, None, None, 10),
            alert(None, None, None, 20),
        ];
        assert_eq!(oldest_watermark(&alerts), at(10));
    }

    #[test]
    fn test_unset_watermark_widens_window_to_epoch() {
        let mut a = alert(None, None, None, 30);
        a.last_checked = None;
        assert_eq!(oldest_watermark(&[a]), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_per_alert_watermark_still_applies_inside_shared_window() {
        // The shared window is bounded by the older alert, but the newer
        // alert must not claim jobs older than its own watermark.
        let narrow = alert(Some("tashkent"), None, None, 20);
        let wide = alert(Some("fergana"), None, None, 0);
        let alerts = vec![narrow, wide];

        let candidates = vec![
            job("j1", "tashkent", "x", "full_time", 10), // inside window, too old for its alert
            job("j2", "fergana", "x", "full_time", 10),
        ];

        let matched = match_new_jobs(&alerts, &candidates);
        let ids: Vec<&str> = matched.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["j2"]);
    }

    #[test]
    fn test_badge_counts_only_messages_after_local_marker() {
        let mk = |id: &str, minute: u32| Message {
            id: id.to_string(),
            job_id: "42".to_string(),
            sender_email: "bob@x".to_string(),
            sender_name: None,
            receiver_email: "alice@x".to_string(),
            message: "hi".to_string(),
            created_at: at(minute),
            read: false,
        };

        let unread = vec![mk("m1", 5), mk("m2", 15), mk("m3", 25)];
        let fresh = filter_new_messages(unread, at(10));
        let ids: Vec<&str> = fresh.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);

        // Opening the surface advances the marker past everything shown,
        // so stale unread messages never raise the badge again even
        // though they stay unread in the backend.
        let stale = vec![mk("m1", 5), mk("m2", 15)];
        assert!(filter_new_messages(stale, at(20)).is_empty());
    }
}
