//! Job posting models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job posting status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
    Filled,
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Open
    }
}

/// Job posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub job_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_period: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}
