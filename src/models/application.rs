//! Job application models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An application a job seeker filed against a posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub job_id: String,
    pub applicant_email: String,
    pub applicant_name: Option<String>,
    pub cover_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
