//! Saved-search job alert models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved search with a last-checked watermark.
///
/// Filter fields are wildcards when absent or set to the literal `"all"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAlert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub alert_name: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub job_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub keywords: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub last_checked: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}
