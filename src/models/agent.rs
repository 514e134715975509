use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent profile linked 1:1 to a backend identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub license_number: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_sales: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// Agent columns embedded alongside a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub rating: f64,
}

impl AgentSummary {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "full_name", "email", "phone", "avatar_url", "rating"];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}
