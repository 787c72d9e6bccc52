use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    /// Currently only "new_post".
    #[serde(rename = "type")]
    pub kind: String,
    pub event_id: i64,
    pub event_title: String,
    pub post_id: Option<i64>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
