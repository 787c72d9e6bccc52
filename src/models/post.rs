use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub content: String,
    /// User ids that hearted the post.
    pub hearts: Vec<i64>,
    pub comments: Json<Vec<Comment>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: i64,
    pub user_name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
