use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// All seats one user purchased for one event, accumulated across purchases.
/// There is at most one row per (user, event) pair; repeat purchases append
/// seats and add to `amount` instead of creating a new row.
///
/// The event title/date/location are a snapshot taken at commit time and
/// refreshed on each subsequent commit, so ticket rendering never needs a
/// join. `ticket_code` is nullable only because rows created before codes
/// existed lack one; it is backfilled on the next commit and never changed
/// afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub seat_ids: Vec<String>,
    pub amount: f64,
    pub ticket_code: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<String>,
    pub event_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
