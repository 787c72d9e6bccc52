//! store
//!
//! The persistence gateway: typed CRUD over the five aggregates (User, Event,
//! Booking, Post, Notification log) behind one injectable trait.
//!
//! `PgStore` is the production implementation (sqlx/Postgres). `MemoryStore`
//! implements the identical contract, version checks included, and backs the
//! service and router tests.

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;

use crate::models::{Booking, Event, Notification, Post, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The stored document changed since it was read. The caller must re-read
    /// and re-validate before saving again.
    #[error("stored version changed since read")]
    VersionConflict,

    /// A unique constraint was violated.
    #[error("duplicate key")]
    Duplicate,

    /// The store is unreachable or failed mid-operation. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            // 23505 = unique_violation
            if db.code().as_deref() == Some("23505") {
                return StoreError::Duplicate;
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
}

pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub price: f64,
    pub total_seats: i32,
    pub rows: i32,
    pub cols: i32,
    pub category: String,
    pub image: String,
    pub producer_id: Option<i64>,
    pub embedding: Option<Vec<f32>>,
}

pub struct NewBooking {
    pub user_id: i64,
    pub event_id: i64,
    pub seat_ids: Vec<String>,
    pub amount: f64,
    pub ticket_code: String,
    pub event_title: String,
    pub event_date: String,
    pub event_location: String,
}

pub struct NewPost {
    pub event_id: i64,
    pub user_id: i64,
    pub content: String,
}

pub struct NewNotification {
    pub user_id: i64,
    pub kind: String,
    pub event_id: i64,
    pub event_title: String,
    pub post_id: Option<i64>,
    pub message: String,
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: i64,
    pub events: i64,
    pub bookings: i64,
    pub seats_sold: i64,
    pub total_revenue: f64,
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // --- events ---
    async fn list_events(&self, search: Option<&str>) -> StoreResult<Vec<Event>>;
    async fn list_events_by_producer(&self, producer_id: i64) -> StoreResult<Vec<Event>>;
    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>>;
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
    /// Full-row update guarded by the version read into `event`. Fails with
    /// `VersionConflict` when another writer got there first.
    async fn save_event(&self, event: &Event) -> StoreResult<()>;

    // --- bookings ---
    async fn find_booking(&self, user_id: i64, event_id: i64) -> StoreResult<Option<Booking>>;
    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>>;
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking>;
    async fn save_booking(&self, booking: &Booking) -> StoreResult<()>;
    async fn list_bookings_by_user(&self, user_id: i64) -> StoreResult<Vec<Booking>>;
    async fn list_bookings_by_event(&self, event_id: i64) -> StoreResult<Vec<Booking>>;

    // --- posts ---
    async fn list_posts(&self, event_id: i64) -> StoreResult<Vec<Post>>;
    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn create_post(&self, post: NewPost) -> StoreResult<Post>;
    async fn save_post(&self, post: &Post) -> StoreResult<()>;

    // --- notifications ---
    async fn insert_notifications(&self, notifications: &[NewNotification]) -> StoreResult<()>;
    async fn list_notifications(&self, user_id: i64) -> StoreResult<Vec<Notification>>;
    /// Returns false when the notification does not exist.
    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool>;

    // --- admin ---
    async fn admin_stats(&self) -> StoreResult<AdminStats>;
}
