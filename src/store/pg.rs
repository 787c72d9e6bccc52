use async_trait::async_trait;
use sqlx::types::Json;

use crate::database::Database;
use crate::models::{Booking, Event, Notification, Post, User};

use super::{
    AdminStats, NewBooking, NewEvent, NewNotification, NewPost, NewUser, Store, StoreError,
    StoreResult,
};

/// Postgres-backed persistence gateway.
///
/// Queries use the runtime API throughout so the crate builds without a live
/// database. Event writes go through a version column; see `save_event`.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.role)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn list_events(&self, search: Option<&str>) -> StoreResult<Vec<Event>> {
        let events = match search {
            Some(needle) => {
                sqlx::query_as::<_, Event>(
                    "SELECT * FROM events
                     WHERE title ILIKE $1 OR category ILIKE $1
                     ORDER BY created_at DESC",
                )
                .bind(format!("%{}%", needle))
                .fetch_all(&self.db.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY created_at DESC")
                    .fetch_all(&self.db.pool)
                    .await?
            }
        };
        Ok(events)
    }

    async fn list_events_by_producer(&self, producer_id: i64) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE producer_id = $1 ORDER BY created_at DESC",
        )
        .bind(producer_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(events)
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(event)
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let created = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events
                (title, description, date, time, location, price, total_seats,
                 rows, cols, category, image, producer_id, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(event.price)
        .bind(event.total_seats)
        .bind(event.rows)
        .bind(event.cols)
        .bind(&event.category)
        .bind(&event.image)
        .bind(event.producer_id)
        .bind(event.embedding.map(Json))
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        // Compare-and-set on the version read by the caller. rows_affected 0
        // means another writer committed since that read.
        let result = sqlx::query(
            r#"
            UPDATE events SET
                title = $2, description = $3, date = $4, time = $5,
                location = $6, price = $7, total_seats = $8, rows = $9,
                cols = $10, category = $11, image = $12, producer_id = $13,
                interested_users = $14, booked_seats = $15, reviews = $16,
                embedding = $17, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $18
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(event.price)
        .bind(event.total_seats)
        .bind(event.rows)
        .bind(event.cols)
        .bind(&event.category)
        .bind(&event.image)
        .bind(event.producer_id)
        .bind(&event.interested_users)
        .bind(&event.booked_seats)
        .bind(&event.reviews)
        .bind(event.embedding.clone())
        .bind(event.version)
        .execute(&self.db.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict);
        }
        Ok(())
    }

    async fn find_booking(&self, user_id: i64, event_id: i64) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(booking)
    }

    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(booking)
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
                (user_id, event_id, seat_ids, amount, ticket_code,
                 event_title, event_date, event_location)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(&booking.seat_ids)
        .bind(booking.amount)
        .bind(&booking.ticket_code)
        .bind(&booking.event_title)
        .bind(&booking.event_date)
        .bind(&booking.event_location)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings SET
                seat_ids = $2, amount = $3, ticket_code = $4,
                event_title = $5, event_date = $6, event_location = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(&booking.seat_ids)
        .bind(booking.amount)
        .bind(&booking.ticket_code)
        .bind(&booking.event_title)
        .bind(&booking.event_date)
        .bind(&booking.event_location)
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    async fn list_bookings_by_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(bookings)
    }

    async fn list_bookings_by_event(&self, event_id: i64) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(bookings)
    }

    async fn list_posts(&self, event_id: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(post)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (event_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(post.event_id)
        .bind(post.user_id)
        .bind(&post.content)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(created)
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        sqlx::query("UPDATE posts SET hearts = $2, comments = $3 WHERE id = $1")
            .bind(post.id)
            .bind(&post.hearts)
            .bind(&post.comments)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn insert_notifications(&self, notifications: &[NewNotification]) -> StoreResult<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        let mut tx = self.db.pool.begin().await?;
        for n in notifications {
            sqlx::query(
                r#"
                INSERT INTO notifications
                    (user_id, kind, event_id, event_title, post_id, message)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(n.user_id)
            .bind(&n.kind)
            .bind(n.event_id)
            .bind(&n.event_title)
            .bind(n.post_id)
            .bind(&n.message)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: i64) -> StoreResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let (users, events, bookings, seats_sold, total_revenue) =
            sqlx::query_as::<_, (i64, i64, i64, i64, f64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM users),
                    (SELECT COUNT(*) FROM events),
                    (SELECT COUNT(*) FROM bookings),
                    (SELECT COALESCE(SUM(cardinality(seat_ids)), 0) FROM bookings)::int8,
                    (SELECT COALESCE(SUM(amount), 0) FROM bookings)::float8
                "#,
            )
            .fetch_one(&self.db.pool)
            .await?;

        Ok(AdminStats {
            users,
            events,
            bookings,
            seats_sold,
            total_revenue,
        })
    }
}
