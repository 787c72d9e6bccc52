use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use crate::models::{Booking, Event, Notification, Post, User};

use super::{
    AdminStats, NewBooking, NewEvent, NewNotification, NewPost, NewUser, Store, StoreError,
    StoreResult,
};

/// In-memory persistence gateway with the same observable semantics as
/// `PgStore`, including version CAS on event saves and unique-username
/// enforcement. Backs service and router tests; no I/O, no awaits while the
/// lock is held.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    events: HashMap<i64, Event>,
    bookings: HashMap<i64, Booking>,
    posts: HashMap<i64, Post>,
    notifications: Vec<Notification>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().unwrap();
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate);
        }
        let id = inner.next_id();
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_events(&self, search: Option<&str>) -> StoreResult<Vec<Event>> {
        let inner = self.inner.read().unwrap();
        let mut events: Vec<Event> = match search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                inner
                    .events
                    .values()
                    .filter(|e| {
                        e.title.to_lowercase().contains(&needle)
                            || e.category.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            }
            None => inner.events.values().cloned().collect(),
        };
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn list_events_by_producer(&self, producer_id: i64) -> StoreResult<Vec<Event>> {
        let inner = self.inner.read().unwrap();
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| e.producer_id == Some(producer_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.events.get(&id).cloned())
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        let created = Event {
            id,
            title: event.title,
            description: event.description,
            date: event.date,
            time: event.time,
            location: event.location,
            price: event.price,
            total_seats: event.total_seats,
            rows: event.rows,
            cols: event.cols,
            category: event.category,
            image: event.image,
            producer_id: event.producer_id,
            interested_users: vec![],
            booked_seats: vec![],
            reviews: Json(vec![]),
            embedding: event.embedding.map(Json),
            version: 0,
            created_at: Utc::now(),
        };
        inner.events.insert(id, created.clone());
        Ok(created)
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let stored = inner
            .events
            .get_mut(&event.id)
            .ok_or(StoreError::VersionConflict)?;
        if stored.version != event.version {
            return Err(StoreError::VersionConflict);
        }
        let mut updated = event.clone();
        updated.version += 1;
        *stored = updated;
        Ok(())
    }

    async fn find_booking(&self, user_id: i64, event_id: i64) -> StoreResult<Option<Booking>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .bookings
            .values()
            .find(|b| b.user_id == user_id && b.event_id == event_id)
            .cloned())
    }

    async fn get_booking(&self, id: i64) -> StoreResult<Option<Booking>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        let now = Utc::now();
        let created = Booking {
            id,
            user_id: booking.user_id,
            event_id: booking.event_id,
            seat_ids: booking.seat_ids,
            amount: booking.amount,
            ticket_code: Some(booking.ticket_code),
            event_title: Some(booking.event_title),
            event_date: Some(booking.event_date),
            event_location: Some(booking.event_location),
            created_at: now,
            updated_at: now,
        };
        inner.bookings.insert(id, created.clone());
        Ok(created)
    }

    async fn save_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.bookings.get_mut(&booking.id) {
            Some(stored) => {
                let mut updated = booking.clone();
                updated.updated_at = Utc::now();
                *stored = updated;
                Ok(())
            }
            None => Err(StoreError::Unavailable("booking does not exist".to_string())),
        }
    }

    async fn list_bookings_by_user(&self, user_id: i64) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.read().unwrap();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_bookings_by_event(&self, event_id: i64) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.read().unwrap();
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_posts(&self, event_id: i64) -> StoreResult<Vec<Post>> {
        let inner = self.inner.read().unwrap();
        let mut posts: Vec<Post> = inner
            .posts
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.posts.get(&id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id();
        let created = Post {
            id,
            event_id: post.event_id,
            user_id: post.user_id,
            content: post.content,
            hearts: vec![],
            comments: Json(vec![]),
            created_at: Utc::now(),
        };
        inner.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn save_post(&self, post: &Post) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.posts.get_mut(&post.id) {
            Some(stored) => {
                *stored = post.clone();
                Ok(())
            }
            None => Err(StoreError::Unavailable("post does not exist".to_string())),
        }
    }

    async fn insert_notifications(&self, notifications: &[NewNotification]) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        for n in notifications {
            let id = inner.next_id();
            inner.notifications.push(Notification {
                id,
                user_id: n.user_id,
                kind: n.kind.clone(),
                event_id: n.event_id,
                event_title: n.event_title.clone(),
                post_id: n.post_id,
                message: n.message.clone(),
                read: false,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn list_notifications(&self, user_id: i64) -> StoreResult<Vec<Notification>> {
        let inner = self.inner.read().unwrap();
        let mut notifications: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.write().unwrap();
        match inner.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let inner = self.inner.read().unwrap();
        Ok(AdminStats {
            users: inner.users.len() as i64,
            events: inner.events.len() as i64,
            bookings: inner.bookings.len() as i64,
            seats_sold: inner
                .bookings
                .values()
                .map(|b| b.seat_ids.len() as i64)
                .sum(),
            total_revenue: inner.bookings.values().map(|b| b.amount).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> NewEvent {
        NewEvent {
            title: "Jazz Night".to_string(),
            description: "An evening of jazz".to_string(),
            date: "2026-09-01".to_string(),
            time: "20:00".to_string(),
            location: "Blue Hall".to_string(),
            price: 25.0,
            total_seats: 20,
            rows: 4,
            cols: 5,
            category: "music".to_string(),
            image: "jazz.jpg".to_string(),
            producer_id: None,
            embedding: None,
        }
    }

    #[tokio::test]
    async fn save_event_rejects_stale_version() {
        let store = MemoryStore::new();
        let event = store.create_event(sample_event()).await.unwrap();

        // First writer wins.
        let mut first = event.clone();
        first.booked_seats.push("0-0".to_string());
        store.save_event(&first).await.unwrap();

        // Second writer read the same version and must be told to retry.
        let mut second = event.clone();
        second.booked_seats.push("0-1".to_string());
        let err = store.save_event(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict));

        // After re-reading, the second write goes through and keeps both seats.
        let mut fresh = store.get_event(event.id).await.unwrap().unwrap();
        fresh.booked_seats.push("0-1".to_string());
        store.save_event(&fresh).await.unwrap();
        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.booked_seats, vec!["0-0", "0-1"]);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        let user = NewUser {
            username: "ada".to_string(),
            password_hash: "x".to_string(),
            name: "Ada".to_string(),
            role: "user".to_string(),
        };
        store.create_user(user).await.unwrap();
        let err = store
            .create_user(NewUser {
                username: "ada".to_string(),
                password_hash: "y".to_string(),
                name: "Other Ada".to_string(),
                role: "user".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }
}
