//! notify.rs
//!
//! Notification fan-out for community posts: everyone who holds a booking for
//! the event gets exactly one unread notification, except the author.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::Error;
use crate::models::{Event, Post};
use crate::store::{NewNotification, Store, StoreError};

const INSERT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Derive the interested-party set from booking history and emit one
/// notification per distinct user. Returns how many were created.
pub async fn fan_out_new_post(
    store: &dyn Store,
    event: &Event,
    post: &Post,
) -> Result<usize, Error> {
    let bookings = store.list_bookings_by_event(event.id).await?;

    let mut notified: HashSet<i64> = HashSet::new();
    let mut batch: Vec<NewNotification> = Vec::new();
    for booking in &bookings {
        if booking.user_id == post.user_id || !notified.insert(booking.user_id) {
            continue;
        }
        batch.push(NewNotification {
            user_id: booking.user_id,
            kind: "new_post".to_string(),
            event_id: event.id,
            event_title: event.title.clone(),
            post_id: Some(post.id),
            message: format!("New post in {}", event.title),
        });
    }

    if batch.is_empty() {
        return Ok(0);
    }

    // The insert is idempotent-safe, so one retry with backoff on a transient
    // store failure.
    match store.insert_notifications(&batch).await {
        Ok(()) => {}
        Err(StoreError::Unavailable(msg)) => {
            warn!("notification insert failed, retrying once: {}", msg);
            tokio::time::sleep(INSERT_RETRY_DELAY).await;
            store.insert_notifications(&batch).await?;
        }
        Err(err) => return Err(err.into()),
    }

    info!(
        "post {} on event {}: notified {} users",
        post.id,
        event.id,
        batch.len()
    );
    Ok(batch.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewBooking, NewEvent, NewPost};

    async fn seed_booking(store: &MemoryStore, user_id: i64, event_id: i64) {
        store
            .create_booking(NewBooking {
                user_id,
                event_id,
                seat_ids: vec!["0-0".to_string()],
                amount: 10.0,
                ticket_code: crate::services::booking::generate_ticket_code(),
                event_title: "Jazz Night".to_string(),
                event_date: "2026-09-01".to_string(),
                event_location: "Blue Hall".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn notifies_each_booker_once_excluding_the_author() {
        let store = MemoryStore::new();
        let event = store
            .create_event(NewEvent {
                title: "Jazz Night".to_string(),
                description: String::new(),
                date: "2026-09-01".to_string(),
                time: "20:00".to_string(),
                location: "Blue Hall".to_string(),
                price: 10.0,
                total_seats: 4,
                rows: 2,
                cols: 2,
                category: "music".to_string(),
                image: String::new(),
                producer_id: Some(99),
                embedding: None,
            })
            .await
            .unwrap();

        // Users 1, 2 and the author (99) hold bookings.
        seed_booking(&store, 1, event.id).await;
        seed_booking(&store, 2, event.id).await;
        seed_booking(&store, 99, event.id).await;

        let post = store
            .create_post(NewPost {
                event_id: event.id,
                user_id: 99,
                content: "Doors open at 7".to_string(),
            })
            .await
            .unwrap();

        let count = fan_out_new_post(&store, &event, &post).await.unwrap();
        assert_eq!(count, 2);

        let for_user_1 = store.list_notifications(1).await.unwrap();
        assert_eq!(for_user_1.len(), 1);
        assert_eq!(for_user_1[0].kind, "new_post");
        assert_eq!(for_user_1[0].post_id, Some(post.id));
        assert!(!for_user_1[0].read);

        // The author hears nothing.
        assert!(store.list_notifications(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_bookings_means_no_notifications() {
        let store = MemoryStore::new();
        let event = store
            .create_event(NewEvent {
                title: "Empty Hall".to_string(),
                description: String::new(),
                date: "2026-09-01".to_string(),
                time: "20:00".to_string(),
                location: "Blue Hall".to_string(),
                price: 10.0,
                total_seats: 4,
                rows: 2,
                cols: 2,
                category: "music".to_string(),
                image: String::new(),
                producer_id: None,
                embedding: None,
            })
            .await
            .unwrap();
        let post = store
            .create_post(NewPost {
                event_id: event.id,
                user_id: 1,
                content: "Anyone here?".to_string(),
            })
            .await
            .unwrap();

        let count = fan_out_new_post(&store, &event, &post).await.unwrap();
        assert_eq!(count, 0);
    }
}
