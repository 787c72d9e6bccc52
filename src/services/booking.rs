//! booking.rs
//!
//! Seat locking and the booking commit: the two operations with real
//! concurrency hazards.
//!
//! The commit converts a set of seat identifiers into durable occupancy plus
//! a booking record. The event's `booked_seats` append is the authoritative
//! commit point; it goes through the store's version CAS and is retried in
//! full (re-read, re-validate, re-append) on a version conflict, so two
//! commits racing on the same event either serialize or exactly one wins.
//! The booking upsert afterwards is idempotent by (user, event) lookup and is
//! retried on transient store failures without touching the seat claim.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{parse_seat_id, Booking, Event};
use crate::services::locks::{LockGrant, SeatReservationService};
use crate::store::{NewBooking, Store, StoreError};

/// Bounded retry for the validate-then-append step on version conflicts.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Bounded retry for the idempotent booking upsert after seats are claimed.
const MAX_UPSERT_ATTEMPTS: u32 = 3;
const UPSERT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub user_id: i64,
    pub event_id: i64,
    pub seat_ids: Vec<String>,
    pub amount: f64,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    locks: Arc<dyn SeatReservationService>,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, locks: Arc<dyn SeatReservationService>) -> Self {
        Self { store, locks }
    }

    /// Provisionally hold one seat for `user_id`.
    ///
    /// The lock is taken first (purge-check-insert is atomic in the table)
    /// and rolled back if the durable state then disqualifies the seat. That
    /// keeps "at most one concurrent winner" without holding the table mutex
    /// across store I/O.
    pub async fn lock_seat(
        &self,
        event_id: i64,
        seat_id: &str,
        user_id: i64,
    ) -> Result<LockGrant, Error> {
        if parse_seat_id(seat_id).is_none() {
            return Err(Error::invalid(format!("Invalid seat id {:?}", seat_id)));
        }

        let grant = self
            .locks
            .acquire(event_id, seat_id, user_id)
            .await
            .map_err(|_| Error::SeatLocked)?;

        let event = match self.store.get_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.locks.release_if_holder(event_id, seat_id, user_id).await;
                return Err(Error::NotFound("Event"));
            }
            Err(err) => {
                self.locks.release_if_holder(event_id, seat_id, user_id).await;
                return Err(err.into());
            }
        };

        if !event.contains_seat(seat_id) {
            self.locks.release_if_holder(event_id, seat_id, user_id).await;
            return Err(Error::invalid(format!(
                "Seat {} is outside the {}x{} grid",
                seat_id, event.rows, event.cols
            )));
        }

        if event.is_booked(seat_id) {
            self.locks.release_if_holder(event_id, seat_id, user_id).await;
            return Err(Error::SeatBooked);
        }

        Ok(grant)
    }

    /// Explicit client cancellation of a held seat. Idempotent.
    pub async fn release_seat(&self, event_id: i64, seat_id: &str, user_id: i64) -> bool {
        self.locks.release_if_holder(event_id, seat_id, user_id).await
    }

    /// Atomically and idempotently convert the requested seats into durable
    /// occupancy plus a booking record, then retire the corresponding locks.
    pub async fn commit(&self, req: CommitRequest) -> Result<Booking, Error> {
        validate_request(&req)?;

        let event = self.claim_seats(&req).await?;
        let booking = self.upsert_booking(&req, &event).await?;

        // Best-effort: commit success never depends on lock release.
        for seat_id in &req.seat_ids {
            self.locks.release(req.event_id, seat_id).await;
        }

        info!(
            "booking {} committed: user={} event={} seats={:?}",
            booking.id, req.user_id, req.event_id, req.seat_ids
        );
        Ok(booking)
    }

    /// The authoritative commit point: re-validate against current
    /// `booked_seats` and append, retrying the whole step on version
    /// conflicts.
    async fn claim_seats(&self, req: &CommitRequest) -> Result<Event, Error> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mut event = self
                .store
                .get_event(req.event_id)
                .await?
                .ok_or(Error::NotFound("Event"))?;

            for seat_id in &req.seat_ids {
                if !event.contains_seat(seat_id) {
                    return Err(Error::invalid(format!(
                        "Seat {} is outside the {}x{} grid",
                        seat_id, event.rows, event.cols
                    )));
                }
            }

            // All-or-nothing: a single unavailable seat rejects the commit.
            if req.seat_ids.iter().any(|s| event.is_booked(s)) {
                return Err(Error::AlreadyBooked);
            }

            event.booked_seats.extend(req.seat_ids.iter().cloned());

            match self.store.save_event(&event).await {
                Ok(()) => return Ok(event),
                Err(StoreError::VersionConflict) if attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(
                        "seat claim for event {} lost version race (attempt {}), revalidating",
                        req.event_id, attempt
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::Transient(
            "Event is being updated concurrently, please retry".to_string(),
        ))
    }

    /// Upsert keyed by (user, event): append seats and accumulate amount on
    /// the existing booking, or create a new one with a fresh ticket code.
    /// Seats are already claimed at this point, so transient failures are
    /// retried; the lookup makes a repeat attempt safe.
    async fn upsert_booking(&self, req: &CommitRequest, event: &Event) -> Result<Booking, Error> {
        let mut attempt = 1;
        loop {
            match self.try_upsert_booking(req, event).await {
                Ok(booking) => return Ok(booking),
                Err(StoreError::Unavailable(msg)) if attempt < MAX_UPSERT_ATTEMPTS => {
                    warn!(
                        "booking upsert for user={} event={} failed (attempt {}): {}",
                        req.user_id, req.event_id, attempt, msg
                    );
                    tokio::time::sleep(UPSERT_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn try_upsert_booking(
        &self,
        req: &CommitRequest,
        event: &Event,
    ) -> Result<Booking, StoreError> {
        match self.store.find_booking(req.user_id, req.event_id).await? {
            Some(mut booking) => {
                booking.seat_ids.extend(req.seat_ids.iter().cloned());
                booking.amount += req.amount;
                // Refresh the denormalized snapshot to the current event.
                booking.event_title = Some(event.title.clone());
                booking.event_date = Some(event.date.clone());
                booking.event_location = Some(event.location.clone());
                // Backfill for rows that predate ticket codes. Never rotate an
                // existing code.
                if booking.ticket_code.is_none() {
                    booking.ticket_code = Some(generate_ticket_code());
                }
                self.store.save_booking(&booking).await?;
                Ok(booking)
            }
            None => {
                self.store
                    .create_booking(NewBooking {
                        user_id: req.user_id,
                        event_id: req.event_id,
                        seat_ids: req.seat_ids.clone(),
                        amount: req.amount,
                        ticket_code: generate_ticket_code(),
                        event_title: event.title.clone(),
                        event_date: event.date.clone(),
                        event_location: event.location.clone(),
                    })
                    .await
            }
        }
    }
}

fn validate_request(req: &CommitRequest) -> Result<(), Error> {
    if req.seat_ids.is_empty() {
        return Err(Error::invalid("At least one seat is required"));
    }
    for (i, seat_id) in req.seat_ids.iter().enumerate() {
        if parse_seat_id(seat_id).is_none() {
            return Err(Error::invalid(format!("Invalid seat id {:?}", seat_id)));
        }
        if req.seat_ids[..i].contains(seat_id) {
            return Err(Error::invalid(format!("Duplicate seat id {:?}", seat_id)));
        }
    }
    if !req.amount.is_finite() || req.amount < 0.0 {
        return Err(Error::invalid("Amount must be a non-negative number"));
    }
    Ok(())
}

/// 4 random bytes rendered as 8 uppercase hex characters. Generated once per
/// booking and never changed afterwards.
pub fn generate_ticket_code() -> String {
    let bytes: [u8; 4] = rand::random();
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::locks::InMemoryLockTable;
    use crate::store::{MemoryStore, NewEvent};
    use tokio::sync::Barrier;

    async fn setup() -> (BookingService, Arc<MemoryStore>, Arc<InMemoryLockTable>, Event) {
        let store = Arc::new(MemoryStore::new());
        let locks = Arc::new(InMemoryLockTable::default());
        let event = store
            .create_event(NewEvent {
                title: "Jazz Night".to_string(),
                description: "An evening of jazz".to_string(),
                date: "2026-09-01".to_string(),
                time: "20:00".to_string(),
                location: "Blue Hall".to_string(),
                price: 50.0,
                total_seats: 20,
                rows: 4,
                cols: 5,
                category: "music".to_string(),
                image: "jazz.jpg".to_string(),
                producer_id: None,
                embedding: None,
            })
            .await
            .unwrap();
        let service = BookingService::new(store.clone(), locks.clone());
        (service, store, locks, event)
    }

    fn commit_req(user_id: i64, event_id: i64, seats: &[&str], amount: f64) -> CommitRequest {
        CommitRequest {
            user_id,
            event_id,
            seat_ids: seats.iter().map(|s| s.to_string()).collect(),
            amount,
        }
    }

    #[tokio::test]
    async fn lock_then_commit_scenario() {
        let (service, store, _, event) = setup().await;

        // User A locks seat 0-0.
        let grant = service.lock_seat(event.id, "0-0", 1).await.unwrap();
        assert!(grant.expires_at > chrono::Utc::now());

        // User B is rejected while the lock is live.
        let err = service.lock_seat(event.id, "0-0", 2).await.unwrap_err();
        assert!(matches!(err, Error::SeatLocked));

        // User A commits.
        let booking = service
            .commit(commit_req(1, event.id, &["0-0"], 50.0))
            .await
            .unwrap();
        assert_eq!(booking.seat_ids, vec!["0-0"]);
        assert_eq!(booking.amount, 50.0);
        let code = booking.ticket_code.as_deref().unwrap();
        assert_eq!(code.len(), 8);

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.booked_seats, vec!["0-0"]);

        // User B now sees the seat as durably booked, not merely locked.
        let err = service.lock_seat(event.id, "0-0", 2).await.unwrap_err();
        assert!(matches!(err, Error::SeatBooked));
    }

    #[tokio::test]
    async fn repeat_commits_accumulate_into_one_booking() {
        let (service, store, _, event) = setup().await;

        let first = service
            .commit(commit_req(1, event.id, &["0-0", "0-1"], 100.0))
            .await
            .unwrap();
        let code = first.ticket_code.clone().unwrap();

        let second = service
            .commit(commit_req(1, event.id, &["1-0"], 50.0))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.seat_ids, vec!["0-0", "0-1", "1-0"]);
        assert_eq!(second.amount, 150.0);
        // Code assigned once, never rotated.
        assert_eq!(second.ticket_code.as_deref(), Some(code.as_str()));

        let bookings = store.list_bookings_by_event(event.id).await.unwrap();
        assert_eq!(bookings.len(), 1);
    }

    #[tokio::test]
    async fn commit_rejects_whole_request_when_any_seat_is_taken() {
        let (service, store, _, event) = setup().await;

        service
            .commit(commit_req(1, event.id, &["0-0"], 50.0))
            .await
            .unwrap();

        let err = service
            .commit(commit_req(2, event.id, &["0-1", "0-0"], 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyBooked));

        // No partial commit: 0-1 stays free and user 2 has no booking.
        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.booked_seats, vec!["0-0"]);
        assert!(store.find_booking(2, event.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_concurrent_commits_have_one_winner() {
        let (service, store, _, event) = setup().await;
        let barrier = Arc::new(Barrier::new(2));

        let mut handles = Vec::new();
        for user_id in [1i64, 2] {
            let service = service.clone();
            let barrier = barrier.clone();
            let event_id = event.id;
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                service
                    .commit(commit_req(user_id, event_id, &["2-2"], 50.0))
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(Error::AlreadyBooked))));

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.booked_seats, vec!["2-2"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn disjoint_concurrent_commits_both_succeed() {
        let (service, store, _, event) = setup().await;
        let barrier = Arc::new(Barrier::new(2));

        let mut handles = Vec::new();
        for (user_id, seat) in [(1i64, "0-0"), (2, "3-4")] {
            let service = service.clone();
            let barrier = barrier.clone();
            let event_id = event.id;
            let seat = seat.to_string();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                service
                    .commit(commit_req(user_id, event_id, &[&seat], 50.0))
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // No lost update: the event holds the union of both claims.
        let stored = store.get_event(event.id).await.unwrap().unwrap();
        let mut seats = stored.booked_seats.clone();
        seats.sort();
        assert_eq!(seats, vec!["0-0", "3-4"]);
    }

    #[tokio::test]
    async fn commit_releases_the_seat_locks() {
        let (service, _, locks, event) = setup().await;

        service.lock_seat(event.id, "0-0", 1).await.unwrap();
        service
            .commit(commit_req(1, event.id, &["0-0"], 50.0))
            .await
            .unwrap();

        // The table entry is gone: another holder can take the key.
        assert!(locks.acquire(event.id, "0-0", 2).await.is_ok());
    }

    #[tokio::test]
    async fn commit_validates_input() {
        let (service, _, _, event) = setup().await;

        let err = service
            .commit(commit_req(1, event.id, &[], 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        let err = service
            .commit(commit_req(1, event.id, &["abc"], 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        let err = service
            .commit(commit_req(1, event.id, &["0-0", "0-0"], 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        // Outside the 4x5 grid.
        let err = service
            .commit(commit_req(1, event.id, &["4-0"], 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        let err = service
            .commit(commit_req(1, event.id, &["0-0"], -1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));

        let err = service
            .commit(commit_req(1, 9999, &["0-0"], 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn ticket_codes_are_8_uppercase_hex_chars_from_4_random_bytes() {
        let code = generate_ticket_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        // Structural randomness check: consecutive codes differ.
        let other = generate_ticket_code();
        assert_ne!(code, other);
    }
}
