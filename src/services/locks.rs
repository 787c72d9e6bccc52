//! locks.rs
//!
//! The seat lock table: a process-wide, time-bounded reservation map that
//! gives one user a short exclusive window to finish checkout on a seat.
//!
//! Locks are advisory and ephemeral. They never persist, and they are not the
//! source of truth for occupancy; the event's `booked_seats` is. A lock only
//! narrows the race window between seat selection and payment; the booking
//! commit re-validates against durable state regardless.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Default exclusive window for a locked seat.
pub const LOCK_TTL: Duration = Duration::from_secs(5 * 60);

/// A granted (or refreshed) lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockGrant {
    pub expires_at: DateTime<Utc>,
}

/// Acquisition failed: a live lock for the seat is held by a different user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatHeld;

/// Mutual-exclusion reservation service keyed by (event, seat) with TTL
/// expiry. Injectable so a multi-instance deployment could back it with an
/// external TTL-capable key/value store without touching the commit logic.
#[async_trait]
pub trait SeatReservationService: Send + Sync {
    /// Atomically purge-check-insert: fails if a live lock is held by another
    /// user, otherwise inserts or refreshes the entry with a fresh TTL.
    /// Re-acquiring by the same holder is an idempotent refresh.
    async fn acquire(
        &self,
        event_id: i64,
        seat_id: &str,
        holder_id: i64,
    ) -> Result<LockGrant, SeatHeld>;

    /// Unconditional delete; idempotent no-op on missing keys. Used after a
    /// seat transitions into a durable booking.
    async fn release(&self, event_id: i64, seat_id: &str);

    /// Delete only if the live lock belongs to `holder_id`. Returns whether an
    /// entry was removed. This is the client-facing cancellation path.
    async fn release_if_holder(&self, event_id: i64, seat_id: &str, holder_id: i64) -> bool;

    /// Drop all expired entries, returning how many were removed. Pure garbage
    /// collection; `acquire` ignores expired entries on its own.
    async fn sweep_expired(&self) -> usize;
}

struct LockEntry {
    holder_id: i64,
    deadline: Instant,
}

impl LockEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

/// Single-process lock table. One mutex guards the whole map; no operation
/// awaits while holding it, so purge-check-insert is atomic with respect to
/// every concurrent call.
pub struct InMemoryLockTable {
    entries: Mutex<HashMap<(i64, String), LockEntry>>,
    ttl: Duration,
}

impl InMemoryLockTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Default for InMemoryLockTable {
    fn default() -> Self {
        Self::new(LOCK_TTL)
    }
}

#[async_trait]
impl SeatReservationService for InMemoryLockTable {
    async fn acquire(
        &self,
        event_id: i64,
        seat_id: &str,
        holder_id: i64,
    ) -> Result<LockGrant, SeatHeld> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        entries.retain(|_, entry| entry.is_live(now));

        let key = (event_id, seat_id.to_string());
        if let Some(existing) = entries.get(&key) {
            if existing.holder_id != holder_id {
                return Err(SeatHeld);
            }
        }

        entries.insert(
            key,
            LockEntry {
                holder_id,
                deadline: now + self.ttl,
            },
        );

        Ok(LockGrant {
            expires_at: Utc::now()
                + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero()),
        })
    }

    async fn release(&self, event_id: i64, seat_id: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&(event_id, seat_id.to_string()));
    }

    async fn release_if_holder(&self, event_id: i64, seat_id: &str, holder_id: i64) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let key = (event_id, seat_id.to_string());
        match entries.get(&key) {
            Some(entry) if entry.holder_id == holder_id && entry.is_live(now) => {
                entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn second_holder_is_rejected_while_lock_is_live() {
        let table = InMemoryLockTable::default();
        table.acquire(1, "0-0", 10).await.unwrap();
        assert_eq!(table.acquire(1, "0-0", 20).await, Err(SeatHeld));
        // A different seat on the same event is unaffected.
        table.acquire(1, "0-1", 20).await.unwrap();
    }

    #[tokio::test]
    async fn same_holder_refreshes_idempotently() {
        let table = InMemoryLockTable::default();
        let first = table.acquire(1, "0-0", 10).await.unwrap();
        let second = table.acquire(1, "0-0", 10).await.unwrap();
        assert!(second.expires_at >= first.expires_at);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn expired_lock_is_available_to_any_holder() {
        let table = InMemoryLockTable::new(Duration::from_millis(20));
        table.acquire(1, "0-0", 10).await.unwrap();
        assert_eq!(table.acquire(1, "0-0", 20).await, Err(SeatHeld));

        tokio::time::sleep(Duration::from_millis(40)).await;
        table.acquire(1, "0-0", 20).await.unwrap();
    }

    #[tokio::test]
    async fn release_is_idempotent_on_missing_keys() {
        let table = InMemoryLockTable::default();
        table.release(1, "0-0").await;
        table.acquire(1, "0-0", 10).await.unwrap();
        table.release(1, "0-0").await;
        table.release(1, "0-0").await;
        // Seat is free again for anyone.
        table.acquire(1, "0-0", 20).await.unwrap();
    }

    #[tokio::test]
    async fn release_if_holder_refuses_other_holders() {
        let table = InMemoryLockTable::default();
        table.acquire(1, "0-0", 10).await.unwrap();
        assert!(!table.release_if_holder(1, "0-0", 20).await);
        assert_eq!(table.acquire(1, "0-0", 20).await, Err(SeatHeld));
        assert!(table.release_if_holder(1, "0-0", 10).await);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let table = InMemoryLockTable::new(Duration::from_millis(20));
        table.acquire(1, "0-0", 10).await.unwrap();
        table.acquire(1, "0-1", 10).await.unwrap();
        assert_eq!(table.sweep_expired().await, 0);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(table.sweep_expired().await, 2);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_acquires_have_exactly_one_winner() {
        let table = Arc::new(InMemoryLockTable::default());
        let barrier = Arc::new(Barrier::new(16));
        let wins = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for holder in 0..16i64 {
            let table = table.clone();
            let barrier = barrier.clone();
            let wins = wins.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                if table.acquire(7, "3-4", holder).await.is_ok() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
