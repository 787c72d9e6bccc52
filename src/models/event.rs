use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// One event with its seating grid. `booked_seats` is the durable source of
/// truth for seat occupancy; it only ever grows. The `version` column backs
/// optimistic concurrency: every save bumps it, and a save against a stale
/// version is rejected by the store.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
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
    pub interested_users: Vec<i64>,
    pub booked_seats: Vec<String>,
    pub reviews: Json<Vec<Review>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Json<Vec<f32>>>,
    #[serde(skip_serializing)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: i64,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub date: DateTime<Utc>,
}

impl Event {
    /// Whether the seat identifier addresses a cell of this event's grid.
    pub fn contains_seat(&self, seat_id: &str) -> bool {
        match parse_seat_id(seat_id) {
            Some((row, col)) => (row as i64) < self.rows as i64 && (col as i64) < self.cols as i64,
            None => false,
        }
    }

    pub fn is_booked(&self, seat_id: &str) -> bool {
        self.booked_seats.iter().any(|s| s == seat_id)
    }
}

/// Parse a `"{row}-{col}"` seat identifier (0-indexed integers).
pub fn parse_seat_id(seat_id: &str) -> Option<(u32, u32)> {
    let (row, col) = seat_id.split_once('-')?;
    if row.is_empty() || col.is_empty() {
        return None;
    }
    let row = row.parse::<u32>().ok()?;
    let col = col.parse::<u32>().ok()?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_zero_indexed_seat_ids() {
        assert_eq!(parse_seat_id("0-0"), Some((0, 0)));
        assert_eq!(parse_seat_id("12-3"), Some((12, 3)));
    }

    #[test]
    fn rejects_malformed_seat_ids() {
        for bad in ["", "5", "-1", "1-", "a-b", "1-2-3", "1.5-2", " 1-2"] {
            assert_eq!(parse_seat_id(bad), None, "accepted {:?}", bad);
        }
    }

    #[test]
    fn grid_bounds_are_exclusive() {
        let event = test_event(3, 4);
        assert!(event.contains_seat("2-3"));
        assert!(!event.contains_seat("3-0"));
        assert!(!event.contains_seat("0-4"));
    }

    proptest! {
        #[test]
        fn round_trips_any_grid_coordinate(row in 0u32..10_000, col in 0u32..10_000) {
            let id = format!("{}-{}", row, col);
            prop_assert_eq!(parse_seat_id(&id), Some((row, col)));
        }

        #[test]
        fn never_panics_on_arbitrary_input(s in "\\PC*") {
            let _ = parse_seat_id(&s);
        }
    }

    fn test_event(rows: i32, cols: i32) -> Event {
        Event {
            id: 1,
            title: "Test".to_string(),
            description: String::new(),
            date: "2026-01-01".to_string(),
            time: "19:00".to_string(),
            location: "Hall A".to_string(),
            price: 10.0,
            total_seats: rows * cols,
            rows,
            cols,
            category: "music".to_string(),
            image: String::new(),
            producer_id: None,
            interested_users: vec![],
            booked_seats: vec![],
            reviews: Json(vec![]),
            embedding: None,
            version: 0,
            created_at: chrono::Utc::now(),
        }
    }
}
