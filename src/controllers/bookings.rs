use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::services::booking::CommitRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings/lock", post(lock_seat))
        .route("/bookings/unlock", post(unlock_seat))
        .route("/bookings", post(create_booking))
        .route("/bookings/user/{user_id}", get(user_bookings))
        .route("/bookings/event/{event_id}", get(event_bookings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeatLockRequest {
    event_id: i64,
    seat_id: String,
    user_id: i64,
}

// POST /api/bookings/lock
//
// 423 when the seat is held by someone else or already durably booked.
async fn lock_seat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeatLockRequest>,
) -> Result<impl IntoResponse, Error> {
    let grant = state
        .bookings
        .lock_seat(req.event_id, &req.seat_id, req.user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "expiresAt": grant.expires_at.timestamp_millis(),
    })))
}

// POST /api/bookings/unlock
//
// Client cancellation of a held seat. Only the holder's own live lock is
// removed; `released: false` means there was nothing of theirs to release.
async fn unlock_seat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeatLockRequest>,
) -> Result<impl IntoResponse, Error> {
    let released = state
        .bookings
        .release_seat(req.event_id, &req.seat_id, req.user_id)
        .await;

    Ok(Json(json!({ "success": true, "released": released })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    user_id: i64,
    event_id: i64,
    seat_ids: Vec<String>,
    amount: f64,
}

// POST /api/bookings
//
// The denormalized event snapshot on the booking is taken from the stored
// event, never from the request body.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, Error> {
    let booking = state
        .bookings
        .commit(CommitRequest {
            user_id: req.user_id,
            event_id: req.event_id,
            seat_ids: req.seat_ids,
            amount: req.amount,
        })
        .await?;

    Ok(Json(booking))
}

// GET /api/bookings/user/{user_id}
async fn user_bookings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let bookings = state.store.list_bookings_by_user(user_id).await?;
    Ok(Json(bookings))
}

// GET /api/bookings/event/{event_id}
async fn event_bookings(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let bookings = state.store.list_bookings_by_event(event_id).await?;
    Ok(Json(bookings))
}
