use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::models::{Event, Review};
use crate::store::{NewEvent, StoreError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/producer/{producer_id}", get(producer_events))
        .route("/events/{id}", get(get_event).put(update_event))
        .route("/events/{id}/interest", post(toggle_interest))
        .route("/reviews", post(add_review))
        .route("/recommendations", get(recommendations))
}

/// Read-modify-save with the same bounded retry the booking commit uses, so a
/// concurrent seat claim bumping the version does not fail an unrelated edit.
async fn update_event_with<F>(state: &AppState, id: i64, apply: F) -> Result<Event, Error>
where
    F: Fn(&mut Event) -> Result<(), Error>,
{
    const MAX_ATTEMPTS: u32 = 3;
    for attempt in 1..=MAX_ATTEMPTS {
        let mut event = state
            .store
            .get_event(id)
            .await?
            .ok_or(Error::NotFound("Event"))?;
        apply(&mut event)?;
        match state.store.save_event(&event).await {
            Ok(()) => return Ok(event),
            Err(StoreError::VersionConflict) if attempt < MAX_ATTEMPTS => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::Transient(
        "Event is being updated concurrently, please retry".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

// GET /api/events?search=
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, Error> {
    let events = state.store.list_events(query.search.as_deref()).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest {
    title: String,
    description: String,
    date: String,
    time: String,
    location: String,
    price: f64,
    total_seats: i32,
    rows: i32,
    cols: i32,
    category: String,
    #[serde(default)]
    image: String,
    producer_id: Option<i64>,
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.rows <= 0 || req.cols <= 0 {
        return Err(Error::invalid("Seating grid must be at least 1x1"));
    }

    // Best-effort: the event is stored without an embedding when the
    // recommendation service is down.
    let embedding = state
        .recommender
        .generate_embedding(&req.title, &req.description)
        .await;

    let event = state
        .store
        .create_event(NewEvent {
            title: req.title,
            description: req.description,
            date: req.date,
            time: req.time,
            location: req.location,
            price: req.price,
            total_seats: req.total_seats,
            rows: req.rows,
            cols: req.cols,
            category: req.category,
            image: req.image,
            producer_id: req.producer_id,
            embedding,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or(Error::NotFound("Event"))?;
    Ok(Json(event))
}

// GET /api/events/producer/{producer_id}
async fn producer_events(
    State(state): State<Arc<AppState>>,
    Path(producer_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let events = state.store.list_events_by_producer(producer_id).await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEventRequest {
    title: Option<String>,
    description: Option<String>,
    date: Option<String>,
    time: Option<String>,
    location: Option<String>,
    price: Option<f64>,
    category: Option<String>,
    image: Option<String>,
    producer_id: Option<i64>,
}

// PUT /api/events/{id}
//
// Metadata only. The seating grid and `booked_seats` are never editable
// here; occupancy changes go through the booking commit.
async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, Error> {
    let event = update_event_with(&state, id, |event| {
        if let (Some(claimed), Some(owner)) = (req.producer_id, event.producer_id) {
            if claimed != owner {
                return Err(Error::Forbidden);
            }
        }
        if let Some(title) = &req.title {
            event.title = title.clone();
        }
        if let Some(description) = &req.description {
            event.description = description.clone();
        }
        if let Some(date) = &req.date {
            event.date = date.clone();
        }
        if let Some(time) = &req.time {
            event.time = time.clone();
        }
        if let Some(location) = &req.location {
            event.location = location.clone();
        }
        if let Some(price) = req.price {
            event.price = price;
        }
        if let Some(category) = &req.category {
            event.category = category.clone();
        }
        if let Some(image) = &req.image {
            event.image = image.clone();
        }
        Ok(())
    })
    .await?;

    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterestRequest {
    user_id: i64,
}

// POST /api/events/{id}/interest
async fn toggle_interest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<InterestRequest>,
) -> Result<impl IntoResponse, Error> {
    let event = update_event_with(&state, id, |event| {
        match event.interested_users.iter().position(|&u| u == req.user_id) {
            Some(index) => {
                event.interested_users.remove(index);
            }
            None => event.interested_users.push(req.user_id),
        }
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "interestedUsers": event.interested_users })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    event_id: i64,
    user_id: i64,
    user_name: String,
    rating: i32,
    comment: String,
}

// POST /api/reviews
async fn add_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, Error> {
    if !(1..=5).contains(&req.rating) {
        return Err(Error::invalid("Rating must be between 1 and 5"));
    }

    update_event_with(&state, req.event_id, |event| {
        event.reviews.0.push(Review {
            user_id: req.user_id,
            user_name: req.user_name.clone(),
            rating: req.rating,
            comment: req.comment.clone(),
            date: Utc::now(),
        });
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsQuery {
    user_id: Option<i64>,
}

// GET /api/recommendations?userId=
async fn recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<impl IntoResponse, Error> {
    let recommendations = state.recommender.recommend(query.user_id).await;
    Ok(Json(recommendations))
}
