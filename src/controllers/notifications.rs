use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;

use crate::error::Error;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications/{user_id}", get(list_notifications))
        .route("/notifications/{notification_id}/read", put(mark_read))
}

// GET /api/notifications/{user_id}
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let notifications = state.store.list_notifications(user_id).await?;
    Ok(Json(notifications))
}

// PUT /api/notifications/{notification_id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    if !state.store.mark_notification_read(notification_id).await? {
        return Err(Error::NotFound("Notification"));
    }
    Ok(Json(json!({ "success": true })))
}
