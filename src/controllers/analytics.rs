use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::error::Error;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/stats", get(stats))
}

// GET /api/admin/stats
async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, Error> {
    let stats = state.store.admin_stats().await?;
    Ok(Json(stats))
}
