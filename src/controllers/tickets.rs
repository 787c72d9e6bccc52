use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Error;
use crate::services::ticket;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tickets/generate", post(generate_ticket))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTicketRequest {
    booking_id: i64,
}

// POST /api/tickets/generate
//
// 422 when the booking predates ticket codes and has none to print.
async fn generate_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateTicketRequest>,
) -> Result<Response, Error> {
    let booking = state
        .store
        .get_booking(req.booking_id)
        .await?
        .ok_or(Error::NotFound("Booking"))?;

    let ticket = ticket::render_ticket(&booking)?;

    Ok((
        [
            (header::CONTENT_TYPE, ticket.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ticket.filename),
            ),
        ],
        ticket.bytes,
    )
        .into_response())
}
