pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod events;
pub mod notifications;
pub mod posts;
pub mod tickets;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(bookings::routes())
        .merge(posts::routes())
        .merge(notifications::routes())
        .merge(tickets::routes())
        .merge(analytics::routes())
}
