pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::booking::BookingService;
use services::locks::SeatReservationService;
use services::recommender::RecommenderClient;
use store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub locks: Arc<dyn SeatReservationService>,
    pub bookings: BookingService,
    pub recommender: RecommenderClient,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        locks: Arc<dyn SeatReservationService>,
    ) -> Self {
        let bookings = BookingService::new(store.clone(), locks.clone());
        let recommender =
            RecommenderClient::from_config(&config.recommender, &config.circuit_breaker);
        Self {
            config,
            store,
            locks,
            bookings,
            recommender,
        }
    }
}

/// The full application router. Shared by the binary and the router tests.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Eventopedia API" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
