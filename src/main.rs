use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventopedia::{
    config::Config,
    database::Database,
    services::locks::{InMemoryLockTable, SeatReservationService},
    store::PgStore,
    AppState,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Eventopedia API");

    // Connect to the database
    let db = Database::new(&config.database.url, config.database.pool_size)
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    // Run migrations
    db.run_migrations().await.expect("Failed to run migrations");

    let store = Arc::new(PgStore::new(db));
    let locks: Arc<dyn SeatReservationService> =
        Arc::new(InMemoryLockTable::new(config.locks.ttl()));

    let sweep_interval = config.locks.sweep_interval();
    let app_state = Arc::new(AppState::new(config.clone(), store, locks));

    // Background sweep of expired seat locks
    let sweeper = app_state.locks.clone();
    task::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let released = sweeper.sweep_expired().await;
            if released > 0 {
                info!("Released {} expired seat locks", released);
            }
        }
    });

    let app = eventopedia::app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
