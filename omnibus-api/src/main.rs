use std::net::SocketAddr;
use std::sync::Arc;

use omnibus_api::{app, state::AppState};
use omnibus_boarding::BoardingService;
use omnibus_ledger::SeatLedger;
use omnibus_live::Broadcaster;
use omnibus_store::pg::{PgBookingRepository, PgCheckInRepository, PgTripRepository};
use omnibus_store::{DbClient, LogNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "omnibus_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = omnibus_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Omnibus API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let trips = Arc::new(PgTripRepository::new(db.pool.clone()));
    let bookings = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let check_ins = Arc::new(PgCheckInRepository::new(db.pool.clone()));
    let notifier = Arc::new(LogNotifier);
    let live = Arc::new(Broadcaster::new());

    let ledger = Arc::new(SeatLedger::new(
        trips.clone(),
        bookings.clone(),
        check_ins.clone(),
        notifier.clone(),
        live.clone(),
    ));
    let boarding = Arc::new(BoardingService::new(
        trips.clone(),
        bookings,
        check_ins,
        notifier,
        live.clone(),
    ));

    omnibus_api::worker::start_hold_sweeper(
        ledger.clone(),
        live.clone(),
        config.business_rules.sweep_interval_seconds,
    );

    let app_state = AppState {
        ledger,
        boarding,
        live,
        trips,
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
