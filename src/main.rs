use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::handlers;
use barberbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/availability",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/availability/range",
            get(handlers::availability::get_availability_range),
        )
        .route("/api/services", get(handlers::bookings::list_services))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/search",
            get(handlers::bookings::search_bookings),
        )
        .route(
            "/api/bookings/:ticket/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:ticket/reschedule",
            post(handlers::bookings::reschedule_booking),
        )
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route("/api/admin/bookings", post(handlers::admin::create_booking))
        .route(
            "/api/admin/bookings/:ticket/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/services", get(handlers::admin::list_services))
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route(
            "/api/admin/services/:id",
            post(handlers::admin::update_service),
        )
        .route("/api/admin/overrides", get(handlers::admin::list_overrides))
        .route(
            "/api/admin/overrides",
            post(handlers::admin::create_override),
        )
        .route(
            "/api/admin/overrides/block-day",
            post(handlers::admin::block_day),
        )
        .route(
            "/api/admin/overrides/:id/disable",
            post(handlers::admin::disable_override),
        )
        .route("/api/admin/reports", get(handlers::admin::get_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
