use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postpay::adapters::http::{billing_router, BillingAppState};
use postpay::adapters::{InMemoryEventBus, PostgresBillingStore};
use postpay::config::AppConfig;
use postpay::ports::SystemClock;

#[tokio::main]
async fn main() {
    // Load and validate configuration before anything else; a server with a
    // bad gateway secret must not come up
    let config = AppConfig::load().expect("Failed to load configuration");
    config.validate().expect("Invalid configuration");

    // Initialize tracing; RUST_LOG overrides the configured default
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        environment = ?config.server.environment,
        gateway_mode = ?config.gateway.mode,
        "Starting postpay"
    );

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    if config.database.run_migrations {
        let migrator = Migrator::new(Path::new("./migrations"))
            .await
            .expect("Failed to load migrations");
        migrator.run(&pool).await.expect("Failed to run migrations");
        tracing::info!("Database migrations completed");
    }

    // Wire the billing stack
    let state = BillingAppState::new(
        Arc::new(PostgresBillingStore::new(pool)),
        Arc::new(SystemClock),
        Arc::new(InMemoryEventBus::new()),
        config.gateway.secret.clone(),
        config.billing.entitlement_window_days,
    );

    // Build the application router. Callbacks are small form posts, so an
    // oversized body is rejected before any handler runs
    let mut app = billing_router()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                )))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let cors_origins = config.server.cors_origins_list();
    if !cors_origins.is_empty() {
        let origins: Vec<axum::http::HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        app = app.layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)));
    }

    // Start the server
    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Postpay server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
