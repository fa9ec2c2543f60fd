//! Amana Server - Association Management System
//!
//! REST API server for equipment lending and association administration.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amana_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("amana_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Amana Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.auth.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // Connect info is required by the rate limiter's peer-IP key extractor
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Rate limiting on mutating routes; clients back off and retry on 429
    let governor_config = Box::leak(Box::new(
        GovernorConfigBuilder::default()
            .per_second(state.config.ratelimit.per_second)
            .burst_size(state.config.ratelimit.burst)
            .finish()
            .expect("Invalid rate limit configuration"),
    ));

    let mutations = Router::new()
        .route("/loans", post(api::loans::create_loan))
        .route("/loans/:id", delete(api::loans::delete_loan))
        .route("/loans/:id/return", put(api::loans::return_loan))
        .route("/loans/:id/cancel", put(api::loans::cancel_loan))
        .route("/loans/bulk-update-status", patch(api::loans::bulk_update_status))
        .route("/equipment", post(api::equipment::create_equipment))
        .route(
            "/equipment/:id",
            put(api::equipment::update_equipment).delete(api::equipment::delete_equipment),
        )
        .layer(GovernorLayer {
            config: governor_config,
        });

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Equipment
        .route("/equipment", get(api::equipment::list_equipment))
        .route("/equipment/:id", get(api::equipment::get_equipment))
        .route("/equipment/:id/history", get(api::equipment::equipment_history))
        // Loans
        .route("/loans", get(api::loans::list_loans))
        .route("/loans/stats", get(api::loans::loan_stats))
        .route("/loans/export/csv", get(api::loans::export_csv))
        .route("/loans/export/pdf", get(api::loans::export_pdf))
        .route("/loans/:id", get(api::loans::get_loan))
        .merge(mutations)
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
