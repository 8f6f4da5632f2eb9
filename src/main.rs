pub mod api;
mod config;
mod providers;
mod tracking;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "dev-tools")]
use axum_sql_viewer::SqlViewerLayer;
#[cfg(feature = "dev-tools")]
use tracing_web_console::TracingLayer;

use config::Config;
use providers::Directory;
use tracking::{BroadcastBus, ConnectionRegistry, LocationStore};

#[derive(OpenApi)]
#[openapi(
    info(title = "Live Vehicle Tracking API", version = "0.2.0"),
    paths(
        api::status::get_status,
        api::locations::list_locations,
        api::locations::get_location,
        api::vehicles::next_stop::get_next_stop,
    ),
    components(schemas(
        api::ErrorResponse,
        api::status::StatusResponse,
        api::status::ClientStatus,
        api::vehicles::RouteCompletedResponse,
        tracking::LocationRecord,
        tracking::Position,
        tracking::GeoPoint,
        tracking::eta::NextStopEta,
        tracking::eta::NextStop,
    )),
    tags(
        (name = "status", description = "Streaming subsystem status"),
        (name = "locations", description = "Cached real-time locations"),
        (name = "vehicles", description = "Live vehicle tracking")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(
        ttl_minutes = config.tracking.location_ttl_minutes,
        sweep_minutes = config.tracking.sweep_interval_minutes,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database for the route/trip/vehicle directory
    let pool = SqlitePool::connect("sqlite:database/data.db?mode=rwc")
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(migrations = migrator.migrations.len(), "Found migrations");
    migrator.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Construct the tracking core
    let registry = ConnectionRegistry::new();
    let store = LocationStore::new();
    let bus = BroadcastBus::new(registry.clone());
    let directory = Directory::new(pool.clone());

    // Start the periodic eviction sweep in the background
    let _sweeper = store.spawn_sweeper(&config.tracking);

    // Build the app
    #[allow(unused_mut)] // mut needed when dev-tools feature is enabled
    let mut app = Router::new()
        .route("/", get(root))
        .nest(
            "/api",
            api::router(registry, store, bus, directory, &config.tracking),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Add dev tools only when feature is enabled
    #[cfg(feature = "dev-tools")]
    {
        let tracing_layer = TracingLayer::new("/tracing");
        app = app
            .merge(SqlViewerLayer::sqlite("/sql-viewer", pool.clone()).into_router())
            .merge(tracing_layer.into_router());
        tracing::warn!("Dev tools enabled: SQL Viewer and Tracing Console are accessible");
    }

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");
    #[cfg(feature = "dev-tools")]
    {
        tracing::info!("SQL Viewer: http://localhost:3000/sql-viewer");
        tracing::info!("Tracing Console: http://localhost:3000/tracing");
    }

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Live Vehicle Tracking API"
}
