use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linewatch_api::config::ServerConfig;
use linewatch_api::{routes, state, ws};
use linewatch_core::reading::SensorReading;
use linewatch_core::threshold::evaluate;
use linewatch_ingest::bus::TelemetryBus;
use linewatch_ingest::live::{LiveState, SensorLive};
use linewatch_ingest::registry::{PgRegistrySource, SensorRegistry};
use linewatch_ingest::router::IngestionRouter;
use linewatch_ingest::store::PgEventStore;
use linewatch_ingest::transport;

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linewatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = linewatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    linewatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    linewatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- Pipeline state ---
    let registry = Arc::new(SensorRegistry::new(
        Arc::new(PgRegistrySource::new(pool.clone())),
        Duration::from_secs(config.registry_ttl_secs),
    ));
    let live = Arc::new(LiveState::new());
    warm_start_live(&pool, &live).await;
    let bus = Arc::new(TelemetryBus::default());

    let router = Arc::new(IngestionRouter::new(
        Arc::clone(&registry),
        Arc::new(PgEventStore::new(pool.clone())),
        Arc::clone(&live),
        Arc::clone(&bus),
        Duration::from_secs(config.store_write_timeout_secs),
    ));

    // --- Transport listeners ---
    let transport_cancel = tokio_util::sync::CancellationToken::new();
    let mut transport_handles = Vec::new();
    for endpoint in &config.transport_urls {
        let handle = tokio::spawn(transport::run_subscription(
            endpoint.clone(),
            config.transport_topics.clone(),
            Arc::clone(&router),
            transport::ReconnectConfig::default(),
            transport_cancel.clone(),
        ));
        transport_handles.push(handle);
    }
    tracing::info!(count = config.transport_urls.len(), "Transport listeners started");

    // --- Feed manager ---
    let feeds = Arc::new(ws::FeedManager::new());
    let broadcasters = Arc::new(ws::SnapshotBroadcasters::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&feeds));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        feeds: Arc::clone(&feeds),
        broadcasters: Arc::clone(&broadcasters),
        live: Arc::clone(&live),
        registry: Arc::clone(&registry),
        bus: Arc::clone(&bus),
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // Live feeds.
        .merge(routes::ws_routes())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop ingesting before tearing down the feeds.
    transport_cancel.cancel();
    for handle in transport_handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Transport listeners stopped");

    broadcasters.shutdown_all().await;
    tracing::info!("Snapshot broadcasters stopped");

    let feed_count = feeds.total_count().await;
    tracing::info!(feed_count, "Closing remaining feed subscriptions");
    feeds.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Seed the live state from the most recent persisted readings so the
/// feeds are populated before the first frame arrives.
async fn warm_start_live(pool: &linewatch_db::DbPool, live: &LiveState) {
    match linewatch_db::repositories::ReadingRepo::latest_per_sensor(pool).await {
        Ok(rows) => {
            let count = rows.len();
            let entries = rows
                .into_iter()
                .map(|row| {
                    let bounds = match (row.min_value, row.max_value) {
                        (Some(min_value), Some(max_value)) => {
                            Some(linewatch_core::reading::OperatingBounds {
                                min_value,
                                max_value,
                            })
                        }
                        _ => None,
                    };
                    SensorLive {
                        status: evaluate(row.value, bounds.as_ref()),
                        reading: SensorReading {
                            sensor_id: row.sensor_id,
                            value: row.value,
                            recorded_at: row.recorded_at,
                        },
                        bounds,
                    }
                })
                .collect();
            live.seed(entries).await;
            tracing::info!(count, "Live state seeded from stored readings");
        }
        Err(error) => {
            tracing::warn!(%error, "Could not seed live state, starting empty");
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid, which is the
/// desired behaviour -- we want misconfiguration to fail fast.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
