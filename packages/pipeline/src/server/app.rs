//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use discogs_client::DiscogsClient;
use genius_client::GeniusClient;
use spotify_client::SpotifyClient;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::ingestion::register_handlers;
use crate::kernel::batches::{AlertSink, HandlerRegistry, LogAlertSink, Scheduler};
use crate::kernel::{Invoker, PipelineDeps};
use crate::server::middleware::bearer_auth_middleware;
use crate::server::routes::{
    control::{maintenance_handler, monitor_handler, scheduler_handler, worker_handler},
    health::health_handler,
    ingestion::{
        discover_artists_handler, identify_producers_handler, process_album_page_handler,
        process_track_page_handler,
    },
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<PipelineDeps>,
    pub registry: Arc<HandlerRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub alert_sink: Arc<dyn AlertSink>,
}

/// Build the axum application router.
///
/// Returns the router plus the shared deps and scheduler so `main` can wire
/// the in-process minute ticker and shutdown signal.
pub fn build_app(pool: PgPool, config: &Config) -> (Router, Arc<PipelineDeps>, Arc<Scheduler>) {
    let spotify = Arc::new(SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    ));
    let genius = Arc::new(GeniusClient::new(config.genius_access_token.clone()));
    let discogs = Arc::new(DiscogsClient::new(
        config.discogs_consumer_key.clone(),
        config.discogs_consumer_secret.clone(),
    ));

    let deps = Arc::new(PipelineDeps::new(pool, spotify, genius, discogs));

    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry);
    let registry = Arc::new(registry);

    let invoker = Arc::new(Invoker::new(
        config.internal_base_url.clone(),
        config.internal_bearer_token.clone(),
    ));
    let scheduler = Arc::new(Scheduler::new(invoker));

    let state = AppState {
        deps: deps.clone(),
        registry,
        scheduler: scheduler.clone(),
        alert_sink: Arc::new(LogAlertSink),
    };

    // Preflight OPTIONS answered by the CORS layer with an empty 200.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let bearer_token = config.internal_bearer_token.clone();

    let router = Router::new()
        // Control plane
        .route("/scheduler", post(scheduler_handler))
        .route("/worker", post(worker_handler))
        .route("/maintenance", post(maintenance_handler))
        .route("/monitor", post(monitor_handler))
        // Job kinds
        .route("/discover-artists", post(discover_artists_handler))
        .route("/process-album-page", post(process_album_page_handler))
        .route("/process-track-page", post(process_track_page_handler))
        .route("/identify-producers", post(identify_producers_handler))
        .layer(middleware::from_fn(move |req, next| {
            bearer_auth_middleware(bearer_token.clone(), req, next)
        }))
        // Health check (no auth)
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    (router, deps, scheduler)
}
