//! # Bangumi HTTP API Module
//!
//! This module implements the HTTP JSON API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /browse?<state>` - One page of results for a query state
//! - `GET /subjects/{id}` - Full record and status of a subject
//! - `POST /status` - Classify a subject
//! - `GET /presets?<state>` - Presets, flagged active for a query state
//! - `POST /presets/{id}/toggle?<state>` - Apply or toggle off a preset
//! - `GET /stats` - Catalog and status counters
//!
//! `<state>` is the same query string the browser keeps in its address bar.
//!
//! ## Configuration (Environment Variables)
//!
//! - `BANGUMI_CORS_ORIGINS`: comma-separated allowed origins, or `*` (default: the local frontend on port 3000)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `bangumi::api::*`)
pub use handlers::{
    browse_handler, health_handler, presets_handler, stats_handler, status_handler,
    subject_handler, toggle_preset_handler,
};
pub use types::{
    BrowseResponse, HealthResponse, PresetJson, PresetToggleResponse, PresetsResponse,
    StatsResponse, StatusRequest, StatusResponse, SubjectResponse, SubjectSummary,
    write_state_name,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use bangumi_core::{Catalog, ExplorerError, Paginator, StatusRegistry, StatusStore};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body (64 KB).
const MAX_BODY_SIZE: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// The catalog is immutable and shared without locking. The registry is the
/// only mutable piece; the store persists it. Status writes hold `writer`
/// from `begin` to `complete`, so the store sees them in ticket order.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub registry: Arc<RwLock<StatusRegistry>>,
    pub store: Arc<dyn StatusStore>,
    pub paginator: Paginator,
    writer: Arc<Mutex<()>>,
}

impl AppState {
    /// Create app state, hydrating the registry from the store.
    #[must_use]
    pub fn new(catalog: Catalog, store: Arc<dyn StatusStore>, paginator: Paginator) -> Self {
        let registry = StatusRegistry::hydrate(store.as_ref());
        Self {
            catalog,
            registry: Arc::new(RwLock::new(registry)),
            store,
            paginator,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Serialize status writes. Readers are not blocked.
    pub(crate) async fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Origins of the frontend dev server.
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Origins allowed by a `BANGUMI_CORS_ORIGINS` value, or `None` for `*`.
///
/// An unset or fully invalid list falls back to [`DEFAULT_ORIGINS`].
fn allowed_origins(configured: Option<&str>) -> Option<Vec<HeaderValue>> {
    if configured.map(str::trim) == Some("*") {
        return None;
    }

    let origins: Vec<HeaderValue> = configured
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();
    if !origins.is_empty() {
        return Some(origins);
    }
    Some(
        DEFAULT_ORIGINS
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect(),
    )
}

/// CORS for the browser frontend, which only reads pages and posts JSON.
fn build_cors_layer() -> CorsLayer {
    let configured = std::env::var("BANGUMI_CORS_ORIGINS").ok();
    match allowed_origins(configured.as_deref()) {
        None => {
            tracing::warn!("CORS open to every origin");
            CorsLayer::permissive()
        }
        Some(origins) => {
            tracing::debug!(count = origins.len(), "CORS origins configured");
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/browse", get(handlers::browse_handler))
        .route("/subjects/{id}", get(handlers::subject_handler))
        .route("/status", post(handlers::status_handler))
        .route("/presets", get(handlers::presets_handler))
        .route("/presets/{id}/toggle", post(handlers::toggle_preset_handler))
        .route("/stats", get(handlers::stats_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), ExplorerError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ExplorerError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Bangumi HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ExplorerError::IoError(format!("Server error: {}", e)))
}
