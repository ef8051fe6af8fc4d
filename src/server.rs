//! HTTP JSON API.
//!
//! Read endpoints orchestrate a cache-freshness check and then serve from
//! the store; aggregate views (stats, categories, dependency graph) are
//! computed on demand from the current document set. Nothing is rendered
//! server-side: this is the data layer for the explorer UI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/bips` | Full collection (freshness check first) |
//! | `GET`  | `/api/bips/{number}` | One document, or 404 |
//! | `GET`  | `/api/authors` | Derived author index, by document count |
//! | `GET`  | `/api/authors/{author}/bips` | Documents matching an author substring |
//! | `GET`  | `/api/stats` | Aggregate statistics (freshness check first) |
//! | `POST` | `/api/refresh` | Force a full refetch, regardless of staleness |
//! | `GET`  | `/api/categories` | Category index over served tags |
//! | `GET`  | `/api/dependencies` | Reference/replacement graph |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses carry a single message field:
//!
//! ```json
//! { "message": "BIP 9999 not found" }
//! ```
//!
//! Upstream-fetch and storage-write failures map to 500; absent documents
//! to 404. Nothing else surfaces.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the explorer frontend
//! is served from a different origin.
//!
//! # Concurrency
//!
//! There is deliberately no lock around the check-then-refresh path: two
//! requests observing a stale cache may both run the pipeline. The replace
//! is wholesale, so the last writer wins and the duplicate work is
//! harmless. The background refresher races the same way.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::RefreshError;
use crate::explain::run_sweep_worker;
use crate::graph::{build_graph, DependencyGraph};
use crate::models::{Author, Bip, Stats};
use crate::refresh::run_refresh;
use crate::source::{BipSource, GithubSource};
use crate::stats::{build_author_index, build_category_index, compute_stats, CategorySummary};
use crate::store::{open_store, BipStore, Clock, SystemClock};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BipStore>,
    pub source: Arc<dyn BipSource>,
    pub clock: Arc<dyn Clock>,
}

/// Build the API router over the given state. Separated from
/// [`run_server`] so tests can drive the router in-process.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/bips", get(handle_bips))
        .route("/api/bips/{number}", get(handle_bip))
        .route("/api/authors", get(handle_authors))
        .route("/api/authors/{author}/bips", get(handle_author_bips))
        .route("/api/stats", get(handle_stats))
        .route("/api/refresh", post(handle_refresh))
        .route("/api/categories", get(handle_categories))
        .route("/api/dependencies", get(handle_dependencies))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the API server: open the configured store, wire the GitHub
/// source, spawn the background refresher and the explanation sweep, and
/// serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_store(config, clock.clone()).await?;
    let source: Arc<dyn BipSource> = Arc::new(GithubSource::new(&config.upstream)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        store: store.clone(),
        source,
        clock,
    };

    tokio::spawn(run_background_refresher(state.clone()));
    tokio::spawn(run_sweep_worker(config.explain.clone(), store));

    let app = build_router(state);

    println!("BIP Explorer API listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Timer-driven refresh, independent of the request-driven freshness
/// check. The first tick fires immediately so a fresh process warms its
/// cache at startup.
async fn run_background_refresher(state: AppState) {
    let mut interval =
        tokio::time::interval(Duration::from_millis(state.config.cache.refresh_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match run_refresh(state.source.as_ref(), state.store.as_ref()).await {
            Ok(outcome) => {
                tracing::info!(
                    "background refresh: {} documents ({} skipped)",
                    outcome.parsed,
                    outcome.skipped
                );
            }
            Err(e) => tracing::warn!("background refresh failed: {}", e),
        }
    }
}

// ============ Error response ============

/// JSON error body: a single human-readable message.
#[derive(Serialize)]
struct MessageBody {
    message: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(MessageBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

fn refresh_error(err: RefreshError) -> ApiError {
    match err {
        RefreshError::Upstream(e) => internal(format!("failed to load proposals: {}", e)),
        RefreshError::Storage(e) => internal(format!("failed to persist proposals: {}", e)),
    }
}

// ============ Freshness ============

/// Refetch the collection when the cached snapshot is older than the
/// staleness window (or absent). Concurrent callers may each trigger a
/// redundant refresh; see the module docs.
async fn ensure_fresh(state: &AppState) -> Result<(), ApiError> {
    let age = state
        .store
        .cache_age()
        .await
        .map_err(|e| internal(e.to_string()))?;

    let now = state.clock.now_millis();
    let stale = match age {
        Some(ts) => now - ts > state.config.cache.ttl_ms,
        None => true,
    };

    if stale {
        run_refresh(state.source.as_ref(), state.store.as_ref())
            .await
            .map_err(refresh_error)?;
    }
    Ok(())
}

// ============ Handlers ============

async fn handle_bips(State(state): State<AppState>) -> Result<Json<Vec<Bip>>, ApiError> {
    ensure_fresh(&state).await?;
    let bips = state
        .store
        .get_all()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(bips))
}

async fn handle_bip(
    State(state): State<AppState>,
    Path(number): Path<u32>,
) -> Result<Json<Bip>, ApiError> {
    let bip = state
        .store
        .get(number)
        .await
        .map_err(|e| internal(e.to_string()))?;
    match bip {
        Some(bip) => Ok(Json(bip)),
        None => Err(not_found(format!("BIP {} not found", number))),
    }
}

async fn handle_authors(State(state): State<AppState>) -> Result<Json<Vec<Author>>, ApiError> {
    let bips = state
        .store
        .get_all()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(build_author_index(&bips)))
}

async fn handle_author_bips(
    State(state): State<AppState>,
    Path(author): Path<String>,
) -> Result<Json<Vec<Bip>>, ApiError> {
    let bips = state
        .store
        .get_by_author(&author)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(bips))
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    ensure_fresh(&state).await?;
    let bips = state
        .store
        .get_all()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(compute_stats(&bips)))
}

/// JSON response body for `POST /api/refresh`.
#[derive(Serialize)]
struct RefreshResponse {
    message: String,
    count: usize,
    timestamp: i64,
}

/// Forces a full refetch regardless of staleness. Does not wait for
/// explanation backfill; the sweep worker picks new documents up on its
/// own schedule.
async fn handle_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let outcome = run_refresh(state.source.as_ref(), state.store.as_ref())
        .await
        .map_err(refresh_error)?;

    Ok(Json(RefreshResponse {
        message: "cache refreshed".to_string(),
        count: outcome.parsed,
        timestamp: outcome.timestamp_ms,
    }))
}

async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    let bips = state
        .store
        .get_all()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(build_category_index(&bips)))
}

async fn handle_dependencies(
    State(state): State<AppState>,
) -> Result<Json<DependencyGraph>, ApiError> {
    let bips = state
        .store
        .get_all()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(build_graph(&bips)))
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
